use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use wavemesh_core::{GpuLayout, ShaderSource, StructLayout, VertexLayout, parse_shader};
use wavemesh_layout::{
    Capture, CheckOptions, LayoutManifest, MeshVertex, WGSL_TYPES, WaveDescriptor, check_shader,
    write_capture,
};

const USAGE: &str = "Usage: wavemesh-inspect <command> [args]

Commands:
  layout                    Print the shared record layouts
  wgsl                      Print the WGSL declarations of the shared records
  check <shader> [options]  Check a .wgsl or GLSL (.vert/.frag/.comp) shader
      --lenient             Only check what the shader declares, ignore field names
      --entry <name>        Vertex entry point to check
      --vertex-struct <n>   Name of the storage struct mirroring MeshVertex
      --uniform <name>      Name of the uniform struct mirroring WaveDescriptor
      --allow-extra-inputs  Accept vertex inputs beyond MeshVertex's attributes
  manifest <out>            Write this build's layout manifest
  compare <manifest>        Compare a manifest with this build
  capture <file>            Summarise a capture file
  dump-sample <out>         Write a small sample capture";

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    match (command.as_str(), args.get(1)) {
        ("layout", _) => print!("{}", layout_report()),
        ("wgsl", _) => print!("{}", WGSL_TYPES),
        ("check", Some(_)) => {
            let (path, options) = parse_check_args(&args[1..])?;
            check_file(&path, &options)?;
        }
        ("manifest", Some(out)) => LayoutManifest::current().save(out)?,
        ("compare", Some(path)) => compare_manifest(path)?,
        ("capture", Some(path)) => summarise_capture(path)?,
        ("dump-sample", Some(out)) => {
            write_capture(out, &sample_quad(), Some(&WaveDescriptor::new(64, 0.0, 1.0, 0.25)))?;
            println!("Wrote sample capture to {}", out);
        }
        _ => println!("{}", USAGE),
    }

    Ok(())
}

fn parse_check_args(args: &[String]) -> Result<(PathBuf, CheckOptions)> {
    let mut path = None;
    let mut options = CheckOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--lenient" => {
                options.match_names = false;
                options.require_vertex_struct = false;
                options.require_descriptor_struct = false;
            }
            "--allow-extra-inputs" => options.allow_extra_inputs = true,
            "--entry" => options.vertex_entry = Some(next_value(&mut iter, arg)?),
            "--vertex-struct" => options.vertex_struct = next_value(&mut iter, arg)?,
            "--uniform" => options.descriptor_struct = next_value(&mut iter, arg)?,
            flag if flag.starts_with("--") => anyhow::bail!("Unknown option: {}", flag),
            file => {
                if path.replace(PathBuf::from(file)).is_some() {
                    anyhow::bail!("Only one shader can be checked at a time");
                }
            }
        }
    }

    let path = path.context("Missing shader path")?;
    Ok((path, options))
}

fn next_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String> {
    iter.next().cloned().with_context(|| format!("{} needs a value", flag))
}

/// GLSL stage implied by a file extension; `None` means WGSL.
fn glsl_stage(path: &Path) -> Result<Option<naga::ShaderStage>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wgsl") => Ok(None),
        Some("vert") => Ok(Some(naga::ShaderStage::Vertex)),
        Some("frag") => Ok(Some(naga::ShaderStage::Fragment)),
        Some("comp") => Ok(Some(naga::ShaderStage::Compute)),
        other => anyhow::bail!("Unrecognised shader extension: {:?}", other),
    }
}

fn check_file(path: &Path, options: &CheckOptions) -> Result<()> {
    let stage = glsl_stage(path)?;
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read shader: {:?}", path))?;

    let module = match stage {
        None => parse_shader(ShaderSource::Wgsl(&source)),
        Some(stage) => parse_shader(ShaderSource::Glsl {
            source: &source,
            stage,
            defines: naga::FastHashMap::default(),
        }),
    }
    .with_context(|| format!("Failed to load shader: {:?}", path))?;

    let report = check_shader(&module, options)?;
    println!("Checked {}: {}", path.display(), report.checked.join(", "));
    let report = report.into_result()?;
    if report.checked.is_empty() {
        log::warn!("{:?} declares none of the shared records", path);
    }
    println!("OK: no layout drift");
    Ok(())
}

fn compare_manifest(path: &str) -> Result<()> {
    let theirs = LayoutManifest::load(path)?;
    let mismatches = LayoutManifest::current().compare(&theirs);
    if mismatches.is_empty() {
        println!("{} matches this build (layout version {})", path, theirs.layout_version);
        return Ok(());
    }
    Err(wavemesh_core::LayoutError::Mismatch(mismatches))
        .with_context(|| format!("{} disagrees with this build", path))
}

fn summarise_capture(path: &str) -> Result<()> {
    let capture = Capture::open(path)?;
    let header = capture.header();
    println!(
        "Capture {}: layout v{}, {} vertices (stride {}), descriptor: {}",
        path,
        header.version,
        header.vertex_count,
        header.vertex_stride,
        header.has_descriptor()
    );

    let vertices = capture.vertices()?;
    for (i, v) in vertices.iter().take(4).enumerate() {
        println!("  [{}] position {:?} normal {:?} uv {:?}", i, v.position, v.normal, v.uv);
    }
    if vertices.len() > 4 {
        println!("  ... {} more", vertices.len() - 4);
    }

    if let Some(wave) = capture.descriptor() {
        println!(
            "  wave: segments {} time {} density {} amplitude {}",
            wave.segment_count, wave.time, wave.wave_density, wave.amplitude
        );
        if wave.is_degenerate() {
            println!("  (segment count is zero: degenerate draw)");
        }
    }
    Ok(())
}

fn layout_report() -> String {
    let mut out = String::new();
    out.push_str(&struct_table(&MeshVertex::struct_layout()));
    out.push('\n');
    out.push_str(&struct_table(&WaveDescriptor::struct_layout()));
    out.push('\n');
    out.push_str(&attribute_table(&MeshVertex::vertex_layout()));
    out
}

fn struct_table(layout: &StructLayout) -> String {
    let mut out = format!(
        "{} ({} bytes, align {}, padding {})\n  offset  size  type    field\n",
        layout.name,
        layout.size,
        layout.align,
        layout.padding()
    );
    for field in &layout.fields {
        out.push_str(&format!(
            "  {:>6}  {:>4}  {:<6}  {}\n",
            field.offset,
            field.size,
            field.type_name(),
            field.name
        ));
    }
    out
}

fn attribute_table(layout: &VertexLayout) -> String {
    let mut out = format!("Vertex attributes (stride {})\n", layout.array_stride);
    for attr in &layout.attributes {
        out.push_str(&format!(
            "  location {}  {:<9}  @ {}\n",
            attr.location, attr.format.to_string(), attr.offset
        ));
    }
    out
}

/// Two triangles covering the unit square in the XZ plane, facing +Y.
fn sample_quad() -> Vec<MeshVertex> {
    let corner = |x: f32, z: f32| MeshVertex {
        position: [x, 0.0, z],
        normal: [0.0, 1.0, 0.0],
        uv: [x, z],
    };
    vec![
        corner(0.0, 0.0),
        corner(1.0, 0.0),
        corner(1.0, 1.0),
        corner(0.0, 0.0),
        corner(1.0, 1.0),
        corner(0.0, 1.0),
    ]
}
