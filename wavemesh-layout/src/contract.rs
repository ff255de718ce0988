//! Checks a shader's view of the shared records against the Rust layout.
//!
//! Two kinds of declarations are compared:
//! - host-shareable structs (uniform or storage), by offsets, member types
//!   and total size;
//! - vertex inputs, by location and format against `MeshVertex::ATTRIBUTES`.

use wavemesh_core::{
    GpuLayout, LayoutError, LayoutMismatch, LayoutResult, ShaderModule, ShaderSource, StructLayout,
    parse_shader,
};

use crate::{MeshVertex, WaveDescriptor};

/// WGSL declarations of the shared records, for inclusion in shaders.
pub const WGSL_TYPES: &str = include_str!("../shaders/wave_types.wgsl");

#[derive(Clone, Debug)]
pub struct CheckOptions {
    /// Host-shareable (storage) struct mirroring `MeshVertex`.
    pub vertex_struct: String,
    /// Uniform struct mirroring `WaveDescriptor`.
    pub descriptor_struct: String,
    /// Vertex-input struct, checked when the shader has no vertex entry point.
    pub input_struct: String,
    /// Vertex entry point to check. `None` picks the first one.
    pub vertex_entry: Option<String>,
    pub match_names: bool,
    pub require_vertex_struct: bool,
    pub require_descriptor_struct: bool,
    /// Accept vertex inputs at locations `MeshVertex` does not provide,
    /// e.g. per-instance data from a second buffer.
    pub allow_extra_inputs: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            vertex_struct: MeshVertex::NAME.to_string(),
            descriptor_struct: WaveDescriptor::NAME.to_string(),
            input_struct: "MeshVertexInput".to_string(),
            vertex_entry: None,
            match_names: true,
            require_vertex_struct: true,
            require_descriptor_struct: true,
            allow_extra_inputs: false,
        }
    }
}

impl CheckOptions {
    /// Options for a consumer shader that may declare only part of the
    /// contract, under its own field names.
    pub fn lenient() -> Self {
        Self {
            match_names: false,
            require_vertex_struct: false,
            require_descriptor_struct: false,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractReport {
    /// What was compared, in order: record names and `"vertex input"`.
    pub checked: Vec<String>,
    pub mismatches: Vec<LayoutMismatch>,
}

impl ContractReport {
    pub fn is_compatible(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn into_result(self) -> LayoutResult<Self> {
        if self.is_compatible() {
            Ok(self)
        } else {
            Err(LayoutError::Mismatch(self.mismatches))
        }
    }

    fn record(&mut self, what: &str, mismatches: Vec<LayoutMismatch>) {
        self.checked.push(what.to_string());
        self.mismatches.extend(mismatches);
    }
}

pub fn check_shader(module: &ShaderModule, options: &CheckOptions) -> LayoutResult<ContractReport> {
    let mut report = ContractReport::default();

    check_record::<MeshVertex>(
        module,
        &options.vertex_struct,
        options.require_vertex_struct,
        options.match_names,
        &mut report,
    )?;
    check_record::<WaveDescriptor>(
        module,
        &options.descriptor_struct,
        options.require_descriptor_struct,
        options.match_names,
        &mut report,
    )?;

    let inputs = if module.has_vertex_entry() {
        Some(module.vertex_inputs(options.vertex_entry.as_deref())?)
    } else if let Some(entry) = &options.vertex_entry {
        return Err(LayoutError::MissingEntryPoint(entry.clone()));
    } else if module.has_struct(&options.input_struct) {
        Some(module.struct_inputs(&options.input_struct)?)
    } else {
        None
    };

    if let Some(inputs) = inputs {
        let mut mismatches = MeshVertex::vertex_layout().compare_inputs(&inputs);
        if options.allow_extra_inputs {
            mismatches.retain(|m| !matches!(m, LayoutMismatch::UnexpectedLocation { .. }));
        }
        report.record("vertex input", mismatches);
    }

    for mismatch in &report.mismatches {
        log::warn!("Layout drift: {}", mismatch);
    }
    log::debug!(
        "Checked {:?}: {} mismatch(es)",
        report.checked,
        report.mismatches.len()
    );
    Ok(report)
}

/// Parses `source` as WGSL and checks it.
pub fn check_wgsl(source: &str, options: &CheckOptions) -> LayoutResult<ContractReport> {
    let module = parse_shader(ShaderSource::Wgsl(source))?;
    check_shader(&module, options)
}

fn check_record<T: GpuLayout>(
    module: &ShaderModule,
    name: &str,
    required: bool,
    match_names: bool,
    report: &mut ContractReport,
) -> LayoutResult<()> {
    if !module.has_struct(name) {
        if required {
            return Err(LayoutError::MissingStruct(name.to_string()));
        }
        log::debug!("Skipping {}: shader declares no `{}`", T::NAME, name);
        return Ok(());
    }

    let actual = module.struct_layout(name)?;
    report.record(T::NAME, StructLayout::compare(&T::struct_layout(), &actual, match_names));
    Ok(())
}
