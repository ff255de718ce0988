use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use memmap2::Mmap;
use wavemesh_core::LayoutResult;

use crate::{LAYOUT_VERSION, MeshVertex, WaveDescriptor};

pub const CAPTURE_MAGIC: [u8; 4] = *b"WMCP";
const BYTE_ORDER_MARK: u32 = 0x0102_0304;
const FLAG_DESCRIPTOR: u32 = 1 << 0;

/// Fixed header at the start of a capture file. Everything after it is raw
/// record data in the writer's byte order.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CaptureHeader {
    pub magic: [u8; 4], // "WMCP"
    pub version: u32,
    pub byte_order: u32,
    pub vertex_stride: u32,
    pub descriptor_size: u32,
    pub flags: u32,
    pub vertex_count: u64,
}

const HEADER_SIZE: usize = std::mem::size_of::<CaptureHeader>();
const _: () = assert!(HEADER_SIZE == 32);

impl CaptureHeader {
    pub fn has_descriptor(&self) -> bool {
        self.flags & FLAG_DESCRIPTOR != 0
    }
}

/// Writes one frame's vertex buffer and optional wave descriptor.
pub fn write_capture<P: AsRef<Path>>(
    path: P,
    vertices: &[MeshVertex],
    descriptor: Option<&WaveDescriptor>,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create capture file: {:?}", path))?;
    let mut writer = BufWriter::new(file);

    let header = CaptureHeader {
        magic: CAPTURE_MAGIC,
        version: LAYOUT_VERSION,
        byte_order: BYTE_ORDER_MARK,
        vertex_stride: MeshVertex::SIZE as u32,
        descriptor_size: WaveDescriptor::SIZE as u32,
        flags: if descriptor.is_some() { FLAG_DESCRIPTOR } else { 0 },
        vertex_count: vertices.len() as u64,
    };

    writer.write_all(bytemuck::bytes_of(&header))?;
    writer.write_all(MeshVertex::as_bytes(vertices))?;
    if let Some(descriptor) = descriptor {
        writer.write_all(descriptor.as_bytes())?;
    }
    writer.flush()?;

    log::info!(
        "Wrote capture {:?}: {} vertices, descriptor: {}",
        path,
        vertices.len(),
        descriptor.is_some()
    );
    Ok(())
}

/// A memory-mapped capture file. Vertices are read in place.
pub struct Capture {
    mmap: Mmap,
    header: CaptureHeader,
}

impl Capture {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open capture file: {:?}", path))?;
        // SAFETY: the mapping is read-only and only ever viewed as Pod data.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to map capture file: {:?}", path))?;

        if mmap.len() < HEADER_SIZE {
            anyhow::bail!("File too small to be a capture: {} bytes", mmap.len());
        }

        let header: CaptureHeader = bytemuck::pod_read_unaligned(&mmap[..HEADER_SIZE]);
        if header.magic != CAPTURE_MAGIC {
            anyhow::bail!("Invalid capture magic header");
        }
        if header.byte_order != BYTE_ORDER_MARK {
            if header.byte_order == BYTE_ORDER_MARK.swap_bytes() {
                anyhow::bail!("Capture was written on a host with the other byte order");
            }
            anyhow::bail!("Corrupt capture byte-order marker: {:#010x}", header.byte_order);
        }
        if header.version != LAYOUT_VERSION {
            anyhow::bail!(
                "Capture layout version {} does not match this build (version {})",
                header.version,
                LAYOUT_VERSION
            );
        }
        if header.vertex_stride as usize != MeshVertex::SIZE
            || header.descriptor_size as usize != WaveDescriptor::SIZE
        {
            anyhow::bail!(
                "Capture record sizes {}/{} do not match this build ({}/{})",
                header.vertex_stride,
                header.descriptor_size,
                MeshVertex::SIZE,
                WaveDescriptor::SIZE
            );
        }

        let descriptor_len = if header.has_descriptor() { WaveDescriptor::SIZE } else { 0 };
        let expected_len = usize::try_from(header.vertex_count)
            .ok()
            .and_then(|count| count.checked_mul(MeshVertex::SIZE))
            .and_then(|bytes| bytes.checked_add(HEADER_SIZE))
            .and_then(|bytes| bytes.checked_add(descriptor_len))
            .context("Capture vertex count overflows")?;
        if mmap.len() != expected_len {
            anyhow::bail!(
                "Capture is {} bytes, header describes {} bytes",
                mmap.len(),
                expected_len
            );
        }

        log::debug!("Opened capture {:?}: {} vertices", path, header.vertex_count);
        Ok(Self { mmap, header })
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    pub fn vertex_count(&self) -> usize {
        self.header.vertex_count as usize
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        &self.mmap[HEADER_SIZE..HEADER_SIZE + self.vertex_count() * MeshVertex::SIZE]
    }

    /// Vertices viewed in place. Mappings are page aligned and the header
    /// keeps the vertex block 4-byte aligned.
    pub fn vertices(&self) -> LayoutResult<&[MeshVertex]> {
        MeshVertex::cast_bytes(self.vertex_bytes())
    }

    pub fn descriptor(&self) -> Option<WaveDescriptor> {
        if !self.header.has_descriptor() {
            return None;
        }
        let start = HEADER_SIZE + self.vertex_count() * MeshVertex::SIZE;
        Some(bytemuck::pod_read_unaligned(&self.mmap[start..start + WaveDescriptor::SIZE]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wavemesh_capture_test_{}_{}", std::process::id(), name))
    }

    fn strip() -> Vec<MeshVertex> {
        (0..4)
            .map(|i| {
                let x = i as f32;
                MeshVertex::new(Vec3::new(x, 0.0, 0.0), Vec3::Y, Vec2::new(x / 3.0, 0.0))
            })
            .collect()
    }

    fn patch(path: &Path, at: usize, bytes: &[u8]) {
        let mut data = std::fs::read(path).unwrap();
        data[at..at + bytes.len()].copy_from_slice(bytes);
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn write_then_open() {
        let path = temp_path("write_then_open");
        let vertices = strip();
        let wave = WaveDescriptor::new(16, 2.5, 1.0, 0.5);
        write_capture(&path, &vertices, Some(&wave)).unwrap();

        let capture = Capture::open(&path).unwrap();
        assert_eq!(capture.vertex_count(), 4);
        assert_eq!(capture.vertices().unwrap(), vertices.as_slice());
        assert_eq!(capture.descriptor(), Some(wave));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 32 + 4 * 32 + 16);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_capture_without_descriptor() {
        let path = temp_path("empty");
        write_capture(&path, &[], None).unwrap();

        let capture = Capture::open(&path).unwrap();
        assert_eq!(capture.vertex_count(), 0);
        assert!(capture.vertices().unwrap().is_empty());
        assert_eq!(capture.descriptor(), None);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn degenerate_descriptor_round_trips() {
        let path = temp_path("degenerate");
        write_capture(&path, &strip(), Some(&WaveDescriptor::default())).unwrap();

        let descriptor = Capture::open(&path).unwrap().descriptor().unwrap();
        assert!(descriptor.is_degenerate());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let path = temp_path("bad_magic");
        write_capture(&path, &strip(), None).unwrap();
        patch(&path, 0, b"NOPE");
        assert!(Capture::open(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn other_layout_version_is_rejected() {
        let path = temp_path("version");
        write_capture(&path, &strip(), None).unwrap();
        patch(&path, 4, &(LAYOUT_VERSION + 1).to_ne_bytes());

        let err = Capture::open(&path).err().unwrap();
        assert!(err.to_string().contains("layout version"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn foreign_byte_order_is_rejected() {
        let path = temp_path("byte_order");
        write_capture(&path, &strip(), None).unwrap();
        patch(&path, 8, &BYTE_ORDER_MARK.swap_bytes().to_ne_bytes());

        let err = Capture::open(&path).err().unwrap();
        assert!(err.to_string().contains("byte order"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncated_capture_is_rejected() {
        let path = temp_path("truncated");
        write_capture(&path, &strip(), Some(&WaveDescriptor::default())).unwrap();
        let data = std::fs::read(&path).unwrap();
        std::fs::write(&path, &data[..data.len() - 1]).unwrap();
        assert!(Capture::open(&path).is_err());

        std::fs::write(&path, &data[..10]).unwrap();
        assert!(Capture::open(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
