use std::mem::{align_of, offset_of, size_of};

use bytemuck::{Pod, PodCastError, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use wavemesh_core::{
    FieldLayout, GpuLayout, LayoutError, LayoutResult, ScalarKind, StructLayout, VertexAttribute,
    VertexFormat, VertexLayout,
};

/// One vertex of a mesh surface, as uploaded to a vertex or storage buffer.
///
/// The 3-component fields are plain arrays rather than SIMD vectors so that
/// nothing is over-aligned: the record is 32 bytes with 4-byte alignment
/// and no padding anywhere.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: [f32; 3], // 12 bytes
    pub normal: [f32; 3],   // 12 bytes
    pub uv: [f32; 2],       // 8 bytes, 32 total
}

const _: () = assert!(size_of::<MeshVertex>() == MeshVertex::SIZE);
const _: () = assert!(align_of::<MeshVertex>() == 4);
const _: () = assert!(offset_of!(MeshVertex, position) == 0);
const _: () = assert!(offset_of!(MeshVertex, normal) == 12);
const _: () = assert!(offset_of!(MeshVertex, uv) == 24);

impl MeshVertex {
    pub const SIZE: usize = 32;

    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            location: 0,
            format: VertexFormat::Float32x3,
            offset: offset_of!(MeshVertex, position) as u32,
        },
        VertexAttribute {
            location: 1,
            format: VertexFormat::Float32x3,
            offset: offset_of!(MeshVertex, normal) as u32,
        },
        VertexAttribute {
            location: 2,
            format: VertexFormat::Float32x2,
            offset: offset_of!(MeshVertex, uv) as u32,
        },
    ];

    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    pub fn uv(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }

    pub fn vertex_layout() -> VertexLayout {
        VertexLayout {
            array_stride: Self::SIZE as u32,
            attributes: Self::ATTRIBUTES.to_vec(),
        }
    }

    /// Little-endian encoding, the byte order GPUs consume.
    ///
    /// A vertex at the origin with normal (0, 1, 0) and uv (0, 0) encodes to
    /// 32 zero bytes except bytes 16..20, which hold `00 00 80 3F`.
    pub fn to_le_bytes(&self) -> [u8; MeshVertex::SIZE] {
        let components: [f32; 8] = bytemuck::cast(*self);
        let mut out = [0u8; Self::SIZE];
        for (chunk, value) in out.chunks_exact_mut(4).zip(components) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn from_le_bytes(bytes: &[u8; MeshVertex::SIZE]) -> Self {
        let mut components = [0f32; 8];
        for (value, chunk) in components.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        bytemuck::cast(components)
    }

    /// Views a vertex sequence as the byte buffer handed to the GPU.
    pub fn as_bytes(vertices: &[MeshVertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }

    /// Reinterprets a byte buffer as vertices without copying.
    pub fn cast_bytes(bytes: &[u8]) -> LayoutResult<&[MeshVertex]> {
        bytemuck::try_cast_slice(bytes).map_err(|e| match e {
            PodCastError::TargetAlignmentGreaterAndInputNotAligned => {
                LayoutError::Misaligned(format!(
                    "vertex data at {:p} is not {}-byte aligned",
                    bytes.as_ptr(),
                    align_of::<MeshVertex>()
                ))
            }
            _ => LayoutError::BufferSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            },
        })
    }

    /// Copies vertices out of a byte buffer of any alignment.
    pub fn read_unaligned(bytes: &[u8]) -> LayoutResult<Vec<MeshVertex>> {
        if bytes.len() % Self::SIZE != 0 {
            return Err(LayoutError::BufferSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Ok(bytes
            .chunks_exact(Self::SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}

impl GpuLayout for MeshVertex {
    const NAME: &'static str = "MeshVertex";

    fn struct_layout() -> StructLayout {
        let field = |name: &str, offset: usize, components: u32| {
            FieldLayout::new(name, offset as u32, ScalarKind::Float32, components)
        };
        StructLayout {
            name: Self::NAME.to_string(),
            size: Self::SIZE as u32,
            align: align_of::<Self>() as u32,
            fields: vec![
                field("position", offset_of!(MeshVertex, position), 3),
                field("normal", offset_of!(MeshVertex, normal), 3),
                field("uv", offset_of!(MeshVertex, uv), 2),
            ],
        }
    }
}
