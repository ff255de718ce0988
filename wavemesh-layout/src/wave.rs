use std::mem::{align_of, offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use wavemesh_core::{FieldLayout, GpuLayout, ScalarKind, StructLayout};

/// Parameters of one procedural wave evaluation, uploaded as a uniform
/// block once per draw.
///
/// `segment_count == 0` is a degenerate draw but still a valid value here;
/// whoever drives the simulation decides whether to skip it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct WaveDescriptor {
    pub segment_count: u32,
    pub time: f32,
    pub wave_density: f32,
    pub amplitude: f32,
}

const _: () = assert!(size_of::<WaveDescriptor>() == WaveDescriptor::SIZE);
const _: () = assert!(align_of::<WaveDescriptor>() == 4);
const _: () = assert!(offset_of!(WaveDescriptor, segment_count) == 0);
const _: () = assert!(offset_of!(WaveDescriptor, time) == 4);
const _: () = assert!(offset_of!(WaveDescriptor, wave_density) == 8);
const _: () = assert!(offset_of!(WaveDescriptor, amplitude) == 12);
// uniform buffers are sized in 16-byte units
const _: () = assert!(WaveDescriptor::SIZE % 16 == 0);

impl WaveDescriptor {
    pub const SIZE: usize = 16;

    pub fn new(segment_count: u32, time: f32, wave_density: f32, amplitude: f32) -> Self {
        Self {
            segment_count,
            time,
            wave_density,
            amplitude,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.segment_count == 0
    }

    /// Bytes of this descriptor in host order, ready for a uniform upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn to_le_bytes(&self) -> [u8; WaveDescriptor::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.segment_count.to_le_bytes());
        out[4..8].copy_from_slice(&self.time.to_le_bytes());
        out[8..12].copy_from_slice(&self.wave_density.to_le_bytes());
        out[12..16].copy_from_slice(&self.amplitude.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: &[u8; WaveDescriptor::SIZE]) -> Self {
        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        Self {
            segment_count: u32::from_le_bytes(word(0)),
            time: f32::from_le_bytes(word(4)),
            wave_density: f32::from_le_bytes(word(8)),
            amplitude: f32::from_le_bytes(word(12)),
        }
    }
}

impl GpuLayout for WaveDescriptor {
    const NAME: &'static str = "WaveDescriptor";

    fn struct_layout() -> StructLayout {
        use ScalarKind::{Float32, Uint32};
        let field = |name: &str, offset: usize, scalar: ScalarKind| {
            FieldLayout::new(name, offset as u32, scalar, 1)
        };
        StructLayout {
            name: Self::NAME.to_string(),
            size: Self::SIZE as u32,
            align: align_of::<Self>() as u32,
            fields: vec![
                field("segment_count", offset_of!(WaveDescriptor, segment_count), Uint32),
                field("time", offset_of!(WaveDescriptor, time), Float32),
                field("wave_density", offset_of!(WaveDescriptor, wave_density), Float32),
                field("amplitude", offset_of!(WaveDescriptor, amplitude), Float32),
            ],
        }
    }
}
