//! This file is its own compilation unit. It declares the records the way an
//! independent consumer would and checks that both builds agree.

use std::mem::{offset_of, size_of};

use wavemesh_layout::{MeshVertex, WaveDescriptor};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct ConsumerVertex {
    px: f32,
    py: f32,
    pz: f32,
    nx: f32,
    ny: f32,
    nz: f32,
    u: f32,
    v: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct ConsumerWave {
    segment_count: u32,
    time: f32,
    wave_density: f32,
    amplitude: f32,
}

const _: () = assert!(size_of::<ConsumerVertex>() == size_of::<MeshVertex>());
const _: () = assert!(size_of::<ConsumerWave>() == size_of::<WaveDescriptor>());
const _: () = assert!(offset_of!(ConsumerVertex, nx) == offset_of!(MeshVertex, normal));
const _: () = assert!(offset_of!(ConsumerVertex, u) == offset_of!(MeshVertex, uv));
const _: () = assert!(offset_of!(ConsumerWave, amplitude) == offset_of!(WaveDescriptor, amplitude));

#[test]
fn vertices_reinterpret_field_for_field() {
    let vertices = [
        MeshVertex {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            uv: [0.5, 1.0],
        },
        MeshVertex {
            position: [-4.0, 0.125, 9.5],
            normal: [1.0, 0.0, 0.0],
            uv: [0.0, 0.25],
        },
    ];

    let seen: &[ConsumerVertex] = bytemuck::cast_slice(MeshVertex::as_bytes(&vertices));
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[1],
        ConsumerVertex { px: -4.0, py: 0.125, pz: 9.5, nx: 1.0, ny: 0.0, nz: 0.0, u: 0.0, v: 0.25 }
    );
    assert_eq!(seen[0].ny, 1.0);
    assert_eq!(seen[0].u, 0.5);
}

#[test]
fn descriptor_reinterprets_field_for_field() {
    let wave = WaveDescriptor::new(48, 3.5, 0.75, 1.25);
    let seen: ConsumerWave = bytemuck::pod_read_unaligned(wave.as_bytes());
    assert_eq!(
        seen,
        ConsumerWave { segment_count: 48, time: 3.5, wave_density: 0.75, amplitude: 1.25 }
    );

    let zero: ConsumerWave = bytemuck::pod_read_unaligned(WaveDescriptor::default().as_bytes());
    assert_eq!(zero.segment_count, 0);
}

#[test]
fn little_endian_bytes_decode_on_the_consumer_side() {
    let vertex = MeshVertex {
        position: [0.0, 0.0, 0.0],
        normal: [0.0, 1.0, 0.0],
        uv: [0.0, 0.0],
    };
    let bytes = vertex.to_le_bytes();
    let ny = f32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    assert_eq!(ny, 1.0);
    assert!(bytes.iter().enumerate().all(|(i, b)| (16..20).contains(&i) || *b == 0));
}
