//! Byte layouts shared between CPU code and shaders: the per-vertex
//! `MeshVertex` record and the per-draw `WaveDescriptor` uniform.

pub mod capture;
pub mod contract;
pub mod manifest;
pub mod vertex;
pub mod wave;

pub use capture::{Capture, CaptureHeader, write_capture};
pub use contract::{CheckOptions, ContractReport, WGSL_TYPES, check_shader, check_wgsl};
pub use manifest::LayoutManifest;
pub use vertex::MeshVertex;
pub use wave::WaveDescriptor;

/// Bumped whenever the shape of a shared record changes. Manifests and
/// captures carry it, and readers refuse any other version.
pub const LAYOUT_VERSION: u32 = 1;
