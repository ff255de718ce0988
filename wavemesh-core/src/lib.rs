pub mod error;
pub mod layout;
pub mod shader;

pub use error::{LayoutError, LayoutResult};
pub use layout::{
    FieldLayout, GpuLayout, LayoutMismatch, ScalarKind, ShaderInput, StructLayout, VertexAttribute,
    VertexFormat, VertexLayout,
};
pub use shader::{ShaderModule, ShaderSource, parse_shader};
