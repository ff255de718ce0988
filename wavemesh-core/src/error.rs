use std::fmt;

use crate::layout::LayoutMismatch;

#[derive(Debug)]
pub enum LayoutError {
    ShaderParseFailed(String),
    ShaderValidationFailed(String),
    MissingStruct(String),
    MissingEntryPoint(String),
    UnsupportedType(String),
    InvalidVertexLayout(String),
    Mismatch(Vec<LayoutMismatch>),
    BufferSize { expected: usize, actual: usize },
    Misaligned(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::ShaderParseFailed(msg) => write!(f, "Shader Parse Failed: {}", msg),
            LayoutError::ShaderValidationFailed(msg) => {
                write!(f, "Shader Validation Failed: {}", msg)
            }
            LayoutError::MissingStruct(name) => write!(f, "Missing Struct: {}", name),
            LayoutError::MissingEntryPoint(name) => write!(f, "Missing Entry Point: {}", name),
            LayoutError::UnsupportedType(msg) => write!(f, "Unsupported Type: {}", msg),
            LayoutError::InvalidVertexLayout(msg) => write!(f, "Invalid Vertex Layout: {}", msg),
            LayoutError::Mismatch(mismatches) => {
                write!(f, "Layout Mismatch ({} issue(s))", mismatches.len())?;
                for mismatch in mismatches {
                    write!(f, "\n  - {}", mismatch)?;
                }
                Ok(())
            }
            LayoutError::BufferSize { expected, actual } => {
                write!(f, "Buffer Size: expected a multiple of {} bytes, got {}", expected, actual)
            }
            LayoutError::Misaligned(msg) => write!(f, "Misaligned Buffer: {}", msg),
        }
    }
}

impl std::error::Error for LayoutError {}

pub type LayoutResult<T> = Result<T, LayoutError>;
