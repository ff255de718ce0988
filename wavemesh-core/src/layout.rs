use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LayoutError, LayoutResult};

/// Per-vertex attribute formats understood on both sides of the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
}

impl VertexFormat {
    pub const fn components(self) -> u32 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 => 1,
            VertexFormat::Float32x2 => 2,
            VertexFormat::Float32x3 => 3,
            VertexFormat::Float32x4 => 4,
        }
    }

    pub const fn scalar(self) -> ScalarKind {
        match self {
            VertexFormat::Uint32 => ScalarKind::Uint32,
            _ => ScalarKind::Float32,
        }
    }

    /// Size in bytes of one attribute of this format.
    pub const fn size(self) -> u32 {
        self.components() * self.scalar().width()
    }

    /// Format for a run of `components` scalars of `scalar`, if one exists.
    pub fn from_parts(scalar: ScalarKind, components: u32) -> Option<Self> {
        match (scalar, components) {
            (ScalarKind::Float32, 1) => Some(VertexFormat::Float32),
            (ScalarKind::Float32, 2) => Some(VertexFormat::Float32x2),
            (ScalarKind::Float32, 3) => Some(VertexFormat::Float32x3),
            (ScalarKind::Float32, 4) => Some(VertexFormat::Float32x4),
            (ScalarKind::Uint32, 1) => Some(VertexFormat::Uint32),
            _ => None,
        }
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VertexFormat::Float32 => "Float32",
            VertexFormat::Float32x2 => "Float32x2",
            VertexFormat::Float32x3 => "Float32x3",
            VertexFormat::Float32x4 => "Float32x4",
            VertexFormat::Uint32 => "Uint32",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexLayout {
    pub array_stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Rejects duplicate locations, attributes that overlap and attributes
    /// running past the stride.
    pub fn validate(&self) -> LayoutResult<()> {
        let mut sorted = self.attributes.clone();
        sorted.sort_by_key(|a| a.offset);

        for (i, attr) in sorted.iter().enumerate() {
            let end = attr.offset.checked_add(attr.format.size());
            if end.is_none_or(|end| end > self.array_stride) {
                return Err(LayoutError::InvalidVertexLayout(format!(
                    "location {} ({} @ {}) ends past stride {}",
                    attr.location, attr.format, attr.offset, self.array_stride
                )));
            }
            if let (Some(end), Some(next)) = (end, sorted.get(i + 1)) {
                if end > next.offset {
                    return Err(LayoutError::InvalidVertexLayout(format!(
                        "location {} overlaps location {}",
                        attr.location, next.location
                    )));
                }
            }
            if self.attributes.iter().filter(|a| a.location == attr.location).count() > 1 {
                return Err(LayoutError::InvalidVertexLayout(format!(
                    "location {} bound more than once",
                    attr.location
                )));
            }
        }
        Ok(())
    }

    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }

    /// Full comparison of two descriptions of the same vertex buffer.
    pub fn compare(expected: &VertexLayout, actual: &VertexLayout) -> Vec<LayoutMismatch> {
        let mut mismatches = Vec::new();
        if expected.array_stride != actual.array_stride {
            mismatches.push(LayoutMismatch::Stride {
                expected: expected.array_stride,
                actual: actual.array_stride,
            });
        }

        for want in &expected.attributes {
            match actual.attribute(want.location) {
                None => mismatches.push(LayoutMismatch::MissingLocation {
                    location: want.location,
                    format: want.format,
                }),
                Some(got) => {
                    if got.format != want.format {
                        mismatches.push(LayoutMismatch::LocationFormat {
                            location: want.location,
                            expected: want.format,
                            actual: got.format.to_string(),
                        });
                    }
                    if got.offset != want.offset {
                        mismatches.push(LayoutMismatch::AttributeOffset {
                            location: want.location,
                            expected: want.offset,
                            actual: got.offset,
                        });
                    }
                }
            }
        }

        for got in &actual.attributes {
            if expected.attribute(got.location).is_none() {
                mismatches.push(LayoutMismatch::UnexpectedLocation {
                    location: got.location,
                    format: got.format.to_string(),
                });
            }
        }
        mismatches
    }

    /// Compares the layout against the inputs a vertex shader declares.
    /// Shaders carry no offsets, only locations and types.
    pub fn compare_inputs(&self, inputs: &[ShaderInput]) -> Vec<LayoutMismatch> {
        let mut mismatches = Vec::new();

        for want in &self.attributes {
            match inputs.iter().find(|i| i.location == want.location) {
                None => mismatches.push(LayoutMismatch::MissingLocation {
                    location: want.location,
                    format: want.format,
                }),
                Some(input) if input.format != Some(want.format) => {
                    mismatches.push(LayoutMismatch::LocationFormat {
                        location: want.location,
                        expected: want.format,
                        actual: input.type_name.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        for input in inputs {
            if self.attribute(input.location).is_none() {
                mismatches.push(LayoutMismatch::UnexpectedLocation {
                    location: input.location,
                    format: input.type_name.clone(),
                });
            }
        }
        mismatches
    }
}

/// One location-bound input of a vertex entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderInput {
    pub location: u32,
    /// `None` when the shader type has no matching `VertexFormat`.
    pub format: Option<VertexFormat>,
    pub type_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Float32,
    Uint32,
}

impl ScalarKind {
    pub const fn width(self) -> u32 {
        4
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Float32 => f.write_str("f32"),
            ScalarKind::Uint32 => f.write_str("u32"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub scalar: ScalarKind,
    pub components: u32,
}

impl FieldLayout {
    pub fn new(name: impl Into<String>, offset: u32, scalar: ScalarKind, components: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            size: scalar.width() * components,
            scalar,
            components,
        }
    }

    pub fn type_name(&self) -> String {
        if self.components == 1 {
            self.scalar.to_string()
        } else {
            format!("{}x{}", self.scalar, self.components)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub name: String,
    pub size: u32,
    pub align: u32,
    pub fields: Vec<FieldLayout>,
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Bytes not covered by any field.
    pub fn padding(&self) -> u32 {
        let covered: u32 = self.fields.iter().map(|f| f.size).sum();
        self.size.saturating_sub(covered)
    }

    /// Compares two layouts of the same record field by field, in order.
    /// Alignment is left out: shader structs are often more aligned than
    /// the host record without changing any offset.
    pub fn compare(
        expected: &StructLayout,
        actual: &StructLayout,
        match_names: bool,
    ) -> Vec<LayoutMismatch> {
        let record = expected.name.clone();
        let mut mismatches = Vec::new();

        if expected.size != actual.size {
            mismatches.push(LayoutMismatch::Size {
                record: record.clone(),
                expected: expected.size,
                actual: actual.size,
            });
        }
        if expected.fields.len() != actual.fields.len() {
            mismatches.push(LayoutMismatch::FieldCount {
                record: record.clone(),
                expected: expected.fields.len(),
                actual: actual.fields.len(),
            });
        }

        for (index, (want, got)) in expected.fields.iter().zip(&actual.fields).enumerate() {
            if match_names && want.name != got.name {
                mismatches.push(LayoutMismatch::FieldName {
                    record: record.clone(),
                    index,
                    expected: want.name.clone(),
                    actual: got.name.clone(),
                });
            }
            if want.offset != got.offset {
                mismatches.push(LayoutMismatch::FieldOffset {
                    record: record.clone(),
                    field: want.name.clone(),
                    expected: want.offset,
                    actual: got.offset,
                });
            }
            if want.scalar != got.scalar || want.components != got.components {
                mismatches.push(LayoutMismatch::FieldType {
                    record: record.clone(),
                    field: want.name.clone(),
                    expected: want.type_name(),
                    actual: got.type_name(),
                });
            }
        }
        mismatches
    }
}

/// A record whose byte layout is shared with shader code.
pub trait GpuLayout {
    const NAME: &'static str;

    fn struct_layout() -> StructLayout;
}

/// One point of disagreement between two descriptions of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMismatch {
    Version { expected: u32, actual: u32 },
    MissingRecord { record: String },
    Size { record: String, expected: u32, actual: u32 },
    Align { record: String, expected: u32, actual: u32 },
    FieldCount { record: String, expected: usize, actual: usize },
    FieldName { record: String, index: usize, expected: String, actual: String },
    FieldOffset { record: String, field: String, expected: u32, actual: u32 },
    FieldType { record: String, field: String, expected: String, actual: String },
    Stride { expected: u32, actual: u32 },
    MissingLocation { location: u32, format: VertexFormat },
    LocationFormat { location: u32, expected: VertexFormat, actual: String },
    AttributeOffset { location: u32, expected: u32, actual: u32 },
    UnexpectedLocation { location: u32, format: String },
}

impl fmt::Display for LayoutMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMismatch::Version { expected, actual } => {
                write!(f, "layout version {} expected, found {}", expected, actual)
            }
            LayoutMismatch::MissingRecord { record } => write!(f, "{}: record missing", record),
            LayoutMismatch::Size { record, expected, actual } => {
                write!(f, "{}: size {} bytes expected, found {}", record, expected, actual)
            }
            LayoutMismatch::Align { record, expected, actual } => {
                write!(f, "{}: alignment {} expected, found {}", record, expected, actual)
            }
            LayoutMismatch::FieldCount { record, expected, actual } => {
                write!(f, "{}: {} fields expected, found {}", record, expected, actual)
            }
            LayoutMismatch::FieldName { record, index, expected, actual } => {
                write!(
                    f,
                    "{}: field #{} should be `{}`, found `{}`",
                    record, index, expected, actual
                )
            }
            LayoutMismatch::FieldOffset { record, field, expected, actual } => {
                write!(f, "{}.{}: offset {} expected, found {}", record, field, expected, actual)
            }
            LayoutMismatch::FieldType { record, field, expected, actual } => {
                write!(f, "{}.{}: type {} expected, found {}", record, field, expected, actual)
            }
            LayoutMismatch::Stride { expected, actual } => {
                write!(f, "vertex stride {} expected, found {}", expected, actual)
            }
            LayoutMismatch::MissingLocation { location, format } => {
                write!(f, "location {}: {} input missing", location, format)
            }
            LayoutMismatch::LocationFormat { location, expected, actual } => {
                write!(f, "location {}: {} expected, found {}", location, expected, actual)
            }
            LayoutMismatch::AttributeOffset { location, expected, actual } => {
                write!(f, "location {}: offset {} expected, found {}", location, expected, actual)
            }
            LayoutMismatch::UnexpectedLocation { location, format } => {
                write!(f, "location {}: unexpected {} input", location, format)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleaved() -> VertexLayout {
        VertexLayout {
            array_stride: 20,
            attributes: vec![
                VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
                VertexAttribute { location: 1, format: VertexFormat::Float32x2, offset: 12 },
            ],
        }
    }

    fn record(fields: Vec<FieldLayout>) -> StructLayout {
        let size = fields.iter().map(|f| f.offset + f.size).max().unwrap_or(0);
        StructLayout { name: "Params".into(), size, align: 4, fields }
    }

    #[test]
    fn vertex_format_sizes() {
        assert_eq!(VertexFormat::Float32.size(), 4);
        assert_eq!(VertexFormat::Float32x2.size(), 8);
        assert_eq!(VertexFormat::Float32x3.size(), 12);
        assert_eq!(VertexFormat::Float32x4.size(), 16);
        assert_eq!(VertexFormat::Uint32.size(), 4);
        assert_eq!(VertexFormat::from_parts(ScalarKind::Uint32, 3), None);
    }

    #[test]
    fn interleaved_layout_is_valid() {
        assert!(interleaved().validate().is_ok());
    }

    #[test]
    fn overlapping_attributes_are_rejected() {
        let mut layout = interleaved();
        layout.attributes[1].offset = 8;
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidVertexLayout(_))));
    }

    #[test]
    fn attribute_past_stride_is_rejected() {
        let mut layout = interleaved();
        layout.array_stride = 16;
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidVertexLayout(_))));
    }

    #[test]
    fn attribute_offset_overflow_is_rejected() {
        let layout = VertexLayout {
            array_stride: 32,
            attributes: vec![VertexAttribute {
                location: 0,
                format: VertexFormat::Float32x3,
                offset: u32::MAX,
            }],
        };
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidVertexLayout(_))));

        let mut layout = interleaved();
        layout.array_stride = u32::MAX;
        layout.attributes[1].offset = u32::MAX - 4;
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidVertexLayout(_))));
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let mut layout = interleaved();
        layout.attributes[1].location = 0;
        assert!(matches!(layout.validate(), Err(LayoutError::InvalidVertexLayout(_))));
    }

    #[test]
    fn identical_vertex_layouts_agree() {
        assert!(VertexLayout::compare(&interleaved(), &interleaved()).is_empty());
    }

    #[test]
    fn vertex_layout_drift_is_listed() {
        let mut other = interleaved();
        other.array_stride = 24;
        other.attributes[1].offset = 16;
        other.attributes.push(VertexAttribute {
            location: 4,
            format: VertexFormat::Uint32,
            offset: 20,
        });

        let mismatches = VertexLayout::compare(&interleaved(), &other);
        assert_eq!(
            mismatches,
            vec![
                LayoutMismatch::Stride { expected: 20, actual: 24 },
                LayoutMismatch::AttributeOffset { location: 1, expected: 12, actual: 16 },
                LayoutMismatch::UnexpectedLocation { location: 4, format: "Uint32".into() },
            ]
        );
    }

    #[test]
    fn shader_inputs_checked_by_location() {
        let inputs = vec![
            ShaderInput {
                location: 0,
                format: Some(VertexFormat::Float32x3),
                type_name: "vec3<f32>".into(),
            },
            ShaderInput {
                location: 1,
                format: Some(VertexFormat::Float32x3),
                type_name: "vec3<f32>".into(),
            },
        ];
        let mismatches = interleaved().compare_inputs(&inputs);
        assert_eq!(
            mismatches,
            vec![LayoutMismatch::LocationFormat {
                location: 1,
                expected: VertexFormat::Float32x2,
                actual: "vec3<f32>".into(),
            }]
        );
    }

    #[test]
    fn struct_compare_reports_each_kind_of_drift() {
        let expected = record(vec![
            FieldLayout::new("count", 0, ScalarKind::Uint32, 1),
            FieldLayout::new("scale", 4, ScalarKind::Float32, 1),
        ]);
        let actual = record(vec![
            FieldLayout::new("scale", 0, ScalarKind::Float32, 1),
            FieldLayout::new("count", 8, ScalarKind::Uint32, 1),
        ]);

        let mismatches = StructLayout::compare(&expected, &actual, true);
        assert!(mismatches.contains(&LayoutMismatch::Size {
            record: "Params".into(),
            expected: 8,
            actual: 12,
        }));
        assert!(mismatches.contains(&LayoutMismatch::FieldType {
            record: "Params".into(),
            field: "count".into(),
            expected: "u32".into(),
            actual: "f32".into(),
        }));
        assert!(mismatches.contains(&LayoutMismatch::FieldOffset {
            record: "Params".into(),
            field: "scale".into(),
            expected: 4,
            actual: 8,
        }));
        assert_eq!(
            mismatches.iter().filter(|m| matches!(m, LayoutMismatch::FieldName { .. })).count(),
            2
        );
    }

    #[test]
    fn names_ignored_when_asked() {
        let expected = record(vec![FieldLayout::new("segment_count", 0, ScalarKind::Uint32, 1)]);
        let actual = record(vec![FieldLayout::new("segmentCount", 0, ScalarKind::Uint32, 1)]);
        assert!(StructLayout::compare(&expected, &actual, false).is_empty());
        assert_eq!(StructLayout::compare(&expected, &actual, true).len(), 1);
    }

    #[test]
    fn padding_counts_uncovered_bytes() {
        let mut layout = record(vec![FieldLayout::new("x", 0, ScalarKind::Float32, 3)]);
        assert_eq!(layout.padding(), 0);
        layout.size = 16;
        assert_eq!(layout.padding(), 4);
    }

    #[test]
    fn mismatch_messages_name_the_field() {
        let mismatch = LayoutMismatch::FieldOffset {
            record: "WaveDescriptor".into(),
            field: "time".into(),
            expected: 4,
            actual: 8,
        };
        assert_eq!(mismatch.to_string(), "WaveDescriptor.time: offset 4 expected, found 8");
    }
}
