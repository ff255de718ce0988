use naga::front::glsl;
use naga::{ArraySize, Binding, Handle, Type, TypeInner};

use crate::layout::{FieldLayout, ScalarKind, ShaderInput, StructLayout, VertexFormat};
use crate::{LayoutError, LayoutResult};

pub enum ShaderSource<'a> {
    Glsl {
        source: &'a str,
        stage: naga::ShaderStage,
        defines: naga::FastHashMap<String, String>,
    },
    Wgsl(&'a str),
}

/// A parsed and validated shader, ready for layout reflection.
pub struct ShaderModule {
    module: naga::Module,
}

pub fn parse_shader(source: ShaderSource) -> LayoutResult<ShaderModule> {
    let module = match source {
        ShaderSource::Wgsl(src) => naga::front::wgsl::Frontend::new()
            .parse(src)
            .map_err(|e| LayoutError::ShaderParseFailed(e.emit_to_string(src)))?,
        ShaderSource::Glsl { source, stage, defines } => {
            let mut parser = glsl::Frontend::default();
            let options = glsl::Options { stage, defines };
            parser
                .parse(&options, source)
                .map_err(|e| LayoutError::ShaderParseFailed(format!("GLSL parse error: {:?}", e)))?
        }
    };

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| LayoutError::ShaderValidationFailed(format!("{:?}", e)))?;

    log::debug!(
        "Parsed shader module: {} types, {} entry points",
        module.types.len(),
        module.entry_points.len()
    );

    Ok(ShaderModule { module })
}

impl ShaderModule {
    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    pub fn has_struct(&self, name: &str) -> bool {
        self.find_struct(name).is_some()
    }

    pub fn has_vertex_entry(&self) -> bool {
        self.module
            .entry_points
            .iter()
            .any(|ep| ep.stage == naga::ShaderStage::Vertex)
    }

    /// Reflects the host-shareable layout of the struct called `name`.
    pub fn struct_layout(&self, name: &str) -> LayoutResult<StructLayout> {
        let (handle, members, span) = self
            .find_struct(name)
            .ok_or_else(|| LayoutError::MissingStruct(name.to_string()))?;

        let mut fields = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            let field_name = member.name.clone().unwrap_or_else(|| format!("member{}", index));
            let (scalar, components) = self.shape(member.ty).ok_or_else(|| {
                LayoutError::UnsupportedType(format!(
                    "{}.{}: {}",
                    name,
                    field_name,
                    self.type_name(member.ty)
                ))
            })?;
            fields.push(FieldLayout::new(field_name, member.offset, scalar, components));
        }

        Ok(StructLayout {
            name: name.to_string(),
            size: span,
            align: self.alignment(handle),
            fields,
        })
    }

    /// Location-bound inputs of a vertex entry point, sorted by location.
    /// With `entry == None` the first vertex entry point is used.
    pub fn vertex_inputs(&self, entry: Option<&str>) -> LayoutResult<Vec<ShaderInput>> {
        let ep = self
            .module
            .entry_points
            .iter()
            .find(|ep| {
                ep.stage == naga::ShaderStage::Vertex && entry.is_none_or(|name| ep.name == name)
            })
            .ok_or_else(|| {
                LayoutError::MissingEntryPoint(entry.unwrap_or("<vertex>").to_string())
            })?;

        let mut inputs = Vec::new();
        for arg in &ep.function.arguments {
            match &arg.binding {
                Some(Binding::Location { location, .. }) => {
                    inputs.push(self.shader_input(*location, arg.ty))
                }
                Some(_) => {}
                None => {
                    if let TypeInner::Struct { members, .. } = &self.module.types[arg.ty].inner {
                        for member in members {
                            if let Some(Binding::Location { location, .. }) = &member.binding {
                                inputs.push(self.shader_input(*location, member.ty));
                            }
                        }
                    }
                }
            }
        }

        inputs.sort_by_key(|i| i.location);
        Ok(inputs)
    }

    /// Location-bound members of the struct called `name`, sorted by location.
    pub fn struct_inputs(&self, name: &str) -> LayoutResult<Vec<ShaderInput>> {
        let (_, members, _) = self
            .find_struct(name)
            .ok_or_else(|| LayoutError::MissingStruct(name.to_string()))?;

        let mut inputs: Vec<ShaderInput> = members
            .iter()
            .filter_map(|member| match &member.binding {
                Some(Binding::Location { location, .. }) => {
                    Some(self.shader_input(*location, member.ty))
                }
                _ => None,
            })
            .collect();
        inputs.sort_by_key(|i| i.location);
        Ok(inputs)
    }

    fn find_struct(&self, name: &str) -> Option<(Handle<Type>, &[naga::StructMember], u32)> {
        self.module.types.iter().find_map(|(handle, ty)| match &ty.inner {
            TypeInner::Struct { members, span } if ty.name.as_deref() == Some(name) => {
                Some((handle, members.as_slice(), *span))
            }
            _ => None,
        })
    }

    fn shader_input(&self, location: u32, ty: Handle<Type>) -> ShaderInput {
        let format = match &self.module.types[ty].inner {
            TypeInner::Scalar(_) | TypeInner::Vector { .. } => self
                .shape(ty)
                .and_then(|(scalar, components)| VertexFormat::from_parts(scalar, components)),
            _ => None,
        };
        ShaderInput {
            location,
            format,
            type_name: self.type_name(ty),
        }
    }

    /// Scalar kind and component count of a member, for the types that can
    /// cross the boundary: 32-bit scalars, vectors of them, and tightly
    /// packed arrays of them.
    fn shape(&self, ty: Handle<Type>) -> Option<(ScalarKind, u32)> {
        match &self.module.types[ty].inner {
            TypeInner::Scalar(scalar) => Some((scalar_kind(scalar)?, 1)),
            TypeInner::Vector { size, scalar } => Some((scalar_kind(scalar)?, *size as u32)),
            TypeInner::Array {
                base,
                size: ArraySize::Constant(count),
                stride,
            } => match self.module.types[*base].inner {
                TypeInner::Scalar(ref scalar) => {
                    let kind = scalar_kind(scalar)?;
                    (*stride == kind.width()).then_some((kind, count.get()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn alignment(&self, ty: Handle<Type>) -> u32 {
        match &self.module.types[ty].inner {
            TypeInner::Vector { size, scalar } => match size {
                naga::VectorSize::Bi => 2 * scalar.width as u32,
                _ => 4 * scalar.width as u32,
            },
            TypeInner::Array { base, .. } => self.alignment(*base),
            TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| self.alignment(m.ty))
                .max()
                .unwrap_or(1),
            TypeInner::Scalar(scalar) => scalar.width as u32,
            _ => 16,
        }
    }

    fn type_name(&self, ty: Handle<Type>) -> String {
        let ty = &self.module.types[ty];
        match &ty.inner {
            TypeInner::Scalar(scalar) => scalar_name(scalar),
            TypeInner::Vector { size, scalar } => {
                format!("vec{}<{}>", *size as u32, scalar_name(scalar))
            }
            TypeInner::Matrix { columns, rows, scalar } => {
                format!("mat{}x{}<{}>", *columns as u32, *rows as u32, scalar_name(scalar))
            }
            TypeInner::Array { base, size, .. } => match size {
                ArraySize::Constant(count) => {
                    format!("array<{}, {}>", self.type_name(*base), count)
                }
                _ => format!("array<{}>", self.type_name(*base)),
            },
            TypeInner::Struct { .. } => ty.name.clone().unwrap_or_else(|| "struct".to_string()),
            other => format!("{:?}", other),
        }
    }
}

fn scalar_kind(scalar: &naga::Scalar) -> Option<ScalarKind> {
    match (scalar.kind, scalar.width) {
        (naga::ScalarKind::Float, 4) => Some(ScalarKind::Float32),
        (naga::ScalarKind::Uint, 4) => Some(ScalarKind::Uint32),
        _ => None,
    }
}

fn scalar_name(scalar: &naga::Scalar) -> String {
    let prefix = match scalar.kind {
        naga::ScalarKind::Float => "f",
        naga::ScalarKind::Uint => "u",
        naga::ScalarKind::Sint => "i",
        naga::ScalarKind::Bool => return "bool".to_string(),
        _ => "abstract",
    };
    format!("{}{}", prefix, scalar.width as u32 * 8)
}
