use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wavemesh_core::{GpuLayout, LayoutMismatch, StructLayout, VertexLayout};

use crate::{LAYOUT_VERSION, MeshVertex, WaveDescriptor};

const MANIFEST_MAGIC: [u8; 4] = *b"WMLM";

/// Serialized description of the shared records as compiled into one build.
///
/// A producer build writes its manifest; a consumer build loads it and
/// compares against its own, catching drift between binaries that were
/// never compiled together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutManifest {
    pub layout_version: u32,
    pub vertex_layout: VertexLayout,
    pub structs: Vec<StructLayout>,
}

impl LayoutManifest {
    pub fn current() -> Self {
        Self {
            layout_version: LAYOUT_VERSION,
            vertex_layout: MeshVertex::vertex_layout(),
            structs: vec![MeshVertex::struct_layout(), WaveDescriptor::struct_layout()],
        }
    }

    pub fn record(&self, name: &str) -> Option<&StructLayout> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = MANIFEST_MAGIC.to_vec();
        bytes.extend(bincode::serialize(self).context("Failed to encode layout manifest")?);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MANIFEST_MAGIC.len() || bytes[..MANIFEST_MAGIC.len()] != MANIFEST_MAGIC {
            anyhow::bail!("Not a layout manifest (bad magic)");
        }
        bincode::deserialize(&bytes[MANIFEST_MAGIC.len()..])
            .context("Failed to decode layout manifest")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?)
            .with_context(|| format!("Failed to write layout manifest: {:?}", path))?;
        log::info!("Wrote layout manifest v{} to {:?}", self.layout_version, path);
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read layout manifest: {:?}", path))?;
        Self::from_bytes(&bytes).with_context(|| format!("Invalid layout manifest: {:?}", path))
    }

    /// Everything `other` disagrees on, taking `self` as the reference.
    pub fn compare(&self, other: &LayoutManifest) -> Vec<LayoutMismatch> {
        let mut mismatches = Vec::new();
        if self.layout_version != other.layout_version {
            mismatches.push(LayoutMismatch::Version {
                expected: self.layout_version,
                actual: other.layout_version,
            });
        }

        for expected in &self.structs {
            match other.record(&expected.name) {
                Some(actual) => {
                    mismatches.extend(StructLayout::compare(expected, actual, true));
                    if expected.align != actual.align {
                        mismatches.push(LayoutMismatch::Align {
                            record: expected.name.clone(),
                            expected: expected.align,
                            actual: actual.align,
                        });
                    }
                }
                None => mismatches.push(LayoutMismatch::MissingRecord {
                    record: expected.name.clone(),
                }),
            }
        }

        mismatches.extend(VertexLayout::compare(&self.vertex_layout, &other.vertex_layout));
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavemesh_core::{FieldLayout, ScalarKind};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wavemesh_manifest_test_{}_{}", std::process::id(), name))
    }

    #[test]
    fn current_manifest_agrees_with_itself() {
        let manifest = LayoutManifest::current();
        assert!(manifest.compare(&manifest.clone()).is_empty());
        assert_eq!(manifest.record("WaveDescriptor").unwrap().size, 16);
        assert_eq!(manifest.record("MeshVertex").unwrap().size, 32);
    }

    #[test]
    fn save_and_load() {
        let path = temp_path("save_and_load");
        let manifest = LayoutManifest::current();
        manifest.save(&path).unwrap();

        let loaded = LayoutManifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = LayoutManifest::current().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(LayoutManifest::from_bytes(&bytes).is_err());
        assert!(LayoutManifest::from_bytes(b"WM").is_err());
    }

    #[test]
    fn over_aligned_build_is_reported() {
        let mut other = LayoutManifest::current();
        for record in &mut other.structs {
            if record.name == "MeshVertex" {
                record.align = 16;
            }
        }

        let mismatches = LayoutManifest::current().compare(&other);
        assert_eq!(
            mismatches,
            vec![LayoutMismatch::Align { record: "MeshVertex".into(), expected: 4, actual: 16 }]
        );
        assert_eq!(mismatches[0].to_string(), "MeshVertex: alignment 4 expected, found 16");
    }

    #[test]
    fn drifted_build_is_reported() {
        let mut other = LayoutManifest::current();
        other.layout_version += 1;
        other.structs.retain(|s| s.name != "MeshVertex");
        other.structs[0].fields[1] = FieldLayout::new("time", 4, ScalarKind::Uint32, 1);
        other.vertex_layout.array_stride = 36;

        let mismatches = LayoutManifest::current().compare(&other);
        assert_eq!(
            mismatches,
            vec![
                LayoutMismatch::Version { expected: LAYOUT_VERSION, actual: LAYOUT_VERSION + 1 },
                LayoutMismatch::MissingRecord { record: "MeshVertex".into() },
                LayoutMismatch::FieldType {
                    record: "WaveDescriptor".into(),
                    field: "time".into(),
                    expected: "f32".into(),
                    actual: "u32".into(),
                },
                LayoutMismatch::Stride { expected: 32, actual: 36 },
            ]
        );
    }
}
