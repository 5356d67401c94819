//! The accessor-model subset of the glTF JSON document.
//!
//! Only `buffers`, `bufferViews`, `accessors` and `meshes` are deserialized;
//! every other top-level property is ignored. Component types and shape
//! names are kept as raw JSON values here and validated when an accessor is
//! converted into a [`glb_core::Accessor`], so one bad accessor never stops
//! the rest of the document from decoding.

use std::collections::BTreeMap;

use glb_core::{AttributeShape, ComponentType, DecodeError, DecodeResult};
use serde::Deserialize;

// ============================================================================
// glTF JSON Schema (accessor model)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfDocument {
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub accessor_type: String,
    #[serde(default)]
    pub normalized: bool,
    pub sparse: Option<AccessorSparse>,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorSparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<Primitive>,
}

/// A mesh primitive: attribute name to accessor index, plus topology.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub mode: Option<u32>,
    pub material: Option<usize>,
}

impl Primitive {
    /// A triangle primitive with the given attributes.
    pub fn new<I, S>(attributes: I, indices: Option<usize>) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            indices,
            mode: None,
            material: None,
        }
    }
}

// ============================================================================
// Conversion to core descriptors
// ============================================================================

fn component_type(code: u32) -> DecodeResult<ComponentType> {
    ComponentType::from_gl(code).ok_or_else(|| DecodeError::unsupported(format!("component type {}", code)))
}

fn shape(name: &str) -> DecodeResult<AttributeShape> {
    AttributeShape::from_name(name).ok_or_else(|| DecodeError::unsupported(format!("accessor type {:?}", name)))
}

impl GltfDocument {
    pub fn from_slice(json: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(json)
    }

    pub fn from_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Buffer views as core descriptors.
    pub fn core_buffer_views(&self) -> Vec<glb_core::BufferView> {
        self.buffer_views
            .iter()
            .map(|view| glb_core::BufferView {
                buffer: view.buffer,
                byte_offset: view.byte_offset,
                byte_length: view.byte_length,
                byte_stride: view.byte_stride,
            })
            .collect()
    }

    /// Validates accessor `index` and converts it to a core descriptor.
    ///
    /// # Errors
    ///
    /// `InvalidReference` if the accessor does not exist, `UnsupportedFormat`
    /// for an unknown component type or shape name.
    pub fn accessor(&self, index: usize) -> DecodeResult<glb_core::Accessor> {
        let accessor = self
            .accessors
            .get(index)
            .ok_or(DecodeError::InvalidReference { kind: "accessor", index })?;

        let sparse = match &accessor.sparse {
            Some(sparse) => Some(glb_core::Sparse {
                count: sparse.count,
                indices: glb_core::SparseIndices {
                    buffer_view: sparse.indices.buffer_view,
                    byte_offset: sparse.indices.byte_offset,
                    component_type: component_type(sparse.indices.component_type)?,
                },
                values: glb_core::SparseValues {
                    buffer_view: sparse.values.buffer_view,
                    byte_offset: sparse.values.byte_offset,
                },
            }),
            None => None,
        };

        Ok(glb_core::Accessor {
            buffer_view: accessor.buffer_view,
            byte_offset: accessor.byte_offset,
            component_type: component_type(accessor.component_type)?,
            shape: shape(&accessor.accessor_type)?,
            count: accessor.count,
            normalized: accessor.normalized,
            sparse,
            min: accessor.min.clone(),
            max: accessor.max.clone(),
        })
    }

    pub fn mesh(&self, index: usize) -> DecodeResult<&Mesh> {
        self.meshes
            .get(index)
            .ok_or(DecodeError::InvalidReference { kind: "mesh", index })
    }

    pub fn primitive(&self, mesh: usize, primitive: usize) -> DecodeResult<&Primitive> {
        self.mesh(mesh)?
            .primitives
            .get(primitive)
            .ok_or(DecodeError::InvalidReference {
                kind: "primitive",
                index: primitive,
            })
    }

    /// `(mesh, primitive)` pairs in document order.
    pub fn primitive_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.meshes
            .iter()
            .enumerate()
            .flat_map(|(m, mesh)| (0..mesh.primitives.len()).map(move |p| (m, p)))
    }
}
