//! GLB Core Library
//!
//! Container parsing, accessor resolution and numeric conversion for binary
//! glTF 2.0 assets. Converts accessor data into typed, contiguous buffers.

#![allow(clippy::needless_range_loop)] // Per-element loops index several slices in lockstep

// =============================================================================
// Core modules
// =============================================================================

pub mod accessor;
pub mod buffer;
pub mod byte_reader;
pub mod component_type;
pub mod container;
pub mod convert;
pub mod error;
pub mod sparse;

// =============================================================================
// Re-exports
// =============================================================================

pub use accessor::{
    Accessor, AccessorResolver, BufferView, ResolvedWindow, Sparse, SparseIndices, SparseValues, SparseWindows,
};
pub use buffer::{Buffer, BufferRegistry, ChunkWindow};
pub use byte_reader::ByteReader;
pub use component_type::{element_size, AttributeShape, Component, ComponentType};
pub use container::{is_glb, parse_glb, ChunkDescriptor, ChunkType, GlbContainer, GlbHeader};
pub use convert::{
    flip_triangles, select, try_filled, Converter, ConverterKey, Destination, OutputKind, Semantic, TypedArray, Winding,
};
pub use error::{DecodeError, DecodeResult};
pub use sparse::SparsePatcher;
