//! glTF/GLB accessor decoding sessions.
//!
//! This crate turns a glTF 2.0 asset into mesh-ready typed arrays. It builds
//! on `glb-core` for container parsing and numeric conversion and adds the
//! JSON document model, buffer loading, task scheduling and primitive
//! assembly.
//!
//! # Reading a GLB
//!
//! ```ignore
//! use glb_io::GltfReader;
//!
//! let bytes = std::fs::read("model.glb")?;
//! let reader = GltfReader::from_glb(&bytes)?;
//! let primitive = reader.decode_primitive(0, 0)?;
//! println!("{} triangles", primitive.triangle_count().unwrap_or(0));
//! ```
//!
//! # Options
//!
//! | Option                     | Default        | Effect                                            |
//! |----------------------------|----------------|---------------------------------------------------|
//! | `Winding`                  | `Preserve`     | `Flip` reverses every index triple                |
//! | `ExecutionStrategy`        | `Parallel`     | `Sequential`, rayon global pool, or a fixed pool  |
//! | `OptionalAttributePolicy`  | `Fail`         | `Skip` drops bad optional attributes              |
//! | `BatchGranularity`         | `PerPrimitive` | `WholeAsset` joins once for all primitives        |
//!
//! Without the `parallel` feature every strategy runs on the calling thread.

pub mod assembler;
pub mod document;
pub mod gltf_reader;
pub mod options;
pub mod scheduler;
pub mod traits;

// Re-export main types for convenience
pub use assembler::{AttributeSlot, Bounds, DecodedPrimitive, OutputAssembler, PrimitivePlan, SkippedAttribute, Topology};
pub use document::{GltfDocument, Mesh, Primitive};
pub use gltf_reader::{GltfError, GltfReader, PrimitiveId};
pub use options::{BatchGranularity, DecodeOptions, ExecutionStrategy, OptionalAttributePolicy};
pub use scheduler::{Batch, ConversionPlan, ConversionUnit, TaskScheduler, UnitLabel, UnitReport};
pub use traits::{BufferLoader, DataUriLoader, FsLoader};

pub use glb_core::{DecodeError, DecodeResult, Semantic, TypedArray, Winding};
