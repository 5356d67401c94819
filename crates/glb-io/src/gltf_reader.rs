//! glTF/GLB decode session.
//!
//! [`GltfReader`] owns the parsed document and the buffer registry of one
//! asset and decodes its accessors on demand. Both `.glb` (binary container)
//! and `.gltf` (JSON plus external or embedded buffers) are supported.
//!
//! # Example
//!
//! ```ignore
//! use glb_io::{DecodeOptions, GltfReader, Winding};
//!
//! let reader = GltfReader::open("model.glb")?
//!     .with_options(DecodeOptions::new().with_winding(Winding::Flip));
//!
//! for (id, primitive) in reader.decode_all_primitives() {
//!     let primitive = primitive?;
//!     println!("{:?}: {} vertices", id, primitive.vertex_count());
//! }
//! ```

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use glb_core::{
    is_glb, parse_glb, AccessorResolver, Buffer, BufferRegistry, ChunkDescriptor, DecodeError, DecodeResult,
    Semantic, TypedArray, Winding,
};
use thiserror::Error;

use crate::assembler::{AttributeSlot, DecodedPrimitive, OutputAssembler};
use crate::document::{GltfDocument, Primitive};
use crate::options::{BatchGranularity, DecodeOptions};
use crate::scheduler::{ConversionUnit, TaskScheduler, UnitLabel};
use crate::traits::{BufferLoader, DataUriLoader, FsLoader};

/// Errors that can occur while opening a glTF asset.
#[derive(Error, Debug)]
pub enum GltfError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to load buffer {uri}: {reason}")]
    BufferLoad { uri: String, reason: String },
}

pub type Result<T> = std::result::Result<T, GltfError>;

/// Position of a primitive in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId {
    pub mesh: usize,
    pub primitive: usize,
}

impl PrimitiveId {
    pub fn new(mesh: usize, primitive: usize) -> Self {
        Self { mesh, primitive }
    }
}

/// A decode session over one glTF asset.
///
/// The lifetime is that of the GLB bytes when the reader borrows them
/// ([`GltfReader::from_glb`]); readers that own their bytes are
/// `GltfReader<'static>`.
pub struct GltfReader<'a> {
    document: GltfDocument,
    buffer_views: Vec<glb_core::BufferView>,
    registry: BufferRegistry<'a>,
    options: DecodeOptions,
    scheduler: TaskScheduler,
}

impl GltfReader<'static> {
    /// Open a glTF or GLB file.
    ///
    /// The file type is detected from the magic bytes. External buffers of a
    /// `.gltf` file are loaded relative to its directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;

        if is_glb(&data) {
            let (json, bin) = {
                let container = parse_glb(&data)?;
                (container.json_text()?.to_owned(), container.bin_chunk())
            };
            let document = GltfDocument::from_str(&json)?;
            let glb = bin.map(|chunk| (Cow::Owned(data), chunk));
            Self::from_parts(document, glb, &FsLoader::new(parent_dir(path)))
        } else {
            Self::from_gltf(&data, &FsLoader::new(parent_dir(path)))
        }
    }

    /// Reads a `.gltf` JSON document, loading its buffers through `loader`.
    pub fn from_gltf<L: BufferLoader + ?Sized>(json: &[u8], loader: &L) -> Result<Self> {
        let document = GltfDocument::from_slice(json)?;
        Self::from_parts(document, None, loader)
    }
}

impl<'a> GltfReader<'a> {
    /// Reads a GLB held in memory. Buffer 0 borrows the BIN chunk; other
    /// buffers may only use `data:` URIs.
    pub fn from_glb(data: &'a [u8]) -> Result<Self> {
        Self::from_glb_with_loader(data, &DataUriLoader)
    }

    pub fn from_glb_with_loader<L: BufferLoader + ?Sized>(data: &'a [u8], loader: &L) -> Result<Self> {
        let container = parse_glb(data)?;
        let document = GltfDocument::from_str(container.json_text()?)?;
        let glb = container.bin_chunk().map(|chunk| (Cow::Borrowed(data), chunk));
        Self::from_parts(document, glb, loader)
    }

    fn from_parts<L: BufferLoader + ?Sized>(
        document: GltfDocument,
        glb: Option<(Cow<'a, [u8]>, ChunkDescriptor)>,
        loader: &L,
    ) -> Result<Self> {
        let registry = load_buffers(&document, glb, loader)?;
        let buffer_views = document.core_buffer_views();
        let options = DecodeOptions::default();
        Ok(Self {
            document,
            buffer_views,
            registry,
            options,
            scheduler: TaskScheduler::new(options.execution()),
        })
    }

    /// Replaces the decode options. The scheduler is rebuilt for the new
    /// execution strategy.
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        if options.execution() != self.options.execution() {
            self.scheduler = TaskScheduler::new(options.execution());
        }
        self.options = options;
        self
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    pub fn document(&self) -> &GltfDocument {
        &self.document
    }

    pub fn registry(&self) -> &BufferRegistry<'a> {
        &self.registry
    }

    pub fn num_meshes(&self) -> usize {
        self.document.meshes.len()
    }

    pub fn num_buffers(&self) -> usize {
        self.document.buffers.len()
    }

    fn assembler(&self) -> OutputAssembler<'_, 'a> {
        OutputAssembler::new(
            &self.document,
            AccessorResolver::new(&self.buffer_views, &self.registry),
            self.options,
        )
    }

    /// Decodes primitive `primitive` of mesh `mesh`.
    pub fn decode_primitive(&self, mesh: usize, primitive: usize) -> DecodeResult<DecodedPrimitive> {
        let primitive = self.document.primitive(mesh, primitive)?;
        self.decode_primitive_desc(primitive)
    }

    /// Decodes a caller-supplied primitive description against this
    /// document's accessors.
    pub fn decode_primitive_desc(&self, primitive: &Primitive) -> DecodeResult<DecodedPrimitive> {
        self.assembler().decode(primitive, &self.scheduler)
    }

    /// Decodes a single accessor outside any mesh, such as animation
    /// keyframes or inverse bind matrices.
    ///
    /// `hint` selects the conversion role. Index accessors are never
    /// flipped here.
    pub fn decode_accessor_raw(&self, index: usize, hint: Semantic) -> DecodeResult<TypedArray> {
        let (plan, _) = self.assembler().plan_accessor(index, hint, Winding::Preserve)?;
        let mut output = TypedArray::allocate(plan.output(), plan.count())?;
        let mut batch = self.scheduler.batch();
        batch.enqueue(ConversionUnit::new(
            UnitLabel::new(0, AttributeSlot::Accessor(index)),
            plan,
            output.as_destination(),
        ));
        batch.wait_all()?;
        Ok(output)
    }

    /// Decodes every primitive of every mesh, in document order.
    ///
    /// A failing primitive does not stop the others.
    pub fn decode_all_primitives(&self) -> Vec<(PrimitiveId, DecodeResult<DecodedPrimitive>)> {
        let (ids, primitives): (Vec<PrimitiveId>, Vec<&Primitive>) = self
            .document
            .meshes
            .iter()
            .enumerate()
            .flat_map(|(m, mesh)| {
                mesh.primitives
                    .iter()
                    .enumerate()
                    .map(move |(p, primitive)| (PrimitiveId::new(m, p), primitive))
            })
            .unzip();

        let assembler = self.assembler();
        let results: Vec<DecodeResult<DecodedPrimitive>> = match self.options.batching() {
            BatchGranularity::PerPrimitive => primitives
                .iter()
                .map(|primitive| assembler.decode(primitive, &self.scheduler))
                .collect(),
            BatchGranularity::WholeAsset => assembler.decode_many(&primitives, &self.scheduler),
        };

        ids.into_iter().zip(results).collect()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Fills the registry: buffer 0 without a URI takes the GLB BIN chunk, every
/// buffer with a URI goes through `loader`.
fn load_buffers<'a, L: BufferLoader + ?Sized>(
    document: &GltfDocument,
    mut glb: Option<(Cow<'a, [u8]>, ChunkDescriptor)>,
    loader: &L,
) -> Result<BufferRegistry<'a>> {
    let mut registry = BufferRegistry::with_slots(document.buffers.len());

    for (index, buffer) in document.buffers.iter().enumerate() {
        match &buffer.uri {
            Some(uri) => {
                let bytes = loader.load(uri)?;
                registry.insert(Buffer::owned(index, bytes, buffer.byte_length)?);
            }
            None if index == 0 && glb.is_some() => {
                if let Some((data, chunk)) = glb.take() {
                    registry.insert(Buffer::from_glb_chunk(0, data, chunk, buffer.byte_length)?);
                }
            }
            None => {
                log::debug!("Buffer {} has no URI and no BIN chunk, leaving it unloaded", index);
            }
        }
    }

    if glb.is_some() && !document.buffers.is_empty() {
        log::debug!("Ignoring BIN chunk not claimed by buffer 0");
    }
    Ok(registry)
}
