//! Raw byte buffers backing a decode session.
//!
//! Each glTF buffer is stored as a [`Buffer`]: the backing bytes (borrowed
//! from the caller's GLB input or owned after loading a URI) plus a
//! [`ChunkWindow`] describing where the buffer's `byteLength` bytes live
//! inside them. For the GLB-embedded buffer the window starts at the BIN
//! chunk payload offset, so the whole file can be kept as one allocation.

use std::borrow::Cow;

use crate::container::ChunkDescriptor;
use crate::error::{DecodeError, DecodeResult};

/// Location of a buffer's bytes inside its backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkWindow {
    pub base_offset: usize,
    pub len: usize,
}

impl ChunkWindow {
    pub fn new(base_offset: usize, len: usize) -> Self {
        Self { base_offset, len }
    }

    pub fn end(&self) -> Option<usize> {
        self.base_offset.checked_add(self.len)
    }
}

#[derive(Debug, Clone)]
pub struct Buffer<'a> {
    index: usize,
    bytes: Cow<'a, [u8]>,
    window: ChunkWindow,
}

impl<'a> Buffer<'a> {
    /// Creates a buffer whose window must fit inside `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Bounds` if the window extends past the backing
    /// storage.
    pub fn new(index: usize, bytes: Cow<'a, [u8]>, window: ChunkWindow) -> DecodeResult<Self> {
        match window.end() {
            Some(end) if end <= bytes.len() => Ok(Self {
                index,
                bytes,
                window,
            }),
            _ => Err(DecodeError::bounds(format!(
                "Buffer {} declares {} bytes at offset {}, backing storage has {}",
                index,
                window.len,
                window.base_offset,
                bytes.len()
            ))),
        }
    }

    /// A buffer that spans all of `data`.
    pub fn owned(index: usize, data: Vec<u8>, declared_len: usize) -> DecodeResult<Self> {
        Self::new(index, Cow::Owned(data), ChunkWindow::new(0, declared_len))
    }

    /// A buffer backed by a GLB BIN chunk.
    ///
    /// `data` is the complete GLB byte stream the chunk descriptor refers to.
    /// The window covers the declared `byteLength`, which must not exceed the
    /// chunk payload (trailing chunk padding is allowed).
    pub fn from_glb_chunk(
        index: usize,
        data: Cow<'a, [u8]>,
        chunk: ChunkDescriptor,
        declared_len: usize,
    ) -> DecodeResult<Self> {
        if declared_len > chunk.length {
            return Err(DecodeError::bounds(format!(
                "Buffer {} declares {} bytes but the BIN chunk holds {}",
                index, declared_len, chunk.length
            )));
        }
        Self::new(index, data, ChunkWindow::new(chunk.offset, declared_len))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn window(&self) -> ChunkWindow {
        self.window
    }

    /// Declared length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.window.len
    }

    pub fn is_empty(&self) -> bool {
        self.window.len == 0
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self.bytes, Cow::Borrowed(_))
    }

    /// The full backing storage, including bytes outside the window.
    pub fn backing(&self) -> &[u8] {
        &self.bytes
    }

    /// The buffer's own bytes.
    pub fn data(&self) -> &[u8] {
        &self.bytes[self.window.base_offset..self.window.base_offset + self.window.len]
    }
}

/// All buffers of a decode session, keyed by buffer index.
///
/// Slots may stay empty when a buffer was declared but never loaded (for
/// example an external URI opened without a loader). Accessing such a slot
/// is an invalid reference.
#[derive(Debug, Clone, Default)]
pub struct BufferRegistry<'a> {
    buffers: Vec<Option<Buffer<'a>>>,
}

impl<'a> BufferRegistry<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `count` empty slots.
    pub fn with_slots(count: usize) -> Self {
        Self {
            buffers: vec![None; count],
        }
    }

    /// Stores a buffer in its slot, growing the registry as needed.
    pub fn insert(&mut self, buffer: Buffer<'a>) {
        let index = buffer.index();
        if index >= self.buffers.len() {
            self.buffers.resize(index + 1, None);
        }
        self.buffers[index] = Some(buffer);
    }

    pub fn get(&self, index: usize) -> DecodeResult<&Buffer<'a>> {
        self.buffers
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(DecodeError::InvalidReference {
                kind: "buffer",
                index,
            })
    }

    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_ok()
    }

    /// Number of slots, loaded or not.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer<'a>> {
        self.buffers.iter().flatten()
    }
}
