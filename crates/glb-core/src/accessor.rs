//! Accessor descriptors and byte-window resolution.

use crate::buffer::BufferRegistry;
use crate::component_type::{element_size, AttributeShape, ComponentType};
use crate::error::{DecodeError, DecodeResult};

/// A view into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Distance between consecutive elements. `None` or `Some(0)` means
    /// tightly packed.
    pub byte_stride: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    /// `None` means every element is zero.
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub shape: AttributeShape,
    pub count: usize,
    pub normalized: bool,
    pub sparse: Option<Sparse>,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
}

impl Accessor {
    /// A dense accessor with no offset, sparse override or bounds.
    pub fn new(
        buffer_view: Option<usize>,
        component_type: ComponentType,
        shape: AttributeShape,
        count: usize,
    ) -> Self {
        Self {
            buffer_view,
            byte_offset: 0,
            component_type,
            shape,
            count,
            normalized: false,
            sparse: None,
            min: None,
            max: None,
        }
    }

    pub fn element_size(&self) -> usize {
        element_size(self.shape, self.component_type)
    }
}

/// Sparse override of an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseIndices {
    pub buffer_view: usize,
    pub byte_offset: usize,
    pub component_type: ComponentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseValues {
    pub buffer_view: usize,
    pub byte_offset: usize,
}

/// The validated byte window of an accessor.
///
/// `bytes` covers exactly the accessed range: `(count - 1) * stride +
/// element_size` bytes, or nothing for an empty accessor. A window with no
/// bytes is zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow<'a> {
    pub bytes: Option<&'a [u8]>,
    pub shape: AttributeShape,
    pub component_type: ComponentType,
    pub count: usize,
    pub normalized: bool,
    pub element_size: usize,
    pub stride: usize,
}

impl<'a> ResolvedWindow<'a> {
    /// A window with no backing bytes.
    pub fn zeroed(
        shape: AttributeShape,
        component_type: ComponentType,
        count: usize,
        normalized: bool,
    ) -> Self {
        let element_size = element_size(shape, component_type);
        Self {
            bytes: None,
            shape,
            component_type,
            count,
            normalized,
            element_size,
            stride: element_size,
        }
    }

    /// A tightly packed window over `bytes`, which must hold at least `count`
    /// elements.
    pub fn packed(
        bytes: &'a [u8],
        shape: AttributeShape,
        component_type: ComponentType,
        count: usize,
        normalized: bool,
    ) -> DecodeResult<Self> {
        let element_size = element_size(shape, component_type);
        let needed = span(count, element_size, element_size)?;
        if needed > bytes.len() {
            return Err(DecodeError::bounds(format!(
                "{} elements of {} bytes need {} bytes, have {}",
                count,
                element_size,
                needed,
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: Some(&bytes[..needed]),
            shape,
            component_type,
            count,
            normalized,
            element_size,
            stride: element_size,
        })
    }

    pub fn is_zeroed(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn is_interleaved(&self) -> bool {
        self.bytes.is_some() && self.stride != self.element_size
    }

    pub fn num_components(&self) -> usize {
        self.shape.num_components()
    }
}

/// The resolved index and value windows of a sparse override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseWindows<'a> {
    pub indices: ResolvedWindow<'a>,
    pub values: ResolvedWindow<'a>,
}

impl SparseWindows<'_> {
    pub fn count(&self) -> usize {
        self.indices.count
    }
}

/// Bytes spanned by `count` elements laid out `stride` bytes apart.
fn span(count: usize, stride: usize, element_size: usize) -> DecodeResult<usize> {
    if count == 0 {
        return Ok(0);
    }
    (count - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(element_size))
        .ok_or_else(|| DecodeError::bounds(format!("Accessor span overflows: {} elements", count)))
}

/// Computes validated byte windows for accessors.
pub struct AccessorResolver<'r, 'a> {
    buffer_views: &'r [BufferView],
    registry: &'r BufferRegistry<'a>,
}

impl<'r, 'a> AccessorResolver<'r, 'a> {
    pub fn new(buffer_views: &'r [BufferView], registry: &'r BufferRegistry<'a>) -> Self {
        Self {
            buffer_views,
            registry,
        }
    }

    /// Resolves the dense part of `accessor`.
    ///
    /// # Errors
    ///
    /// - `Structural` for a normalized float accessor or a stride smaller than
    ///   the element size.
    /// - `InvalidReference` for a missing buffer view or buffer.
    /// - `Bounds` when the accessed bytes do not fit the buffer view, or the
    ///   view does not fit its buffer.
    pub fn resolve(&self, accessor: &Accessor) -> DecodeResult<ResolvedWindow<'r>> {
        if accessor.normalized && !accessor.component_type.is_integral() {
            return Err(DecodeError::structural(format!(
                "normalized is not allowed for {} accessors",
                accessor.component_type
            )));
        }
        match accessor.buffer_view {
            None => {
                let element_size = accessor.element_size();
                span(accessor.count, element_size, element_size)?;
                Ok(ResolvedWindow::zeroed(
                    accessor.shape,
                    accessor.component_type,
                    accessor.count,
                    accessor.normalized,
                ))
            }
            Some(view) => self.resolve_view(
                view,
                accessor.byte_offset,
                accessor.shape,
                accessor.component_type,
                accessor.count,
                accessor.normalized,
                false,
            ),
        }
    }

    /// Resolves the index and value windows of a sparse override, or `None`
    /// if the accessor has none.
    ///
    /// Indices are read as packed SCALARs of their declared type. Values
    /// share the base accessor's shape, component type and normalization and
    /// are always read packed.
    pub fn resolve_sparse(&self, accessor: &Accessor) -> DecodeResult<Option<SparseWindows<'r>>> {
        let Some(sparse) = accessor.sparse else {
            return Ok(None);
        };
        if !sparse.indices.component_type.is_unsigned_integer() {
            return Err(DecodeError::unsupported(format!(
                "sparse indices of type {}",
                sparse.indices.component_type
            )));
        }
        let indices = self.resolve_view(
            sparse.indices.buffer_view,
            sparse.indices.byte_offset,
            AttributeShape::Scalar,
            sparse.indices.component_type,
            sparse.count,
            false,
            true,
        )?;
        let values = self.resolve_view(
            sparse.values.buffer_view,
            sparse.values.byte_offset,
            accessor.shape,
            accessor.component_type,
            sparse.count,
            accessor.normalized,
            true,
        )?;
        Ok(Some(SparseWindows { indices, values }))
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_view(
        &self,
        view_index: usize,
        byte_offset: usize,
        shape: AttributeShape,
        component_type: ComponentType,
        count: usize,
        normalized: bool,
        force_packed: bool,
    ) -> DecodeResult<ResolvedWindow<'r>> {
        let view = self
            .buffer_views
            .get(view_index)
            .ok_or(DecodeError::InvalidReference {
                kind: "bufferView",
                index: view_index,
            })?;
        let buffer = self.registry.get(view.buffer)?;

        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| {
                DecodeError::bounds(format!(
                    "bufferView {} ({} bytes at offset {}) exceeds buffer {} ({} bytes)",
                    view_index,
                    view.byte_length,
                    view.byte_offset,
                    view.buffer,
                    buffer.len()
                ))
            })?;

        let element_size = element_size(shape, component_type);
        let stride = match view.byte_stride {
            Some(stride) if stride != 0 && !force_packed => stride,
            _ => element_size,
        };
        if stride < element_size {
            return Err(DecodeError::structural(format!(
                "bufferView {} stride {} is smaller than the {} byte element",
                view_index, stride, element_size
            )));
        }

        let len = span(count, stride, element_size)?;
        let fits = byte_offset
            .checked_add(len)
            .map_or(false, |end| end <= view.byte_length);
        if !fits {
            return Err(DecodeError::bounds(format!(
                "Accessor data ({} bytes at offset {}) exceeds bufferView {} length {}",
                len, byte_offset, view_index, view.byte_length
            )));
        }

        // In bounds: view_end <= buffer.len() and byte_offset + len <= byte_length.
        debug_assert!(view_end <= buffer.len());
        let start = buffer.window().base_offset + view.byte_offset + byte_offset;
        let bytes = &buffer.backing()[start..start + len];

        Ok(ResolvedWindow {
            bytes: Some(bytes),
            shape,
            component_type,
            count,
            normalized,
            element_size,
            stride,
        })
    }
}
