//! Sparse accessor patching.
//!
//! A sparse accessor stores `count` (index, value) pairs that override
//! elements of its dense base. The patcher converts both windows with the
//! regular conversion table and then copies each value element over the base
//! element it names. Indices may appear in any order; when an index repeats,
//! the last pair wins.

use crate::accessor::SparseWindows;
use crate::convert::{select, Converter, ConverterKey, Destination, Semantic, TypedArray, Winding};
use crate::error::{DecodeError, DecodeResult};

#[derive(Debug, Clone, Copy)]
pub struct SparsePatcher<'a> {
    windows: SparseWindows<'a>,
    index_converter: Converter,
    value_converter: Converter,
}

impl<'a> SparsePatcher<'a> {
    /// Prepares a patch whose values are converted like the base accessor
    /// described by `base_key`.
    ///
    /// Values are always read packed and never re-wound; a flipped index
    /// buffer has to be flipped after patching.
    pub fn new(windows: SparseWindows<'a>, base_key: ConverterKey) -> DecodeResult<Self> {
        let index_converter = select(ConverterKey::for_window(
            Semantic::SparseIndex,
            &windows.indices,
            Winding::Preserve,
        ))?;
        let value_converter = select(ConverterKey {
            interleaved: false,
            winding: Winding::Preserve,
            ..base_key
        })?;
        Ok(Self {
            windows,
            index_converter,
            value_converter,
        })
    }

    pub fn count(&self) -> usize {
        self.windows.count()
    }

    /// Applies the patch to the converted base in `dest`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Bounds` if any index is not strictly less than
    /// the number of base elements. Nothing is written in that case.
    pub fn apply(&self, dest: &mut Destination<'_>) -> DecodeResult<()> {
        let indices = match self.index_converter.convert(&self.windows.indices)? {
            TypedArray::U32(indices) => indices,
            other => {
                return Err(DecodeError::structural(format!(
                    "Sparse indices converted to {:?}",
                    other.kind()
                )))
            }
        };
        let values = self.value_converter.convert(&self.windows.values)?;

        let base_count = dest.element_count();
        if let Some((i, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= base_count)
        {
            return Err(DecodeError::bounds(format!(
                "Sparse index {} at position {} is out of range for {} elements",
                index, i, base_count
            )));
        }

        match (dest, &values) {
            (Destination::F32 { data, components }, TypedArray::F32 { data: src, .. }) => {
                patch_elements(&mut **data, *components, &indices, src.as_slice())
            }
            (Destination::U16 { data, components }, TypedArray::U16 { data: src, .. }) => {
                patch_elements(&mut **data, *components, &indices, src.as_slice())
            }
            (Destination::U32(data), TypedArray::U32(src)) => {
                patch_elements(&mut **data, 1, &indices, src.as_slice())
            }
            (Destination::I32(data), TypedArray::I32(src)) => {
                patch_elements(&mut **data, 1, &indices, src.as_slice())
            }
            (dest, values) => {
                return Err(DecodeError::structural(format!(
                    "Sparse values {:?} do not match destination {:?}",
                    values.kind(),
                    dest.kind()
                )))
            }
        }
        Ok(())
    }
}

/// Copies element `i` of `values` over element `indices[i]` of `base`.
///
/// Indices must already be range-checked.
pub fn patch_elements<T: Copy>(base: &mut [T], width: usize, indices: &[u32], values: &[T]) {
    for (element, &index) in values.chunks_exact(width).zip(indices) {
        let start = index as usize * width;
        base[start..start + width].copy_from_slice(element);
    }
}
