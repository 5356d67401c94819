use byteorder::{ByteOrder, LittleEndian};

use crate::error::DecodeError;

/// Sequential little-endian reader over a borrowed byte slice.
///
/// `ByteReader` is the cursor used by the GLB container parser. Slices
/// returned by [`ByteReader::decode_slice`] borrow from the original input,
/// so chunk payloads are never copied.
///
/// # Example
///
/// ```
/// use glb_core::byte_reader::ByteReader;
///
/// let data = [0x67, 0x6C, 0x54, 0x46, 0x02, 0x00, 0x00, 0x00];
/// let mut reader = ByteReader::new(&data);
///
/// assert_eq!(reader.decode_u32().unwrap(), 0x46546C67);
/// assert_eq!(reader.remaining_size(), 4);
/// ```
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read position in bytes.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Sets the read position.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Format` if the position is beyond the input.
    pub fn set_position(&mut self, pos: usize) -> Result<(), DecodeError> {
        if pos > self.data.len() {
            return Err(DecodeError::format(format!(
                "Position {} exceeds input length {}",
                pos,
                self.data.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    /// Returns the number of bytes remaining.
    pub fn remaining_size(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_size() == 0
    }

    /// Decodes a little-endian u32.
    pub fn decode_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.decode_slice(4)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    /// Decodes and returns a slice of the specified size.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Format` if not enough bytes remain.
    pub fn decode_slice(&mut self, size: usize) -> Result<&'a [u8], DecodeError> {
        if size > self.remaining_size() {
            return Err(DecodeError::format(format!(
                "Unexpected end of input: need {} bytes, have {}",
                size,
                self.remaining_size()
            )));
        }
        let slice = &self.data[self.pos..self.pos + size];
        self.pos += size;
        Ok(slice)
    }

    /// Advances the position to the next multiple of `alignment`, clamped to
    /// the end of the input.
    pub fn align_to(&mut self, alignment: usize) {
        let aligned = self.pos.div_ceil(alignment) * alignment;
        self.pos = aligned.min(self.data.len());
    }
}
