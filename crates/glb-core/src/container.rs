//! GLB (binary glTF) container parsing.
//!
//! A GLB file is a 12-byte header followed by a sequence of chunks:
//!
//! ```text
//! offset 0 : u32 magic    "glTF"
//! offset 4 : u32 version  2
//! offset 8 : u32 length   total file length
//! offset 12: { u32 chunkLength, u32 chunkType, [u8; chunkLength] payload }*
//! ```
//!
//! The first chunk must be JSON. The first BIN chunk backs buffer 0; any
//! later BIN chunks are recorded but not used. Chunks of unknown type are
//! skipped. Payloads are borrowed from the input, never copied.

use crate::byte_reader::ByteReader;
use crate::error::{DecodeError, DecodeResult};

// ============================================================================
// GLB Binary Format Constants
// ============================================================================

pub const GLB_MAGIC: u32 = 0x46546C67; // "glTF" in little-endian
pub const GLB_VERSION: u32 = 2;
pub const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
pub const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

const GLB_HEADER_SIZE: usize = 12;
const GLB_CHUNK_HEADER_SIZE: usize = 8;

/// The fixed 12-byte GLB header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub magic: u32,
    pub version: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Json,
    Bin,
    Unknown(u32),
}

impl ChunkType {
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            GLB_CHUNK_JSON => ChunkType::Json,
            GLB_CHUNK_BIN => ChunkType::Bin,
            other => ChunkType::Unknown(other),
        }
    }
}

/// Location of one chunk payload inside the GLB bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub length: usize,
    pub chunk_type: ChunkType,
    /// Absolute offset of the first payload byte.
    pub offset: usize,
}

impl ChunkDescriptor {
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset..self.offset + self.length]
    }
}

/// A parsed GLB container borrowing its input bytes.
#[derive(Debug, Clone)]
pub struct GlbContainer<'a> {
    data: &'a [u8],
    header: GlbHeader,
    json: ChunkDescriptor,
    bin: Vec<ChunkDescriptor>,
}

/// Returns true if `data` starts with the GLB magic.
pub fn is_glb(data: &[u8]) -> bool {
    let mut reader = ByteReader::new(data);
    matches!(reader.decode_u32(), Ok(GLB_MAGIC))
}

/// Parses a GLB byte stream into its JSON and BIN chunks.
///
/// # Errors
///
/// Returns `DecodeError::Format` for a bad magic or version, a declared
/// length that disagrees with the input, truncated chunks, a first chunk that
/// is not JSON, or a second JSON chunk.
pub fn parse_glb(data: &[u8]) -> DecodeResult<GlbContainer<'_>> {
    if data.len() < GLB_HEADER_SIZE {
        return Err(DecodeError::format("File too small for GLB header"));
    }

    let mut reader = ByteReader::new(data);
    let header = GlbHeader {
        magic: reader.decode_u32()?,
        version: reader.decode_u32()?,
        length: reader.decode_u32()?,
    };

    if header.magic != GLB_MAGIC {
        return Err(DecodeError::format(format!(
            "Invalid GLB magic: {:#010x}",
            header.magic
        )));
    }
    if header.version != GLB_VERSION {
        return Err(DecodeError::format(format!(
            "Unsupported GLB version: {}",
            header.version
        )));
    }

    let length = header.length as usize;
    if length > data.len() {
        return Err(DecodeError::format(format!(
            "File truncated: header declares {} bytes, have {}",
            length,
            data.len()
        )));
    }
    if length < GLB_HEADER_SIZE {
        return Err(DecodeError::format(format!(
            "Declared length {} is smaller than the GLB header",
            length
        )));
    }

    // Trailing bytes past the declared length are not part of the container.
    let mut reader = ByteReader::new(&data[..length]);
    reader.set_position(GLB_HEADER_SIZE)?;

    let mut json: Option<ChunkDescriptor> = None;
    let mut bin = Vec::new();
    let mut index = 0usize;

    while !reader.is_empty() {
        if reader.remaining_size() < GLB_CHUNK_HEADER_SIZE {
            return Err(DecodeError::format(format!(
                "Truncated header for chunk {}",
                index
            )));
        }
        let chunk_length = reader.decode_u32()? as usize;
        let chunk_type = ChunkType::from_tag(reader.decode_u32()?);
        let offset = reader.position();

        if chunk_length > reader.remaining_size() {
            return Err(DecodeError::format(format!(
                "Chunk {} extends past file end ({} bytes declared, {} remaining)",
                index,
                chunk_length,
                reader.remaining_size()
            )));
        }
        reader.decode_slice(chunk_length)?;
        reader.align_to(4);

        let descriptor = ChunkDescriptor {
            length: chunk_length,
            chunk_type,
            offset,
        };

        match chunk_type {
            ChunkType::Json => {
                if json.is_some() {
                    return Err(DecodeError::format("Duplicate JSON chunk"));
                }
                json = Some(descriptor);
            }
            _ if index == 0 => {
                return Err(DecodeError::format("First GLB chunk is not JSON"));
            }
            ChunkType::Bin => {
                if !bin.is_empty() {
                    log::debug!("Extra BIN chunk {} at offset {} ignored", index, offset);
                }
                bin.push(descriptor);
            }
            ChunkType::Unknown(tag) => {
                log::debug!("Skipping unknown GLB chunk type {:#010x}", tag);
            }
        }
        index += 1;
    }

    let json = json.ok_or_else(|| DecodeError::format("No JSON chunk"))?;

    Ok(GlbContainer {
        data,
        header,
        json,
        bin,
    })
}

impl<'a> GlbContainer<'a> {
    pub fn header(&self) -> GlbHeader {
        self.header
    }

    /// The complete input the container was parsed from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn json_chunk(&self) -> ChunkDescriptor {
        self.json
    }

    /// Raw JSON chunk payload.
    pub fn json_bytes(&self) -> &'a [u8] {
        self.json.payload(self.data)
    }

    /// JSON chunk payload as text, with trailing padding removed.
    pub fn json_text(&self) -> DecodeResult<&'a str> {
        let text = std::str::from_utf8(self.json_bytes())
            .map_err(|e| DecodeError::format(format!("JSON chunk is not UTF-8: {}", e)))?;
        Ok(text.trim_end_matches([' ', '\0']))
    }

    /// The BIN chunk that backs buffer 0, if any.
    pub fn bin_chunk(&self) -> Option<ChunkDescriptor> {
        self.bin.first().copied()
    }

    /// Every BIN chunk found, in file order.
    pub fn bin_chunks(&self) -> &[ChunkDescriptor] {
        &self.bin
    }

    pub fn bin_bytes(&self) -> Option<&'a [u8]> {
        self.bin_chunk().map(|chunk| chunk.payload(self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_chunk(out: &mut Vec<u8>, tag: u32, payload: &[u8]) {
        let padded = payload.len().div_ceil(4) * 4;
        out.extend_from_slice(&(padded as u32).to_le_bytes());
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(payload);
        out.resize(out.len() + padded - payload.len(), 0);
    }

    fn glb(chunks: &[(u32, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (tag, payload) in chunks {
            push_chunk(&mut body, *tag, payload);
        }
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn test_glb_magic() {
        // "glTF" in ASCII = 0x67, 0x6C, 0x54, 0x46
        assert_eq!(u32::from_le_bytes(*b"glTF"), GLB_MAGIC);
        assert_eq!(u32::from_le_bytes(*b"JSON"), GLB_CHUNK_JSON);
        assert_eq!(u32::from_le_bytes(*b"BIN\0"), GLB_CHUNK_BIN);
    }

    #[test]
    fn test_parse_json_and_bin() {
        let data = glb(&[(GLB_CHUNK_JSON, b"{\"asset\":{}}"), (GLB_CHUNK_BIN, &[1, 2, 3, 4])]);
        let container = parse_glb(&data).unwrap();
        assert_eq!(container.header().version, 2);
        assert_eq!(container.json_text().unwrap(), "{\"asset\":{}}");
        assert_eq!(container.bin_bytes(), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(container.bin_chunk().unwrap().offset, 12 + 8 + 12 + 8);
    }

    #[test]
    fn test_json_only() {
        let data = glb(&[(GLB_CHUNK_JSON, b"{}")]);
        let container = parse_glb(&data).unwrap();
        assert!(container.bin_chunk().is_none());
        assert_eq!(container.json_text().unwrap(), "{}");
    }

    #[test]
    fn test_bad_magic() {
        let mut data = glb(&[(GLB_CHUNK_JSON, b"{}")]);
        data[0] = b'x';
        assert!(matches!(parse_glb(&data), Err(DecodeError::Format(_))));
        assert!(!is_glb(&data));
    }

    #[test]
    fn test_bad_version() {
        let mut data = glb(&[(GLB_CHUNK_JSON, b"{}")]);
        data[4] = 1;
        let err = parse_glb(&data).unwrap_err();
        assert_eq!(err, DecodeError::format("Unsupported GLB version: 1"));
    }

    #[test]
    fn test_too_small() {
        assert!(parse_glb(&[0x67, 0x6C, 0x54]).is_err());
        assert!(!is_glb(&[0x67, 0x6C, 0x54]));
    }

    #[test]
    fn test_declared_length_exceeds_input() {
        let mut data = glb(&[(GLB_CHUNK_JSON, b"{}")]);
        let bogus = (data.len() as u32 + 4).to_le_bytes();
        data[8..12].copy_from_slice(&bogus);
        assert!(matches!(parse_glb(&data), Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_chunk_length_exceeds_remaining() {
        let mut data = glb(&[(GLB_CHUNK_JSON, b"{}  ")]);
        data[12..16].copy_from_slice(&64u32.to_le_bytes());
        let err = parse_glb(&data).unwrap_err();
        assert!(err.to_string().contains("extends past file end"));
    }

    #[test]
    fn test_duplicate_json_chunk() {
        let data = glb(&[(GLB_CHUNK_JSON, b"{}"), (GLB_CHUNK_JSON, b"{}")]);
        assert_eq!(
            parse_glb(&data).unwrap_err(),
            DecodeError::format("Duplicate JSON chunk")
        );
    }

    #[test]
    fn test_first_chunk_must_be_json() {
        let data = glb(&[(GLB_CHUNK_BIN, &[0; 4]), (GLB_CHUNK_JSON, b"{}")]);
        assert!(matches!(parse_glb(&data), Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_unknown_chunks_ignored() {
        let data = glb(&[
            (GLB_CHUNK_JSON, b"{}"),
            (0x5458_4554, b"ext!"),
            (GLB_CHUNK_BIN, &[9; 8]),
        ]);
        let container = parse_glb(&data).unwrap();
        assert_eq!(container.bin_bytes(), Some(&[9u8; 8][..]));
    }

    #[test]
    fn test_only_first_bin_chunk_backs_buffer_zero() {
        let data = glb(&[
            (GLB_CHUNK_JSON, b"{}"),
            (GLB_CHUNK_BIN, &[1; 4]),
            (GLB_CHUNK_BIN, &[2; 4]),
        ]);
        let container = parse_glb(&data).unwrap();
        assert_eq!(container.bin_chunks().len(), 2);
        assert_eq!(container.bin_bytes(), Some(&[1u8; 4][..]));
    }

    #[test]
    fn test_missing_json_chunk() {
        let data = glb(&[]);
        assert_eq!(parse_glb(&data).unwrap_err(), DecodeError::format("No JSON chunk"));
    }

    #[test]
    fn test_truncated_chunk_header() {
        let mut data = glb(&[(GLB_CHUNK_JSON, b"{}")]);
        data.extend_from_slice(&[0, 0, 0, 0]);
        let len = data.len() as u32;
        data[8..12].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(parse_glb(&data), Err(DecodeError::Format(_))));
    }
}
