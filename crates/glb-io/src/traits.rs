//! Buffer loading.
//!
//! A glTF buffer either lives in the GLB BIN chunk or is referenced by URI.
//! [`BufferLoader`] resolves a URI to its bytes:
//!
//! ```ignore
//! use glb_io::{FsLoader, GltfReader};
//!
//! let json = std::fs::read("scene/model.gltf")?;
//! let reader = GltfReader::from_gltf(&json, &FsLoader::new("scene"))?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;

use crate::gltf_reader::{GltfError, Result};

/// Resolves buffer URIs to bytes.
pub trait BufferLoader {
    fn load(&self, uri: &str) -> Result<Vec<u8>>;
}

/// Loads `data:` URIs only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriLoader;

impl BufferLoader for DataUriLoader {
    fn load(&self, uri: &str) -> Result<Vec<u8>> {
        if !is_data_uri(uri) {
            return Err(GltfError::BufferLoad {
                uri: uri.to_string(),
                reason: "external URIs need a filesystem loader".into(),
            });
        }
        decode_data_uri(uri)
    }
}

/// Loads `data:` URIs and files relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl BufferLoader for FsLoader {
    fn load(&self, uri: &str) -> Result<Vec<u8>> {
        if is_data_uri(uri) {
            return decode_data_uri(uri);
        }
        let relative = String::from_utf8_lossy(&percent_decode(uri)).into_owned();
        let path = self.base_dir.join(relative);
        log::debug!("Loading buffer {:?} from {}", uri, path.display());
        fs::read(&path).map_err(|e| GltfError::BufferLoad {
            uri: uri.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

pub(crate) fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    // Format: data:[<mediatype>][;base64],<data>
    let comma_pos = uri.find(',').ok_or_else(|| GltfError::BufferLoad {
        uri: truncate_uri(uri),
        reason: "data URI has no comma".into(),
    })?;

    let header = &uri[5..comma_pos]; // Skip "data:"
    let data = &uri[comma_pos + 1..];

    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| GltfError::BufferLoad {
                uri: truncate_uri(uri),
                reason: format!("base64 decode error: {}", e),
            })
    } else {
        Ok(percent_decode(data))
    }
}

/// Shortens a URI for error messages.
fn truncate_uri(uri: &str) -> String {
    const MAX: usize = 48;
    match uri.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &uri[..end]),
        None => uri.to_string(),
    }
}

fn percent_decode(input: &str) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                output.push((h << 4) | l);
                i += 3;
                continue;
            }
        }
        output.push(bytes[i]);
        i += 1;
    }

    output
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
