//! Model file format for the reference engine.
//!
//! Layout: 8-byte magic, little-endian `u32` version, then a bincode-encoded
//! [`ModelFile`]. The header is checked before decoding so a foreign or
//! truncated file is rejected with an error instead of being misread.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::args::{Link, Loss};
use crate::error::{NativeError, NativeResult};

const HEADER_MAGIC: &[u8; 8] = b"VWBREF\0\0";
const HEADER_VERSION: u32 = 1;
const HEADER_SIZE: usize = 12;

/// Persisted state of one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    /// Link given when the model was trained, if any. Stored options
    /// conflict with the same option given again at load time.
    pub link: Option<Link>,
    pub loss: Loss,
    pub learning_rate: f32,
    pub examples_seen: u64,
    pub weights: BTreeMap<String, f32>,
}

pub fn save(path: &Path, model: &ModelFile) -> NativeResult<()> {
    let payload = bincode::serialize(model)
        .map_err(|e| NativeError::new(format!("failed to serialize model: {e}")))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(HEADER_MAGIC);
    bytes.extend_from_slice(&HEADER_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);

    fs::write(path, bytes)
        .map_err(|e| NativeError::new(format!("can't open {} for writing: {e}", path.display())))
}

pub fn load(path: &Path) -> NativeResult<ModelFile> {
    let bytes = fs::read(path)
        .map_err(|e| NativeError::new(format!("can't open {}: {e}", path.display())))?;

    if bytes.len() < HEADER_SIZE || &bytes[..8] != HEADER_MAGIC {
        return Err(NativeError::new(format!(
            "bad model format in {}: missing header",
            path.display()
        )));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[8..HEADER_SIZE]);
    let version = u32::from_le_bytes(version);
    if version != HEADER_VERSION {
        return Err(NativeError::new(format!(
            "bad model format in {}: version {version} != expected {HEADER_VERSION}",
            path.display()
        )));
    }

    bincode::deserialize(&bytes[HEADER_SIZE..]).map_err(|e| {
        NativeError::new(format!("bad model format in {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> ModelFile {
        let mut weights = BTreeMap::new();
        weights.insert("^constant".to_string(), 0.125);
        weights.insert("f^height".to_string(), -0.5);
        ModelFile {
            link: Some(Link::Logistic),
            loss: Loss::Logistic,
            learning_rate: 0.5,
            examples_seen: 200,
            weights,
        }
    }

    #[test]
    fn saved_model_loads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("m.model");
        save(&path, &sample_model()).unwrap();
        assert_eq!(load(&path).unwrap(), sample_model());
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.model");
        fs::write(&path, b"this is not a model").unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.message().contains("missing header"));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cut.model");
        save(&path, &sample_model()).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();
        assert!(load(&path).unwrap_err().message().starts_with("bad model format"));
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = load(Path::new("/nonexistent/dir/x.model")).unwrap_err();
        assert!(err.message().starts_with("can't open"));
    }
}
