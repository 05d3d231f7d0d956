//! On-disk unit store.
//!
//! One file per identifier, `<dir>/<identifier>.unit`: a 32-byte fixed header
//! followed by a bincode-encoded payload.
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RKUN"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Unit syntax version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload { identifier, source }
//! ```
//!
//! A file that fails any check is treated as absent and overwritten by a
//! fresh compile. Both versions must match exactly.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{EvaluationError, Evaluator, Slots};
use crate::Error;

const MAGIC: &[u8; 4] = b"RKUN";
const FORMAT_VERSION: u16 = 1;
const SYNTAX_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;
const EXTENSION: &str = "unit";

/// Reasons a stored file is not usable. Never surfaced; the file is recompiled.
#[derive(Debug, Error)]
enum Corrupt {
    #[error("invalid magic bytes")]
    BadMagic,

    #[error("version mismatch: file is v{format}/{syntax}")]
    Version { format: u16, syntax: u16 },

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("BLAKE3 checksum mismatch")]
    Checksum,

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("payload belongs to '{0}'")]
    Identifier(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredUnit {
    identifier: String,
    source: String,
}

/// Store that keeps units in a cache directory, so they outlive the process.
///
/// Within one process, calls for the same identifier are serialized. Across
/// processes two writers may both compile; each writes to a private temporary
/// file and renames it into place, so readers never see a partial unit.
#[derive(Debug)]
pub struct FileEvaluator {
    dir: PathBuf,
    slots: Slots,
}

impl FileEvaluator {
    /// Store units under `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            slots: Slots::default(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the unit for `identifier` lives.
    #[must_use]
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{identifier}.{EXTENSION}"))
    }

    /// Stored source text for `identifier`, if a valid file exists.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<String> {
        let bytes = fs::read(self.path_for(identifier)).ok()?;
        decode(&bytes, identifier).ok()
    }

    fn store(&self, identifier: &str, source: &str) -> Result<(), EvaluationError> {
        let bytes = encode(identifier, source)?;
        fs::create_dir_all(&self.dir).map_err(|source| EvaluationError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(identifier);
        let io_err = |source| EvaluationError::Io {
            path: path.clone(),
            source,
        };

        // One temporary file per writer, even within a process
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{identifier}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

impl Default for FileEvaluator {
    /// Store under `<system temp dir>/rulekit`.
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("rulekit"))
    }
}

impl Evaluator for FileEvaluator {
    fn evaluate(
        &self,
        identifier: &str,
        compile: &dyn Fn() -> Result<String, Error>,
    ) -> Result<String, Error> {
        let slot = self.slots.get(identifier);
        let mut stored = slot.lock();
        if let Some(source) = stored.as_ref() {
            return Ok(source.clone());
        }

        let path = self.path_for(identifier);
        match fs::read(&path) {
            Ok(bytes) => match decode(&bytes, identifier) {
                Ok(source) => {
                    tracing::debug!(identifier = %identifier, path = %path.display(), "unit found on disk");
                    *stored = Some(source.clone());
                    return Ok(source);
                }
                Err(reason) => {
                    tracing::debug!(identifier = %identifier, %reason, "discarding unusable cache file");
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::debug!(identifier = %identifier, error = %err, "cache file unreadable");
            }
        }

        tracing::debug!(identifier = %identifier, "unit not on disk, compiling");
        let source = match compile().and_then(|source| {
            self.store(identifier, &source)?;
            Ok(source)
        }) {
            Ok(source) => source,
            Err(err) => {
                drop(stored);
                self.slots.discard(identifier, &slot);
                return Err(err);
            }
        };
        *stored = Some(source.clone());
        Ok(source)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn encode(identifier: &str, source: &str) -> Result<Vec<u8>, EvaluationError> {
    let unit = StoredUnit {
        identifier: identifier.to_owned(),
        source: source.to_owned(),
    };
    let payload = bincode::serde::encode_to_vec(&unit, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

fn decode(bytes: &[u8], identifier: &str) -> Result<String, Corrupt> {
    let (payload_len, stored_hash) = read_header(bytes)?;

    let payload = bytes
        .get(HEADER_SIZE..)
        .filter(|rest| rest.len() == payload_len)
        .ok_or(Corrupt::Length {
            expected: payload_len,
            actual: bytes.len().saturating_sub(HEADER_SIZE),
        })?;

    if blake3::hash(payload).as_bytes()[..16] != stored_hash {
        return Err(Corrupt::Checksum);
    }

    let (unit, _): (StoredUnit, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    if unit.identifier != identifier {
        return Err(Corrupt::Identifier(unit.identifier));
    }
    Ok(unit.source)
}

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&SYNTAX_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // unit text never approaches 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
}

fn read_header(bytes: &[u8]) -> Result<(usize, [u8; 16]), Corrupt> {
    let Some(header) = bytes.get(..HEADER_SIZE) else {
        return Err(Corrupt::Length {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    };

    if &header[0..4] != MAGIC {
        return Err(Corrupt::BadMagic);
    }

    let format = u16::from_le_bytes([header[4], header[5]]);
    let syntax = u16::from_le_bytes([header[6], header[7]]);
    if format != FORMAT_VERSION || syntax != SYNTAX_VERSION {
        return Err(Corrupt::Version { format, syntax });
    }

    // header[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&header[16..32]);

    Ok((payload_len as usize, hash))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn encode_decode() {
        let bytes = encode("abc", "unit text").unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(decode(&bytes, "abc").unwrap(), "unit text");
    }

    #[test]
    fn header_layout() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload);
        assert_eq!(buf.len(), HEADER_SIZE);

        let (len, hash) = read_header(&buf).unwrap();
        assert_eq!(len, payload.len());
        assert_eq!(&hash, &blake3::hash(payload).as_bytes()[..16]);
    }

    #[test]
    fn rejects_damage() {
        let bytes = encode("abc", "unit text").unwrap();

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0xff;
        assert!(matches!(decode(&flipped, "abc"), Err(Corrupt::Checksum)));

        assert!(matches!(
            decode(&bytes[..bytes.len() - 1], "abc"),
            Err(Corrupt::Length { .. })
        ));
        assert!(matches!(decode(&bytes[..10], "abc"), Err(Corrupt::Length { .. })));

        let mut magic = bytes.clone();
        magic[..4].copy_from_slice(b"BAAD");
        assert!(matches!(decode(&magic, "abc"), Err(Corrupt::BadMagic)));

        let mut version = bytes.clone();
        version[4] = 9;
        assert!(matches!(decode(&version, "abc"), Err(Corrupt::Version { format: 9, .. })));

        assert!(matches!(decode(&bytes, "xyz"), Err(Corrupt::Identifier(id)) if id == "abc"));
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let calls = AtomicUsize::new(0);
        let compile = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("stored".to_owned())
        };

        let first = FileEvaluator::new(dir.path());
        assert_eq!(first.evaluate("abc", &compile).unwrap(), "stored");
        assert!(first.path_for("abc").exists());

        let second = FileEvaluator::new(dir.path());
        assert_eq!(second.evaluate("abc", &compile).unwrap(), "stored");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.get("abc").as_deref(), Some("stored"));
    }

    #[test]
    fn corrupt_file_is_recompiled() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = FileEvaluator::new(dir.path());
        fs::write(evaluator.path_for("abc"), b"garbage").unwrap();
        assert_eq!(evaluator.get("abc"), None);

        let source = evaluator
            .evaluate("abc", &|| Ok("fresh".to_owned()))
            .unwrap();
        assert_eq!(source, "fresh");
        assert_eq!(evaluator.get("abc").as_deref(), Some("fresh"));
    }

    #[test]
    fn failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = FileEvaluator::new(dir.path().join("nested"));
        let result = evaluator.evaluate("abc", &|| {
            Err(Error::Evaluation(EvaluationError::load("nope")))
        });
        assert!(result.is_err());
        assert!(!evaluator.path_for("abc").exists());
        assert_eq!(evaluator.slots.count(), 0);
    }

    #[test]
    fn default_dir_is_under_temp() {
        let evaluator = FileEvaluator::default();
        assert!(evaluator.dir().starts_with(std::env::temp_dir()));
        assert!(evaluator.dir().ends_with("rulekit"));
    }
}
