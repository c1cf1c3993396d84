//! Router artifact files.
//!
//! An artifact stores the fitted model, the rule sources and the raw training
//! corpus as one unit. Layout (all integers little-endian):
//!
//! ```text
//! magic    b"IRTR"
//! version  u32
//! checksum u32   crc32 of the payload
//! length   u64   payload length in bytes
//! payload  bincode { info, model, rules, corpus }
//! ```
//!
//! Writes go to a sibling temporary file that is renamed over the target, so
//! a reader never sees a partially written artifact.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::router::model::{FittedModel, TrainingExample};
use crate::router::rules::RuleSource;

/// File magic of router artifacts.
pub const MAGIC: &[u8; 4] = b"IRTR";

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Summary stored at the head of every artifact payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub created_at: DateTime<Utc>,
    /// Crate version that wrote the artifact.
    pub crate_version: String,
    pub classes: Vec<String>,
    pub examples: usize,
    pub vocabulary_size: usize,
    pub rules: usize,
}

/// A decoded artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub info: ArtifactInfo,
    pub model: FittedModel,
    pub rules: Vec<RuleSource>,
    pub corpus: Vec<TrainingExample>,
}

/// Borrowed view used for writing; encodes exactly like [`Artifact`].
#[derive(Debug, Serialize)]
pub struct ArtifactRef<'a> {
    pub info: ArtifactInfo,
    pub model: &'a FittedModel,
    pub rules: &'a [RuleSource],
    pub corpus: &'a [TrainingExample],
}

impl<'a> ArtifactRef<'a> {
    pub fn new(
        model: &'a FittedModel,
        rules: &'a [RuleSource],
        corpus: &'a [TrainingExample],
    ) -> Self {
        let info = ArtifactInfo {
            created_at: Utc::now(),
            crate_version: crate::VERSION.to_string(),
            classes: model.classes().to_vec(),
            examples: corpus.len(),
            vocabulary_size: model.vocabulary_size(),
            rules: rules.len(),
        };
        Self {
            info,
            model,
            rules,
            corpus,
        }
    }
}

/// Write an artifact atomically to `path`.
pub fn write_artifact<P: AsRef<Path>>(path: P, artifact: &ArtifactRef<'_>) -> Result<()> {
    let path = path.as_ref();
    let payload = bincode::serialize(artifact)?;

    let tmp_path = temp_path(path);
    let result = write_file(&tmp_path, &payload).and_then(|_| {
        fs::rename(&tmp_path, path)?;
        Ok(())
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_file(path: &Path, payload: &[u8]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u32::<LittleEndian>(crc32fast::hash(payload))?;
    writer.write_u64::<LittleEndian>(payload.len() as u64)?;
    writer.write_all(payload)?;
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| RouterError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "artifact".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read and verify an artifact.
pub fn read_artifact<P: AsRef<Path>>(path: P) -> Result<Artifact> {
    let payload = read_payload(path.as_ref())?;
    Ok(bincode::deserialize(&payload)?)
}

/// Read only the summary of an artifact. The checksum is still verified.
pub fn read_info<P: AsRef<Path>>(path: P) -> Result<ArtifactInfo> {
    let payload = read_payload(path.as_ref())?;
    // The info is the first payload field, so a prefix decode suffices.
    Ok(bincode::deserialize(&payload)?)
}

fn read_payload(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    decode_frame(&bytes)
}

fn decode_frame(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < HEADER_LEN {
        return Err(RouterError::corrupt(format!(
            "truncated header: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[..4] != MAGIC {
        return Err(RouterError::corrupt("bad magic, not a router artifact"));
    }

    let mut header = Cursor::new(&bytes[4..HEADER_LEN]);
    let version = header.read_u32::<LittleEndian>()?;
    let checksum = header.read_u32::<LittleEndian>()?;
    let length = header.read_u64::<LittleEndian>()?;

    if version != FORMAT_VERSION {
        return Err(RouterError::corrupt(format!(
            "unsupported format version {version}"
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    if payload.len() as u64 != length {
        return Err(RouterError::corrupt(format!(
            "truncated payload: expected {length} bytes, found {}",
            payload.len()
        )));
    }
    if crc32fast::hash(payload) != checksum {
        return Err(RouterError::corrupt("checksum mismatch"));
    }

    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::ml::calibration::ClassifierConfig;
    use crate::ml::tfidf::VectorizerConfig;

    fn fixture() -> (FittedModel, Vec<RuleSource>, Vec<TrainingExample>) {
        let corpus = vec![
            TrainingExample::new("hola buenas", "saludo"),
            TrainingExample::new("buenos dias", "saludo"),
            TrainingExample::new("cuanto cuesta", "precio"),
            TrainingExample::new("que precio tiene", "precio"),
        ];
        let (model, _) =
            FittedModel::fit(&corpus, &VectorizerConfig::default(), &ClassifierConfig::default())
                .unwrap();
        let rules = vec![RuleSource::new(r"\bhola\b", "saludo")];
        (model, rules, corpus)
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("router.bin");
        let (model, rules, corpus) = fixture();

        write_artifact(&path, &ArtifactRef::new(&model, &rules, &corpus)).unwrap();
        assert!(!temp_path(&path).exists());

        let artifact = read_artifact(&path).unwrap();
        assert_eq!(artifact.rules, rules);
        assert_eq!(artifact.corpus, corpus);
        assert_eq!(artifact.model.classes(), model.classes());
        assert_eq!(artifact.info.examples, 4);
        assert_eq!(artifact.info.rules, 1);

        let info = read_info(&path).unwrap();
        assert_eq!(info, artifact.info);
        assert_eq!(info.vocabulary_size, model.vocabulary_size());
    }

    #[test]
    fn test_corrupt_files_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("router.bin");
        let (model, rules, corpus) = fixture();
        write_artifact(&path, &ArtifactRef::new(&model, &rules, &corpus)).unwrap();
        let good = fs::read(&path).unwrap();

        let mut flipped = good.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0xff;
        assert!(matches!(
            decode_frame(&flipped),
            Err(RouterError::CorruptArtifact(msg)) if msg.contains("checksum")
        ));

        assert!(matches!(
            decode_frame(&good[..good.len() - 3]),
            Err(RouterError::CorruptArtifact(msg)) if msg.contains("truncated")
        ));

        let mut bad_magic = good.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            decode_frame(&bad_magic),
            Err(RouterError::CorruptArtifact(msg)) if msg.contains("magic")
        ));

        let mut bad_version = good;
        bad_version[4] = 9;
        assert!(matches!(
            decode_frame(&bad_version),
            Err(RouterError::CorruptArtifact(msg)) if msg.contains("version")
        ));

        assert!(decode_frame(b"IRT").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_artifact(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, RouterError::Io(_)));
    }
}
