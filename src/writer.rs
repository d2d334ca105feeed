//! Atomic persistence of the content artifact.
//!
//! The artifact is written to a temporary file in the destination's
//! directory, synced, then renamed over the destination. A reader of the
//! destination sees either the previous complete file or the new complete
//! file. If anything fails, the temporary file is removed when the
//! [`NamedTempFile`] guard drops and the previous artifact is left alone.

use crate::document::ContentDocument;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to write artifact '{}': {kind}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub kind: WriteErrorKind,
}

#[derive(Debug, Error)]
pub enum WriteErrorKind {
    #[error("could not serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not create directory: {0}")]
    CreateDir(std::io::Error),
    #[error("could not create temporary file: {0}")]
    TempFile(std::io::Error),
    #[error("could not write temporary file (disk may be full): {0}")]
    Write(std::io::Error),
    #[error("could not replace destination: {0}")]
    Persist(std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// The destination was replaced with new content.
    Written,
    /// The destination already held these exact bytes; nothing was written.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub status: WriteStatus,
    pub bytes: usize,
    /// Hex SHA-256 of the artifact bytes.
    pub digest: String,
}

/// Serializes `document` and atomically replaces `destination` with it.
///
/// # Errors
///
/// Returns [`WriteError`] naming `destination` if any step fails. The
/// previous artifact, if there is one, is left as it was.
pub fn write_artifact(
    document: &ContentDocument,
    destination: &Path,
) -> Result<WriteOutcome, WriteError> {
    replace_artifact(document, destination, |file, bytes| {
        file.write_all(bytes)?;
        file.flush()?;
        file.as_file().sync_all()
    })
}

/// [`write_artifact`] with the temp-file fill step supplied by the caller.
fn replace_artifact<F>(
    document: &ContentDocument,
    destination: &Path,
    fill: F,
) -> Result<WriteOutcome, WriteError>
where
    F: FnOnce(&mut NamedTempFile, &[u8]) -> std::io::Result<()>,
{
    let fail = |kind: WriteErrorKind| WriteError {
        path: destination.to_path_buf(),
        kind,
    };

    let bytes = document
        .to_artifact_bytes()
        .map_err(|e| fail(WriteErrorKind::Serialize(e)))?;
    let digest = format!("{:x}", Sha256::digest(&bytes));
    let outcome = |status| WriteOutcome {
        path: destination.to_path_buf(),
        status,
        bytes: bytes.len(),
        digest: digest.clone(),
    };

    match std::fs::read(destination) {
        Ok(existing) if existing == bytes => {
            tracing::info!(path = %destination.display(), "Artifact unchanged, skipping write");
            return Ok(outcome(WriteStatus::Unchanged));
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                path = %destination.display(),
                error = %e,
                "Could not read previous artifact for comparison"
            );
        }
    }

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| fail(WriteErrorKind::CreateDir(e)))?;

    // Same directory as the destination so the rename never crosses filesystems.
    let mut temp_file =
        NamedTempFile::new_in(parent).map_err(|e| fail(WriteErrorKind::TempFile(e)))?;
    fill(&mut temp_file, &bytes).map_err(|e| fail(WriteErrorKind::Write(e)))?;

    temp_file
        .persist(destination)
        .map_err(|e| fail(WriteErrorKind::Persist(e.error)))?;

    tracing::info!(
        path = %destination.display(),
        bytes = bytes.len(),
        digest = %digest,
        "Wrote artifact"
    );
    Ok(outcome(WriteStatus::Written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContentDocument, FeedOutputs};
    use crate::schema::KeyValueRecord;
    use crate::util::ImageLinks;

    fn document(title: &str) -> ContentDocument {
        ContentDocument::assemble(
            FeedOutputs {
                general: KeyValueRecord::default(),
                hero: [("title".to_string(), title.to_string())]
                    .into_iter()
                    .collect(),
                about: KeyValueRecord::default(),
                core_values: Vec::new(),
                services: Vec::new(),
                contact: KeyValueRecord::default(),
            },
            ImageLinks::Passthrough,
        )
    }

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_writes_new_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("content").join("site.json");

        let outcome = write_artifact(&document("Hello"), &dest).unwrap();
        assert_eq!(outcome.status, WriteStatus::Written);
        assert_eq!(outcome.digest.len(), 64);

        let written = std::fs::read(&dest).unwrap();
        assert_eq!(written.len(), outcome.bytes);
        let value: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(value["hero"]["title"], "Hello");
        // No temporary files left next to the artifact
        assert_eq!(dir_entries(dest.parent().unwrap()), 1);
    }

    #[test]
    fn test_identical_content_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("site.json");

        let first = write_artifact(&document("Hello"), &dest).unwrap();
        let second = write_artifact(&document("Hello"), &dest).unwrap();
        assert_eq!(second.status, WriteStatus::Unchanged);
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("site.json");

        write_artifact(&document("Old"), &dest).unwrap();
        let outcome = write_artifact(&document("New"), &dest).unwrap();
        assert_eq!(outcome.status, WriteStatus::Written);

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&dest).unwrap()).unwrap();
        assert_eq!(value["hero"]["title"], "New");
        assert_eq!(dir_entries(dir.path()), 1);
    }

    #[test]
    fn test_failed_write_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("site.json");
        write_artifact(&document("Old"), &dest).unwrap();
        let before = std::fs::read(&dest).unwrap();

        // Half the bytes land in the temp file, then the disk fills up
        let err = replace_artifact(&document("New"), &dest, |file, bytes| {
            file.write_all(&bytes[..bytes.len() / 2])?;
            Err(std::io::Error::other("no space left on device"))
        })
        .unwrap_err();

        assert!(matches!(err.kind, WriteErrorKind::Write(_)));
        assert!(err.to_string().contains("site.json"));
        assert_eq!(std::fs::read(&dest).unwrap(), before);
        assert_eq!(dir_entries(dir.path()), 1);
    }

    #[test]
    fn test_failure_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // Destination is an existing directory, so the rename must fail
        let dest = dir.path().join("site.json");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("keep.txt"), "keep").unwrap();

        let err = write_artifact(&document("Hello"), &dest).unwrap_err();
        assert!(matches!(err.kind, WriteErrorKind::Persist(_)));
        assert_eq!(err.path, dest);
        assert_eq!(dir_entries(dir.path()), 1);
        assert_eq!(std::fs::read_to_string(dest.join("keep.txt")).unwrap(), "keep");
    }
}
