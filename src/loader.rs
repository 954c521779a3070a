//! Directory document loading.
//!
//! Parses every supported file under a directory into a [`Document`].
//! Ingestion writes uploads into a transient directory and points this
//! loader at it; the loader itself is storage-agnostic.
//!
//! Supported: `.pdf` (extracted), `.txt` / `.md` (read as-is). Other files
//! are skipped.

use std::path::Path;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::ChatError;
use crate::extract;
use crate::models::Document;

/// Load all parseable documents under `dir`. Files that parse to empty text
/// are dropped.
pub fn load_from_directory(dir: &Path) -> Result<Vec<Document>, ChatError> {
    if !dir.is_dir() {
        return Err(ChatError::Internal(format!(
            "document directory does not exist: {}",
            dir.display()
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry =
            entry.map_err(|e| ChatError::Internal(format!("failed to scan directory: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let text = match ext.as_str() {
            "pdf" => {
                let bytes = std::fs::read(path).map_err(|e| {
                    ChatError::Internal(format!("failed to read {}: {}", path.display(), e))
                })?;
                extract::pdf_text(&bytes)?
            }
            "txt" | "md" => std::fs::read_to_string(path).map_err(|e| {
                ChatError::Internal(format!("failed to read {}: {}", path.display(), e))
            })?,
            _ => continue,
        };

        if text.trim().is_empty() {
            continue;
        }

        documents.push(Document {
            id: Uuid::new_v4().to_string(),
            path: path.to_path_buf(),
            text,
        });
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_text_and_markdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "plain text body").unwrap();
        std::fs::write(dir.path().join("b.md"), "# heading\n\nbody").unwrap();
        std::fs::write(dir.path().join("c.bin"), [0u8, 1, 2]).unwrap();

        let mut docs = load_from_directory(dir.path()).unwrap();
        docs.sort_by_key(|d| d.path.clone());
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "plain text body");
        assert!(docs[1].text.contains("heading"));
    }

    #[test]
    fn skips_empty_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("empty.txt"), "   \n").unwrap();
        let docs = load_from_directory(dir.path()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_from_directory(Path::new("/nonexistent/docq")).unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }
}
