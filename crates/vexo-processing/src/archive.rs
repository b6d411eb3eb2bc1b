//! Zip archive ingestion.

use std::io::{Cursor, Read};

use thiserror::Error;
use zip::ZipArchive;

use crate::batch::BatchItem;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Not a valid zip archive: {0}")]
    InvalidArchive(String),

    #[error("Failed to read archive member {name}: {message}")]
    MemberRead { name: String, message: String },
}

/// Expand a zip archive into batch items, one per file member.
///
/// Directory entries are skipped. Members inside subdirectories are skipped
/// unless `recurse` is set; the member's full path stays the item label so
/// results correlate back to the archive.
pub fn extract_zip_images(data: &[u8], recurse: bool) -> Result<Vec<BatchItem>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|err| ArchiveError::InvalidArchive(err.to_string()))?;

    let mut items = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|err| ArchiveError::InvalidArchive(err.to_string()))?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        if !recurse && name.contains('/') {
            tracing::debug!(member = %name, "Skipping nested archive member");
            continue;
        }

        let mut bytes = Vec::with_capacity(member.size() as usize);
        member
            .read_to_end(&mut bytes)
            .map_err(|err| ArchiveError::MemberRead {
                name: name.clone(),
                message: err.to_string(),
            })?;
        items.push(BatchItem::bytes(name, bytes));
    }

    tracing::debug!(members = items.len(), recurse, "Expanded zip archive");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ItemPayload;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, FileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_top_level_members_in_order() {
        let data = build_zip(&[("a.png", b"aaa"), ("b.jpg", b"bbb")]);
        let items = extract_zip_images(&data, false).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "a.png");
        assert_eq!(items[1].label, "b.jpg");
        assert!(matches!(&items[0].payload, ItemPayload::Bytes(b) if b == b"aaa"));
    }

    #[test]
    fn test_nested_members_skipped_by_default() {
        let data = build_zip(&[("top.png", b"t"), ("nested/deep.png", b"d")]);
        let items = extract_zip_images(&data, false).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "top.png");
    }

    #[test]
    fn test_recurse_includes_nested_members_with_full_path() {
        let data = build_zip(&[("top.png", b"t"), ("nested/deep.png", b"d")]);
        let items = extract_zip_images(&data, true).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].label, "nested/deep.png");
    }

    #[test]
    fn test_invalid_archive_is_an_error() {
        let err = extract_zip_images(b"not a zip", false).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidArchive(_)));
    }
}
