//! Manifest loading: the CSV listing of media files and their reference
//! transcripts.

use crate::util::csv;
use std::path::Path;

/// One manifest row. `run_count` starts at zero and is assigned exactly
/// once by the batch runner before scoring; it only feeds run-id
/// formatting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub druid: String,
    pub media_filename: String,
    pub media_language: String,
    pub transcript_filename: String,
    pub transcript_language: String,
    pub run_count: u32,
}

pub const MANIFEST_COLUMNS: [&str; 5] = [
    "druid",
    "media_filename",
    "media_language",
    "transcript_filename",
    "transcript_language",
];

#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest is empty")]
    Empty,

    #[error("manifest is missing column {0}")]
    MissingColumn(&'static str),

    #[error("manifest record {0} has too few fields")]
    ShortRecord(usize),
}

pub fn load_manifest(path: &Path) -> Result<Vec<FileMetadata>, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    parse_manifest(&content)
}

pub fn parse_manifest(content: &str) -> Result<Vec<FileMetadata>, ManifestError> {
    let records = csv::parse_records(content);
    let mut records = records
        .into_iter()
        .filter(|r| !(r.len() == 1 && r[0].is_empty()));

    let header = records.next().ok_or(ManifestError::Empty)?;
    let mut indexes = [0usize; MANIFEST_COLUMNS.len()];
    for (slot, column) in indexes.iter_mut().zip(MANIFEST_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h == column)
            .ok_or(ManifestError::MissingColumn(column))?;
    }

    let mut rows = Vec::new();
    for (number, record) in records.enumerate() {
        let field = |idx: usize| -> Result<String, ManifestError> {
            record
                .get(idx)
                .cloned()
                .ok_or(ManifestError::ShortRecord(number + 2))
        };
        rows.push(FileMetadata {
            druid: field(indexes[0])?,
            media_filename: field(indexes[1])?,
            media_language: field(indexes[2])?,
            transcript_filename: field(indexes[3])?,
            transcript_language: field(indexes[4])?,
            run_count: 0,
        });
    }
    Ok(rows)
}
