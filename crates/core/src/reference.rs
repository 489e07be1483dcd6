//! Reference transcript loading.
//!
//! Two formats are accepted, dispatched on file extension: plain `.txt`
//! (UTF-8, optional BOM, one line per entry) and `.vtt` captions (the text
//! payload of each cue, in cue order).

use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("unsupported reference format: {0}")]
    UnsupportedReferenceFormat(String),

    #[error("failed to read reference file: {0}")]
    Io(#[from] std::io::Error),
}

pub fn read_reference_file(path: &Path) -> Result<Vec<String>, ReferenceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("txt") => {
            let content = std::fs::read_to_string(path)?;
            let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
            Ok(content.lines().map(str::to_owned).collect())
        }
        Some("vtt") => {
            let content = std::fs::read_to_string(path)?;
            Ok(parse_vtt(&content))
        }
        _ => Err(ReferenceError::UnsupportedReferenceFormat(
            path.display().to_string(),
        )),
    }
}

// Cue-text extraction only: cue identifiers, timing lines, NOTE/STYLE/REGION
// blocks and the header are all skipped. Payload lines within one cue are
// joined with a newline.
fn parse_vtt(content: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut captions = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in content.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if let Some(text) = caption_text(&block) {
                captions.push(text);
            }
            block.clear();
        } else {
            block.push(line);
        }
    }
    captions
}

fn caption_text(block: &[&str]) -> Option<String> {
    let first = block.first()?;
    if first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION") {
        return None;
    }
    let timing = block.iter().position(|line| line.contains("-->"))?;
    Some(block[timing + 1..].join("\n"))
}
