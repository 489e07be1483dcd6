//! Run identity, comparison orchestration and CSV report batching.

use crate::diff::{self, DiffError};
use crate::manifest::FileMetadata;
use crate::reference::{self, ReferenceError};
use crate::score;
use crate::transcript::{self, ProviderKind, ProviderTranscript, TranscriptError};
use crate::util::csv;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fixed column order of every report CSV, provider-agnostic. A provider
/// may append one extra column (for example `options`).
pub const BASE_CSV_COLUMNS: [&str; 16] = [
    "run_id",
    "druid",
    "file",
    "language",
    "transcript_filename",
    "transcript_language",
    "runtime",
    "wer",
    "mer",
    "wil",
    "wip",
    "hits",
    "substitutions",
    "insertions",
    "deletions",
    "diff",
];

/// The reporting unit: one scored run of one provider configuration
/// against one media file. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonResult {
    pub run_id: String,
    pub druid: String,
    pub file: String,
    pub language: String,
    pub transcript_filename: String,
    pub transcript_language: String,
    pub runtime: f64,
    pub wer: f64,
    pub mer: f64,
    pub wil: f64,
    pub wip: f64,
    pub hits: usize,
    pub substitutions: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub diff: String,
    /// Value for the provider-specific extra CSV column, when any.
    pub options: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("failed to write report artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize raw transcript: {0}")]
    Json(#[from] serde_json::Error),
}

/// `{druid}-{provider}-{run_count:03}`, globally unique within one
/// manifest run as long as the caller increments `run_count`.
pub fn run_id(file: &FileMetadata, kind: ProviderKind) -> String {
    format!("{}-{}-{:03}", file.druid, kind.as_str(), file.run_count)
}

/// Accumulates comparison results for one report batch and owns the
/// output directory the diff and raw-transcript artifacts land in.
pub struct Reporter {
    output_dir: PathBuf,
    diff_base_url: String,
    results: Vec<ComparisonResult>,
}

impl Reporter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        diff_base_url: impl Into<String>,
    ) -> Result<Self, ReportError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            diff_base_url: diff_base_url.into(),
            results: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Score one raw provider transcript against the file's reference:
    /// parse, load the reference, align, render the HTML diff, and
    /// assemble the result record. Call at most once per
    /// `(file, provider)` pair and `run_count`.
    pub fn compare(
        &self,
        file: &FileMetadata,
        raw: &ProviderTranscript,
        kind: ProviderKind,
        runtime: f64,
        options: Option<String>,
    ) -> Result<ComparisonResult, ReportError> {
        let run_id = run_id(file, kind);

        let parsed = transcript::parse(raw, kind)?;
        let reference = reference::read_reference_file(Path::new(&file.transcript_filename))?;
        let metrics = score::score_lines(&reference, &parsed.lines);

        let diff_file = format!("{run_id}.html");
        let diff_path = self.output_dir.join(&diff_file);
        diff::render(&file.druid, &reference, &parsed.lines, &diff_path)?;
        let diff_url = format!(
            "{}/{}/{}",
            self.diff_base_url.trim_end_matches('/'),
            basename(&self.output_dir.display().to_string()),
            diff_file
        );

        Ok(ComparisonResult {
            run_id,
            druid: file.druid.clone(),
            file: basename(&file.media_filename),
            language: parsed.language,
            transcript_filename: basename(&file.transcript_filename),
            transcript_language: file.transcript_language.clone(),
            runtime,
            wer: metrics.wer,
            mer: metrics.mer,
            wil: metrics.wil,
            wip: metrics.wip,
            hits: metrics.hits,
            substitutions: metrics.substitutions,
            insertions: metrics.insertions,
            deletions: metrics.deletions,
            diff: diff_url,
            options,
        })
    }

    /// Write the raw provider result verbatim as `{run_id}.json`.
    /// Non-ASCII characters are preserved un-escaped.
    pub fn write_raw_transcript(
        &self,
        run_id: &str,
        raw: &ProviderTranscript,
    ) -> Result<(), ReportError> {
        let path = self.output_dir.join(format!("{run_id}.json"));
        std::fs::write(path, serde_json::to_string(raw)?)?;
        Ok(())
    }

    pub fn record(&mut self, result: ComparisonResult) {
        info!(run_id = %result.run_id, wer = result.wer, "recorded comparison result");
        self.results.push(result);
    }

    pub fn results(&self) -> &[ComparisonResult] {
        &self.results
    }

    /// Flush accumulated results to a CSV with the fixed column order,
    /// plus `extra_column` when the provider carries one.
    pub fn write_report(
        &self,
        csv_path: &Path,
        extra_column: Option<&str>,
    ) -> Result<(), ReportError> {
        let mut out = String::new();

        let mut header: Vec<&str> = BASE_CSV_COLUMNS.to_vec();
        if let Some(extra) = extra_column {
            header.push(extra);
        }
        csv::write_row(&mut out, &header);

        for result in &self.results {
            let mut fields = vec![
                result.run_id.clone(),
                result.druid.clone(),
                result.file.clone(),
                result.language.clone(),
                result.transcript_filename.clone(),
                result.transcript_language.clone(),
                result.runtime.to_string(),
                result.wer.to_string(),
                result.mer.to_string(),
                result.wil.to_string(),
                result.wip.to_string(),
                result.hits.to_string(),
                result.substitutions.to_string(),
                result.insertions.to_string(),
                result.deletions.to_string(),
                result.diff.clone(),
            ];
            if extra_column.is_some() {
                fields.push(result.options.clone().unwrap_or_default());
            }
            csv::write_row(&mut out, &fields);
        }

        std::fs::write(csv_path, out)?;
        Ok(())
    }
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_owned())
}
