//! Batch execution: every manifest row against every parameter
//! combination of one provider, feeding the reporter.

use crate::manifest::FileMetadata;
use crate::provider::TranscriptionProvider;
use crate::report::{self, ComparisonResult, ReportError, Reporter};
use crate::transcript::ProviderKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// What happened to one `(file, combination)` attempt. Failures are
/// reported here and in the log; they never produce a CSV row.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(ComparisonResult),
    Skipped {
        druid: String,
        file: String,
    },
    Failed {
        run_id: String,
        druid: String,
        file: String,
        provider: ProviderKind,
        error: String,
    },
}

pub fn report_filename(kind: ProviderKind) -> String {
    format!("report-{}.csv", kind.as_str())
}

/// Run the provider over every supported manifest row and record the
/// scored results. Run counts follow the recorded results: the next
/// attempt is numbered one past the number of successes so far.
pub async fn run_batch(
    provider: &dyn TranscriptionProvider,
    files: &[FileMetadata],
    reporter: &mut Reporter,
) -> Vec<RunOutcome> {
    let kind = provider.kind();
    let combinations = provider.combinations();
    let mut outcomes = Vec::new();

    for file in files {
        if !provider.supports(file) {
            info!(druid = %file.druid, media = %file.media_filename, "skipping unsupported row");
            outcomes.push(RunOutcome::Skipped {
                druid: file.druid.clone(),
                file: file.media_filename.clone(),
            });
            continue;
        }

        for (combination, options) in combinations.iter().enumerate() {
            let mut row = file.clone();
            row.run_count = reporter.results().len() as u32 + 1;
            let run_id = report::run_id(&row, kind);
            info!(run_id = %run_id, options = options.as_deref().unwrap_or("-"), "starting run");

            let started = Instant::now();
            match run_one(provider, &row, combination, options.clone(), started, reporter).await {
                Ok(result) => {
                    reporter.record(result.clone());
                    outcomes.push(RunOutcome::Completed(result));
                }
                Err(message) => {
                    error!(run_id = %run_id, error = %message, "run failed");
                    outcomes.push(RunOutcome::Failed {
                        run_id,
                        druid: row.druid.clone(),
                        file: row.media_filename.clone(),
                        provider: kind,
                        error: message,
                    });
                }
            }
        }
    }

    outcomes
}

async fn run_one(
    provider: &dyn TranscriptionProvider,
    row: &FileMetadata,
    combination: usize,
    options: Option<String>,
    started: Instant,
    reporter: &Reporter,
) -> Result<ComparisonResult, String> {
    let raw = provider
        .transcribe(row, combination)
        .await
        .map_err(|e| e.to_string())?;
    let runtime = started.elapsed().as_secs_f64();

    let run_id = report::run_id(row, provider.kind());
    reporter
        .write_raw_transcript(&run_id, &raw)
        .map_err(|e| e.to_string())?;
    reporter
        .compare(row, &raw, provider.kind(), runtime, options)
        .map_err(|e| e.to_string())
}

/// Run the batch and flush the report CSV into `report_dir`, named
/// `report-{provider}.csv`. The `options` column is present only when
/// the provider labels its combinations.
pub async fn run_and_report(
    provider: &dyn TranscriptionProvider,
    files: &[FileMetadata],
    reporter: &mut Reporter,
    report_dir: &Path,
) -> Result<(Vec<RunOutcome>, PathBuf), ReportError> {
    let outcomes = run_batch(provider, files, reporter).await;

    let extra_column = provider
        .combinations()
        .iter()
        .any(Option::is_some)
        .then_some("options");
    let csv_path = report_dir.join(report_filename(provider.kind()));
    reporter.write_report(&csv_path, extra_column)?;
    info!(report = %csv_path.display(), results = reporter.results().len(), "report written");

    Ok((outcomes, csv_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::transcript::ProviderTranscript;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    struct StubProvider {
        kind: ProviderKind,
        labels: Vec<Option<String>>,
        fail_on: Option<usize>,
        supported: bool,
    }

    impl StubProvider {
        fn whisper_like() -> Self {
            Self {
                kind: ProviderKind::Whisper,
                labels: vec![Some("beam_size=5".to_owned()), Some("beam_size=10".to_owned())],
                fail_on: None,
                supported: true,
            }
        }
    }

    impl TranscriptionProvider for StubProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn combinations(&self) -> Vec<Option<String>> {
            self.labels.clone()
        }

        fn supports(&self, _file: &FileMetadata) -> bool {
            self.supported
        }

        fn transcribe<'a>(
            &'a self,
            _file: &'a FileMetadata,
            combination: usize,
        ) -> BoxFuture<'a, Result<ProviderTranscript, ProviderError>> {
            async move {
                if self.fail_on == Some(combination) {
                    return Err(ProviderError::Engine("model exploded".to_owned()));
                }
                let raw: ProviderTranscript = serde_json::from_str(
                    r#"{"segments": [{"text": " This is a test."}], "language": "en"}"#,
                )
                .map_err(|e| ProviderError::InvalidPayload(e.to_string()))?;
                Ok(raw)
            }
            .boxed()
        }
    }

    fn fixture(dir: &Path) -> FileMetadata {
        let transcript = dir.join("bb158br2509.txt");
        std::fs::write(&transcript, "This is a test.\n").unwrap();
        FileMetadata {
            druid: "bb158br2509".to_owned(),
            media_filename: "media/bb158br2509_sl.m4a".to_owned(),
            media_language: "en".to_owned(),
            transcript_filename: transcript.display().to_string(),
            transcript_language: "en".to_owned(),
            run_count: 0,
        }
    }

    #[tokio::test]
    async fn counts_runs_across_combinations() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter =
            Reporter::new(dir.path().join("out"), "https://example.org/reports").unwrap();
        let provider = StubProvider::whisper_like();
        let files = vec![fixture(dir.path())];

        let outcomes = run_batch(&provider, &files, &mut reporter).await;

        assert_eq!(outcomes.len(), 2);
        let run_ids: Vec<&str> = reporter.results().iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(run_ids, vec!["bb158br2509-whisper-001", "bb158br2509-whisper-002"]);
        assert_eq!(reporter.results()[0].options.as_deref(), Some("beam_size=5"));
        assert_eq!(reporter.results()[0].wer, 0.0);
    }

    #[tokio::test]
    async fn failures_produce_no_result_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter =
            Reporter::new(dir.path().join("out"), "https://example.org/reports").unwrap();
        let provider = StubProvider {
            fail_on: Some(0),
            ..StubProvider::whisper_like()
        };
        let files = vec![fixture(dir.path())];

        let outcomes = run_batch(&provider, &files, &mut reporter).await;

        assert!(matches!(
            &outcomes[0],
            RunOutcome::Failed { error, .. } if error.contains("model exploded")
        ));
        // The failed attempt does not consume a run number.
        assert_eq!(reporter.results().len(), 1);
        assert_eq!(reporter.results()[0].run_id, "bb158br2509-whisper-001");
    }

    #[tokio::test]
    async fn unsupported_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter =
            Reporter::new(dir.path().join("out"), "https://example.org/reports").unwrap();
        let provider = StubProvider {
            supported: false,
            ..StubProvider::whisper_like()
        };
        let files = vec![fixture(dir.path())];

        let outcomes = run_batch(&provider, &files, &mut reporter).await;

        assert_eq!(
            outcomes,
            vec![RunOutcome::Skipped {
                druid: "bb158br2509".to_owned(),
                file: "media/bb158br2509_sl.m4a".to_owned(),
            }]
        );
        assert!(reporter.results().is_empty());
    }

    #[tokio::test]
    async fn report_lands_next_to_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter =
            Reporter::new(dir.path().join("out"), "https://example.org/reports").unwrap();
        let provider = StubProvider::whisper_like();
        let files = vec![fixture(dir.path())];

        let (outcomes, csv_path) =
            run_and_report(&provider, &files, &mut reporter, dir.path()).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(csv_path, dir.path().join("report-whisper.csv"));
        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.starts_with("run_id,"));
        assert!(content.lines().next().unwrap().ends_with(",diff,options"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn report_filename_per_provider() {
        assert_eq!(report_filename(ProviderKind::Google), "report-google.csv");
        assert_eq!(report_filename(ProviderKind::Aws), "report-aws.csv");
    }
}
