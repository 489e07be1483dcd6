//! End-to-end: raw transcript in, scored CSV row and diff page out.

use asr_pilot_core::manifest::FileMetadata;
use asr_pilot_core::report::Reporter;
use asr_pilot_core::transcript::{ProviderKind, ProviderTranscript};
use asr_pilot_core::util::csv;
use std::path::Path;

fn manifest_row(dir: &Path, reference: &str) -> FileMetadata {
    let transcript = dir.join("bb158br2509.txt");
    std::fs::write(&transcript, reference).unwrap();
    FileMetadata {
        druid: "bb158br2509".to_owned(),
        media_filename: "media/bb158br2509_sl.m4a".to_owned(),
        media_language: "en".to_owned(),
        transcript_filename: transcript.display().to_string(),
        transcript_language: "en".to_owned(),
        run_count: 1,
    }
}

fn whisper_raw(text: &str) -> ProviderTranscript {
    serde_json::from_str(&format!(
        r#"{{"segments": [{{"text": {}}}], "language": "en"}}"#,
        serde_json::to_string(text).unwrap()
    ))
    .unwrap()
}

#[test]
fn perfect_transcript_scores_zero_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut reporter = Reporter::new(&out, "https://reports.test/asr-pilot").unwrap();

    let file = manifest_row(dir.path(), "This is a test for cipher reading in English.\n");
    let raw = whisper_raw(" This is a test for cipher reading in English.");

    let result = reporter
        .compare(
            &file,
            &raw,
            ProviderKind::Whisper,
            12.5,
            Some("model=large_beam_size=5_patience=1.0_condition_on_previous_text=true".to_owned()),
        )
        .unwrap();

    assert_eq!(result.run_id, "bb158br2509-whisper-001");
    assert_eq!(result.language, "en");
    assert_eq!(result.wer, 0.0);
    assert_eq!(result.mer, 0.0);
    assert_eq!(result.wil, 0.0);
    assert_eq!(result.wip, 1.0);
    assert_eq!(result.hits, 9);
    assert_eq!(result.substitutions + result.insertions + result.deletions, 0);
    assert_eq!(
        result.diff,
        "https://reports.test/asr-pilot/out/bb158br2509-whisper-001.html"
    );

    // The diff page is written under the output directory.
    let html = std::fs::read_to_string(out.join("bb158br2509-whisper-001.html")).unwrap();
    assert!(html.contains("purl.stanford.edu/bb158br2509"));

    reporter
        .write_raw_transcript(&result.run_id, &raw)
        .unwrap();
    assert!(out.join("bb158br2509-whisper-001.json").exists());

    reporter.record(result);
    let csv_path = dir.path().join("report-whisper.csv");
    reporter.write_report(&csv_path, Some("options")).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let records = csv::parse_records(&content);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0][0], "run_id");
    assert_eq!(records[0].last().unwrap(), "options");
    assert_eq!(records[1][0], "bb158br2509-whisper-001");
    assert_eq!(records[1][7], "0"); // wer
    assert_eq!(records[1][11], "9"); // hits
}

#[test]
fn imperfect_transcript_reports_known_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let mut reporter =
        Reporter::new(dir.path().join("out"), "https://reports.test/asr-pilot").unwrap();

    let file = manifest_row(dir.path(), "the quick brown fox jumped over the lazy dog\n");
    let raw = whisper_raw("the quick brown mouse jumped over this cat");

    let result = reporter
        .compare(&file, &raw, ProviderKind::Whisper, 3.0, None)
        .unwrap();

    assert_eq!(result.wer, 0.4444444444444444);
    assert_eq!(result.mer, 0.4444444444444444);
    assert_eq!(result.wil, 0.6527777777777778);
    assert_eq!(result.wip, 0.3472222222222222);
    assert_eq!(result.hits, 5);
    assert_eq!(result.substitutions, 3);
    assert_eq!(result.deletions, 1);
    assert_eq!(result.insertions, 0);

    // Changed words are highlighted on the diff page.
    let html = std::fs::read_to_string(
        reporter
            .output_dir()
            .join(format!("{}.html", result.run_id)),
    )
    .unwrap();
    assert!(html.contains(r#"<span class="diff_chg">"#));
}
