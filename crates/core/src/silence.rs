//! Silence-aware audio preconditioning.
//!
//! Leading silence biases language detection, so before handing audio to a
//! detector the providers run a two-pass ffmpeg analysis: pass one measures
//! the mean volume of the whole file, pass two detects silences against a
//! threshold derived from it. Consumers then pick a 30-second window that
//! skips any leading silence.

use crate::audio::{self, AudioError};
use ffmpeg_sidecar::paths::ffmpeg_path;
use std::path::Path;
use tokio::process::Command;
use tracing::warn;

/// One detected silence, in seconds from the start of the audio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilenceInterval {
    pub start_silence: f64,
    pub end_silence: f64,
    pub duration: f64,
}

/// Seconds of audio fed to language detection.
pub const LANGUAGE_WINDOW_SECS: f64 = 30.0;

const MIN_SILENCE_SECS: f64 = 0.5;

#[derive(thiserror::Error, Debug)]
pub enum SilenceError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("malformed tool output: {0}")]
    MalformedToolOutput(String),
}

/// Detect silences in a media file, ordered by occurrence.
pub async fn detect_silences(media: &Path) -> Result<Vec<SilenceInterval>, SilenceError> {
    audio::ensure_ffmpeg_available().map_err(SilenceError::Audio)?;

    let mut volume_pass = Command::new(ffmpeg_path());
    volume_pass
        .arg("-i")
        .arg(media)
        .args(["-af", "volumedetect", "-vn", "-sn", "-dn", "-f", "null"])
        .arg(null_sink());
    let volume_output = audio::run_ffmpeg(&mut volume_pass).await?;
    let mean_volume = parse_field(&volume_output, "mean_volume")?;

    // Threshold sits 1 dB under the measured mean, floored at -37 dB for
    // quiet recordings. Earlier report runs used exactly this rule.
    let threshold = if mean_volume > -37.0 {
        mean_volume - 1.0
    } else {
        -37.0
    };

    let mut silence_pass = Command::new(ffmpeg_path());
    silence_pass
        .arg("-i")
        .arg(media)
        .args([
            "-af",
            &format!("silencedetect=n={threshold}dB:d={MIN_SILENCE_SECS}"),
            "-f",
            "null",
            "-",
        ]);
    let silence_output = audio::run_ffmpeg(&mut silence_pass).await?;
    parse_silences(&silence_output)
}

/// Start of the 30-second language-detection window: just past the first
/// silence when that silence begins at integer-second zero, otherwise the
/// head of the file.
pub fn language_window_start(silences: &[SilenceInterval]) -> f64 {
    match silences.first() {
        Some(first) if first.start_silence as i64 == 0 => first.end_silence,
        _ => 0.0,
    }
}

fn null_sink() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

fn parse_silences(output: &str) -> Result<Vec<SilenceInterval>, SilenceError> {
    let mut intervals = Vec::new();
    let mut pending_start: Option<f64> = None;
    for line in output.lines() {
        if line.contains("silence_start") {
            if pending_start.is_some() {
                warn!(line = %line, "silence_start with previous interval still open");
            }
            pending_start = Some(parse_field(line, "silence_start")?);
        } else if line.contains("silence_end") {
            let start_silence = pending_start.take().ok_or_else(|| {
                SilenceError::MalformedToolOutput(
                    "silence_end without a preceding silence_start".to_owned(),
                )
            })?;
            let end_part = line.split('|').next().unwrap_or(line);
            let end_silence = parse_field(end_part, "silence_end")?;
            let duration = parse_field(line, "silence_duration")?;
            intervals.push(SilenceInterval {
                start_silence,
                end_silence,
                duration,
            });
        }
    }
    if pending_start.is_some() {
        warn!("dropping unterminated trailing silence_start");
    }
    Ok(intervals)
}

// Take the text after the last colon on the first line mentioning `field`
// and keep only digits, minus and dot. ffmpeg decorates these lines with
// detector prefixes and units.
fn parse_field(content: &str, field: &str) -> Result<f64, SilenceError> {
    let line = content
        .lines()
        .find(|l| l.contains(field))
        .ok_or_else(|| SilenceError::MalformedToolOutput(format!("missing field {field}")))?;
    let tail = line.rsplit(':').next().unwrap_or("");
    let cleaned: String = tail
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    cleaned
        .parse()
        .map_err(|_| SilenceError::MalformedToolOutput(format!("unparseable value for {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mean_volume_line() {
        let output = "\
[Parsed_volumedetect_0 @ 0x55] n_samples: 480000
[Parsed_volumedetect_0 @ 0x55] mean_volume: -24.5 dB
[Parsed_volumedetect_0 @ 0x55] max_volume: -3.2 dB
";
        assert_eq!(parse_field(output, "mean_volume").unwrap(), -24.5);
    }

    #[test]
    fn parses_silence_pairs() {
        let output = "\
[silencedetect @ 0x55] silence_start: 2.70731
[silencedetect @ 0x55] silence_end: 3.22 | silence_duration: 0.512687
";
        let intervals = parse_silences(output).unwrap();
        assert_eq!(
            intervals,
            vec![SilenceInterval {
                start_silence: 2.70731,
                end_silence: 3.22,
                duration: 0.512687,
            }]
        );
    }

    #[test]
    fn leading_silence_from_zero() {
        let output = "\
[silencedetect @ 0x55] silence_start: 0
[silencedetect @ 0x55] silence_end: 35.1915 | silence_duration: 35.1915
";
        let intervals = parse_silences(output).unwrap();
        assert_eq!(intervals[0].start_silence, 0.0);
        assert_eq!(language_window_start(&intervals), 35.1915);
    }

    #[test]
    fn window_starts_at_zero_without_leading_silence() {
        let intervals = [SilenceInterval {
            start_silence: 2.70731,
            end_silence: 3.22,
            duration: 0.512687,
        }];
        assert_eq!(language_window_start(&intervals), 0.0);
        assert_eq!(language_window_start(&[]), 0.0);
    }

    #[test]
    fn sub_second_start_counts_as_leading() {
        // Truncation to integer seconds, not rounding.
        let intervals = [SilenceInterval {
            start_silence: 0.9,
            end_silence: 12.0,
            duration: 11.1,
        }];
        assert_eq!(language_window_start(&intervals), 12.0);
    }

    #[test]
    fn end_without_start_is_fatal() {
        let output = "[silencedetect @ 0x55] silence_end: 3.22 | silence_duration: 0.5\n";
        let err = parse_silences(output).unwrap_err();
        assert!(matches!(err, SilenceError::MalformedToolOutput(_)));
    }
}
