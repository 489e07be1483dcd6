//! Provider transcript shapes and their normalization.
//!
//! Each provider returns a differently shaped result document. The raw
//! shapes are kept as serde types (unknown fields preserved, so the per-run
//! JSON artifact stays verbatim) and reduced to a common
//! `NormalizedTranscript` for scoring and diff rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Whisper,
    Google,
    Aws,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper => "whisper",
            Self::Google => "google",
            Self::Aws => "aws",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "whisper" => Some(Self::Whisper),
            "google" => Some(Self::Google),
            "aws" => Some(Self::Aws),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhisperSegment {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Local model result: a segment list plus one top-level language tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhisperTranscript {
    pub segments: Vec<WhisperSegment>,
    pub language: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoogleAlternative {
    pub transcript: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoogleResult {
    pub alternatives: Vec<GoogleAlternative>,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Google long-running-recognize response: one result per utterance, each
/// with ranked alternatives and its own language tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoogleTranscript {
    pub results: Vec<GoogleResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AwsTranscriptChunk {
    pub transcript: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AwsResults {
    pub transcripts: Vec<AwsTranscriptChunk>,
    pub language_code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// AWS Transcribe job document: transcript chunks under a single results
/// object with one detected language code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AwsTranscript {
    pub results: AwsResults,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderTranscript {
    Whisper(WhisperTranscript),
    Aws(AwsTranscript),
    Google(GoogleTranscript),
}

/// Provider-independent transcript: ordered text lines and one best-guess
/// language tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedTranscript {
    pub lines: Vec<String>,
    pub language: String,
}

#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("transcript shape does not match provider kind {0}")]
    UnknownProviderKind(ProviderKind),

    #[error("transcript contains no results")]
    EmptyTranscript,

    #[error("result has no transcription alternatives")]
    MissingAlternative,
}

/// Reduce a raw provider transcript to lines and a language tag.
///
/// A raw transcript whose shape does not correspond to `kind` is a
/// programming error in the calling orchestration, surfaced as
/// `UnknownProviderKind` rather than silently reinterpreted.
pub fn parse(
    raw: &ProviderTranscript,
    kind: ProviderKind,
) -> Result<NormalizedTranscript, TranscriptError> {
    match (kind, raw) {
        (ProviderKind::Whisper, ProviderTranscript::Whisper(t)) => Ok(NormalizedTranscript {
            lines: t.segments.iter().map(|s| s.text.clone()).collect(),
            language: t.language.clone(),
        }),
        (ProviderKind::Google, ProviderTranscript::Google(t)) => {
            let mut lines = Vec::with_capacity(t.results.len());
            for result in &t.results {
                let first = result
                    .alternatives
                    .first()
                    .ok_or(TranscriptError::MissingAlternative)?;
                lines.push(first.transcript.clone());
            }
            let language = majority_language(t.results.iter().map(|r| r.language_code.as_str()))
                .ok_or(TranscriptError::EmptyTranscript)?;
            Ok(NormalizedTranscript { lines, language })
        }
        (ProviderKind::Aws, ProviderTranscript::Aws(t)) => Ok(NormalizedTranscript {
            lines: t
                .results
                .transcripts
                .iter()
                .map(|c| c.transcript.clone())
                .collect(),
            language: t.results.language_code.clone(),
        }),
        (kind, _) => Err(TranscriptError::UnknownProviderKind(kind)),
    }
}

// Majority vote with ties broken by first-encountered order.
fn majority_language<'a>(tags: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for tag in tags {
        match counts.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, n)) => *n += 1,
            None => counts.push((tag, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (tag, n) in counts {
        match best {
            Some((_, best_n)) if n <= best_n => {}
            _ => best = Some((tag, n)),
        }
    }
    best.map(|(tag, _)| tag.to_owned())
}
