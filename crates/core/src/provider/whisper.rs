//! Local whisper-model provider.
//!
//! The model inference itself is an external collaborator behind
//! [`WhisperEngine`]; this module owns the parameter grid, the
//! silence-aware language-detection window and the per-file language
//! cache that amortizes detection across the parameter combinations.

use crate::audio;
use crate::manifest::FileMetadata;
use crate::provider::{LoadCache, ProviderError, TranscriptionProvider};
use crate::silence::{self, LANGUAGE_WINDOW_SECS};
use crate::transcript::{ProviderKind, ProviderTranscript, WhisperTranscript};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// One parameter configuration of the local model.
#[derive(Clone, Debug, PartialEq)]
pub struct WhisperOptions {
    pub model: String,
    pub beam_size: u32,
    pub patience: f64,
    pub condition_on_previous_text: bool,
}

impl WhisperOptions {
    /// `key=value` pairs joined with `_`, used as the `options` column
    /// value and in raw-artifact naming.
    pub fn label(&self) -> String {
        format!(
            "model={}_beam_size={}_patience={:?}_condition_on_previous_text={}",
            self.model, self.beam_size, self.patience, self.condition_on_previous_text
        )
    }
}

/// The benchmark grid: large model, beam size 5/10, patience 1/2,
/// conditioning on previous text on/off.
pub fn option_combinations() -> Vec<WhisperOptions> {
    let mut combinations = Vec::new();
    for beam_size in [5, 10] {
        for patience in [1.0, 2.0] {
            for condition_on_previous_text in [true, false] {
                combinations.push(WhisperOptions {
                    model: "large".to_owned(),
                    beam_size,
                    patience,
                    condition_on_previous_text,
                });
            }
        }
    }
    combinations
}

pub trait WhisperEngine: Send + Sync {
    /// Identify the spoken language of a short audio clip.
    fn detect_language<'a>(
        &'a self,
        audio: &'a Path,
    ) -> BoxFuture<'a, Result<String, ProviderError>>;

    /// Transcribe a media file with the given options and a known
    /// language, returning the raw result document.
    fn transcribe<'a>(
        &'a self,
        audio: &'a Path,
        language: &'a str,
        options: &'a WhisperOptions,
    ) -> BoxFuture<'a, Result<WhisperTranscript, ProviderError>>;
}

/// Engine that drives an external whisper-style command.
///
/// Contract: `<command> detect-language <audio>` prints the language tag
/// on stdout; `<command> transcribe <audio> ...flags` prints the result
/// document as JSON on stdout.
#[derive(Clone, Debug)]
pub struct WhisperCliEngine {
    command: PathBuf,
}

impl WhisperCliEngine {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    async fn run(&self, args: &[&str], audio: &Path) -> Result<String, ProviderError> {
        let output = Command::new(&self.command)
            .arg(args[0])
            .arg(audio)
            .args(&args[1..])
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| ProviderError::Engine(format!("failed to spawn whisper: {e}")))?;
        if !output.status.success() {
            return Err(ProviderError::Engine(format!(
                "whisper exit_code={:?} stderr={}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl WhisperEngine for WhisperCliEngine {
    fn detect_language<'a>(
        &'a self,
        audio: &'a Path,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        async move {
            let stdout = self.run(&["detect-language"], audio).await?;
            let language = stdout.trim().to_owned();
            if language.is_empty() {
                return Err(ProviderError::Engine(
                    "empty language detection output".to_owned(),
                ));
            }
            Ok(language)
        }
        .boxed()
    }

    fn transcribe<'a>(
        &'a self,
        audio: &'a Path,
        language: &'a str,
        options: &'a WhisperOptions,
    ) -> BoxFuture<'a, Result<WhisperTranscript, ProviderError>> {
        async move {
            let beam_size = options.beam_size.to_string();
            let patience = format!("{:?}", options.patience);
            let condition = options.condition_on_previous_text.to_string();
            let stdout = self
                .run(
                    &[
                        "transcribe",
                        "--model",
                        &options.model,
                        "--language",
                        language,
                        "--beam-size",
                        &beam_size,
                        "--patience",
                        &patience,
                        "--condition-on-previous-text",
                        &condition,
                        "--word-timestamps",
                    ],
                    audio,
                )
                .await?;
            serde_json::from_str(&stdout)
                .map_err(|e| ProviderError::InvalidPayload(format!("whisper JSON: {e}")))
        }
        .boxed()
    }
}

pub struct WhisperProvider<E> {
    engine: E,
    options: Vec<WhisperOptions>,
    // Keyed by media path; detection is expensive (silence analysis plus a
    // model pass) and identical across the parameter grid.
    language_cache: LoadCache<String, String>,
}

impl<E: WhisperEngine> WhisperProvider<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            options: option_combinations(),
            language_cache: LoadCache::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<WhisperOptions>) -> Self {
        self.options = options;
        self
    }

    async fn detected_language(&self, media: &Path) -> Result<String, ProviderError> {
        let key = media.display().to_string();
        if let Some(language) = self.language_cache.get(&key) {
            debug!(media = %key, language = %language, "language cache hit");
            return Ok((*language).clone());
        }

        let silences = silence::detect_silences(media).await?;
        let start = silence::language_window_start(&silences);
        let window = std::env::temp_dir().join(format!(
            "asr-pilot-lang-{}.wav",
            media
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "clip".to_owned())
        ));
        audio::slice_window(media, start, LANGUAGE_WINDOW_SECS, &window).await?;

        let detected = self.engine.detect_language(&window).await;
        let _ = std::fs::remove_file(&window);
        let language = detected?;

        info!(media = %key, language = %language, window_start = start, "language detected");
        self.language_cache.insert(key, language.clone());
        Ok(language)
    }
}

impl<E: WhisperEngine> TranscriptionProvider for WhisperProvider<E> {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Whisper
    }

    fn combinations(&self) -> Vec<Option<String>> {
        self.options.iter().map(|o| Some(o.label())).collect()
    }

    fn transcribe<'a>(
        &'a self,
        file: &'a FileMetadata,
        combination: usize,
    ) -> BoxFuture<'a, Result<ProviderTranscript, ProviderError>> {
        async move {
            let options = self.options.get(combination).ok_or_else(|| {
                ProviderError::Engine(format!("unknown option combination {combination}"))
            })?;
            let media = Path::new(&file.media_filename);
            let language = self.detected_language(media).await?;
            let raw = self.engine.transcribe(media, &language, options).await?;
            Ok(ProviderTranscript::Whisper(raw))
        }
        .boxed()
    }
}
