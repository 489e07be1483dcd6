//! Provider collaborators: everything that produces a raw transcript for
//! the reporting core to consume.

pub mod cache;
pub mod poll;
pub mod remote;
pub mod whisper;

pub use cache::LoadCache;
pub use poll::{poll_until, PollConfig};
pub use remote::RemoteJobProvider;
pub use whisper::{WhisperCliEngine, WhisperEngine, WhisperOptions, WhisperProvider};

use crate::manifest::FileMetadata;
use crate::transcript::{ProviderKind, ProviderTranscript};
use futures::future::BoxFuture;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("transcription job failed: {0}")]
    JobFailed(String),

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcription engine failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Audio(#[from] crate::audio::AudioError),

    #[error(transparent)]
    Silence(#[from] crate::silence::SilenceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid transcript payload: {0}")]
    InvalidPayload(String),
}

pub trait TranscriptionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// One entry per parameter configuration to run against every file;
    /// the label, if any, fills the provider's extra CSV column.
    fn combinations(&self) -> Vec<Option<String>>;

    /// Whether this provider can process the given manifest row at all.
    /// Rows it cannot are skipped by the runner, not failed.
    fn supports(&self, file: &FileMetadata) -> bool {
        let _ = file;
        true
    }

    fn transcribe<'a>(
        &'a self,
        file: &'a FileMetadata,
        combination: usize,
    ) -> BoxFuture<'a, Result<ProviderTranscript, ProviderError>>;
}
