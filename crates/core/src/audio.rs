//! ffmpeg plumbing shared by the silence detector and the providers:
//! availability check, mono wav conversion and window slicing.

use ffmpeg_sidecar::{download, paths::ffmpeg_path};
use std::path::Path;
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),
}

pub fn ensure_ffmpeg_available() -> Result<(), AudioError> {
    download::auto_download().map_err(|e| AudioError::FfmpegUnavailable(e.to_string()))
}

/// Run ffmpeg to completion and return its stderr, where ffmpeg reports
/// filter output. Output is fully buffered before the caller parses it.
pub(crate) async fn run_ffmpeg(command: &mut Command) -> Result<String, AudioError> {
    let output = command
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .map_err(|e| AudioError::FfmpegFailed(e.to_string()))?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(AudioError::FfmpegFailed(format!(
            "exit_code={:?} stderr={}",
            output.status.code(),
            stderr.trim()
        )));
    }
    Ok(stderr)
}

/// Convert a media file to a single-channel wav, as the cloud services
/// expect.
pub async fn convert_to_wav(media: &Path, wav: &Path) -> Result<(), AudioError> {
    ensure_ffmpeg_available()?;
    let mut command = Command::new(ffmpeg_path());
    command
        .arg("-y")
        .args(["-loglevel", "error"])
        .arg("-i")
        .arg(media)
        .args(["-ac", "1"])
        .arg(wav);
    run_ffmpeg(&mut command).await?;
    Ok(())
}

/// Slice `duration` seconds of audio starting at `start` into a mono wav.
pub async fn slice_window(
    media: &Path,
    start: f64,
    duration: f64,
    wav: &Path,
) -> Result<(), AudioError> {
    ensure_ffmpeg_available()?;
    let mut command = Command::new(ffmpeg_path());
    command
        .arg("-y")
        .args(["-loglevel", "error"])
        .arg("-i")
        .arg(media)
        .args(["-ss", &format!("{start}")])
        .args(["-t", &format!("{duration}")])
        .args(["-ac", "1"])
        .arg(wav);
    run_ffmpeg(&mut command).await?;
    Ok(())
}
