//! Audio download via yt-dlp.

use crate::error::{Result, ScribeError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Download the audio track of `url` into `output_dir` as `<stem>.mp3`.
///
/// An existing file with that name is reused without downloading again.
#[instrument(skip(output_dir))]
pub async fn download_audio(url: &str, stem: &str, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let target_path = output_dir.join(format!("{}.mp3", stem));
    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", stem));

    let result = Command::new("yt-dlp")
        .arg("--extract-audio")
        .arg("--audio-format")
        .arg("mp3")
        .arg("--audio-quality")
        .arg("0")
        .arg("--output")
        .arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScribeError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(ScribeError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScribeError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    let downloaded = find_audio_file(output_dir, stem)?;
    debug!("Downloaded audio to {:?}", downloaded);
    Ok(downloaded)
}

/// Locate a downloaded file by stem. The mp3 is expected, but yt-dlp falls
/// back to the source container when conversion is unavailable.
fn find_audio_file(dir: &Path, stem: &str) -> Result<PathBuf> {
    for ext in ["mp3", "m4a", "opus", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(ScribeError::AudioDownload(
        "Audio file not found after download".into(),
    ))
}
