//! Video segment extraction.
//!
//! Turns a millisecond timestamp within a source video into a bounded,
//! playable clip. The window is clamped to the video duration so timestamps
//! near either boundary never produce out-of-range requests, and the
//! sub-range is re-encoded with a fixed audio codec for playback
//! compatibility.

use crate::error::{Result, SiktError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// A request to extract one clip around a timestamp.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    /// Source video file.
    pub source: PathBuf,
    /// Timestamp within the source video, in milliseconds.
    pub timestamp_ms: i64,
    /// Seconds of video to keep before the timestamp.
    pub lead_seconds: f64,
    /// Seconds of video to keep after the timestamp.
    pub trail_seconds: f64,
    /// Directory the clip is written to (created if absent).
    pub output_dir: PathBuf,
    /// Output file name. Repeated requests with the same name overwrite.
    pub output_name: String,
}

/// Result of a clip extraction.
#[derive(Debug, Clone)]
pub struct ClipResult {
    /// Absolute path of the written clip.
    pub output_path: PathBuf,
}

/// Compute the clamped clip window for a timestamp.
///
/// The timestamp is truncated to whole seconds before padding is applied.
/// The returned window always satisfies `0 <= start <= end <= duration`.
pub fn clip_window(timestamp_ms: i64, lead_seconds: f64, trail_seconds: f64, duration: f64) -> (f64, f64) {
    let timestamp_sec = (timestamp_ms / 1000) as f64;
    let start = (timestamp_sec - lead_seconds).max(0.0).min(duration);
    let end = (timestamp_sec + trail_seconds).min(duration).max(start);
    (start, end)
}

/// Extract a clip around a timestamp, re-encoding the sub-range.
///
/// Writes exactly one file at `{output_dir}/{output_name}` and returns its
/// path. Errors from the media tools are fatal for this request; the caller
/// decides whether a failed clip fails the surrounding operation.
#[instrument(skip(request), fields(source = %request.source.display(), timestamp_ms = request.timestamp_ms))]
pub async fn extract_clip(request: &ClipRequest) -> Result<ClipResult> {
    std::fs::create_dir_all(&request.output_dir)?;

    let duration = probe_duration(&request.source).await?;
    let (start, end) = clip_window(
        request.timestamp_ms,
        request.lead_seconds,
        request.trail_seconds,
        duration,
    );

    let output_path = request.output_dir.join(&request.output_name);
    debug!("Extracting [{:.3}s, {:.3}s] of {:.1}s", start, end, duration);

    let result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(&request.source)
        .arg("-t").arg(format!("{:.3}", end - start))
        .arg("-c:v").arg("libx264")
        .arg("-c:a").arg("aac")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&output_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => {
            info!("Wrote clip to {:?}", output_path);
            Ok(ClipResult { output_path })
        }
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(SiktError::Extraction(format!("ffmpeg failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SiktError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(SiktError::Extraction(format!("ffmpeg error: {e}"))),
    }
}

/// Queries the duration of a media file using ffprobe with JSON output.
async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiktError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(SiktError::Extraction(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(SiktError::Extraction("ffprobe returned error".into()));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| SiktError::Extraction("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SiktError::Extraction("Could not determine video duration".into()))
}
