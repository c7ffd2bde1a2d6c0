//! Best-effort video normalization.
//!
//! The encoder writes into a scratch file next to the target. The target only
//! appears once ffmpeg exited cleanly and produced bytes, and the source is
//! only removed after that rename.

use super::cmd::TranscodeExecutor;
use crate::error::TranscodeError;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Where the normalized copy of `source` is written.
pub fn normalized_target(source: &Path) -> PathBuf {
    let is_mp4 = source
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false);

    if is_mp4 {
        let mut name = source.file_stem().map(OsString::from).unwrap_or_default();
        name.push(".h264.mp4");
        source.with_file_name(name)
    } else {
        source.with_extension("mp4")
    }
}

fn scratch_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(".part");
    target.with_file_name(name)
}

/// Normalizes `source` and returns the path of the replacement. On any error
/// the source is left untouched.
pub async fn normalize_video(
    source: &Path,
    runner: &(impl TranscodeExecutor + ?Sized),
) -> Result<PathBuf, TranscodeError> {
    let target = normalized_target(source);
    let scratch = scratch_path(&target);

    let output = match runner.run_ffmpeg_normalize(source, &scratch).await {
        Ok(output) => output,
        Err(e) => {
            discard(&scratch).await;
            return Err(TranscodeError::Unavailable(e));
        }
    };

    if !output.status.success() {
        discard(&scratch).await;
        return Err(TranscodeError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let written = match tokio::fs::metadata(&scratch).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };
    if written == 0 {
        discard(&scratch).await;
        return Err(TranscodeError::MissingOutput);
    }

    if let Err(e) = tokio::fs::rename(&scratch, &target).await {
        discard(&scratch).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::remove_file(source).await {
        tracing::warn!(path = %source.display(), error = %e, "failed to remove original video");
    }

    tracing::debug!(from = %source.display(), to = %target.display(), "normalized video");
    Ok(target)
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove encoder scratch file"),
    }
}
