use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command as TokioCommand;

/// Runs the external encoder. Split out so the normalization logic can be
/// exercised without ffmpeg installed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeExecutor: Send + Sync {
    async fn run_ffmpeg_normalize(&self, source: &Path, output: &Path) -> io::Result<Output>;
}

pub struct RealTranscodeExecutor {
    ffmpeg: PathBuf,
}

impl RealTranscodeExecutor {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Default for RealTranscodeExecutor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl TranscodeExecutor for RealTranscodeExecutor {
    async fn run_ffmpeg_normalize(&self, source: &Path, output: &Path) -> io::Result<Output> {
        TokioCommand::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i").arg(source)
            .arg("-c:v").arg("libx264")
            .arg("-crf").arg("21")
            .arg("-vf").arg("scale=w=320:h=240")
            .arg("-f").arg("mp4")
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
    }
}
