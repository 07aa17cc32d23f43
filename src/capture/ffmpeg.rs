use super::{CaptureError, CaptureSource};
use crate::config::CaptureConfig;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const STDERR_LIMIT: usize = 500;

/// Grabs a single frame with `ffmpeg`
#[derive(Debug, Clone, Default)]
pub struct FfmpegCapture;

impl FfmpegCapture {
    pub fn new() -> Self {
        Self
    }

    fn args(settings: &CaptureConfig, source_uri: &str, output: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if source_uri.starts_with("rtsp://") && !settings.rtsp_transport.is_empty() {
            args.push("-rtsp_transport".to_string());
            args.push(settings.rtsp_transport.clone());
        }
        args.extend(
            [
                "-i",
                source_uri,
                "-t",
                "1",
                "-frames:v",
                "1",
                "-loglevel",
                "error",
                "-y",
            ]
            .map(String::from),
        );
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl CaptureSource for FfmpegCapture {
    async fn capture(
        &self,
        settings: &CaptureConfig,
        source_uri: &str,
        output: &Path,
    ) -> Result<(), CaptureError> {
        let args = Self::args(settings, source_uri, output);
        debug!(program = %settings.program, output = %output.display(), "Spawning capture process");

        let child = Command::new(&settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(CaptureError::Spawn)?;

        let timeout = settings.timeout();
        let result = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout(timeout))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CaptureError::Failed {
                status: result.status.to_string(),
                stderr: stderr.trim().chars().take(STDERR_LIMIT).collect(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtsp_args() {
        let settings = CaptureConfig::default();
        let args = FfmpegCapture::args(
            &settings,
            "rtsp://cam/stream",
            Path::new("/pics/2024-01-01/a.jpg"),
        );

        assert_eq!(
            args,
            vec![
                "-rtsp_transport",
                "tcp",
                "-i",
                "rtsp://cam/stream",
                "-t",
                "1",
                "-frames:v",
                "1",
                "-loglevel",
                "error",
                "-y",
                "/pics/2024-01-01/a.jpg",
            ]
        );
    }

    #[test]
    fn test_non_rtsp_source_skips_transport() {
        let args = FfmpegCapture::args(
            &CaptureConfig::default(),
            "http://cam/snapshot.mjpg",
            Path::new("out.jpg"),
        );
        assert_eq!(args[0], "-i");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let settings = CaptureConfig {
            program: "/nonexistent/ffmpeg-binary".to_string(),
            ..CaptureConfig::default()
        };

        let err = FfmpegCapture::new()
            .capture(&settings, "rtsp://cam/stream", Path::new("out.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Spawn(_)));
    }
}
