use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use super::{validate_file_name, FileEntry, Progress, TranscodeEngine};
use crate::config::EngineConfig;
use crate::error::{Result, VizError};
use crate::timecode::parse_time_flexible;

const LOG_TAIL_LINES: usize = 20;

/// Native ffmpeg run as a subprocess.
///
/// The engine file namespace is a private temporary directory used as the
/// working directory of every invocation; it is removed on drop.
pub struct FfmpegEngine {
    config: EngineConfig,
    workdir: TempDir,
    ready: AtomicBool,
    progress_tx: watch::Sender<Option<Progress>>,
    log_tx: broadcast::Sender<String>,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let workdir = tempfile::Builder::new().prefix("ffviz-").tempdir()?;
        let (progress_tx, _) = watch::channel(None);
        let (log_tx, _) = broadcast::channel(256);

        debug!("Engine working directory: {}", workdir.path().display());

        Ok(Self {
            config,
            workdir,
            ready: AtomicBool::new(false),
            progress_tx,
            log_tx,
        })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_file_name(name)?;
        Ok(self.workdir.path().join(name))
    }

    /// Get ffmpeg version information
    pub async fn version_info(&self) -> Result<String> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| VizError::EngineUnavailable(format!("Failed to execute ffmpeg: {}", e)))?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(VizError::EngineUnavailable(format!("FFmpeg version check failed: {}", stderr)))
        }
    }
}

/// Output length the invocation is expected to produce, from `-t`.
fn requested_length(args: &[String]) -> Option<f64> {
    args.windows(2)
        .find(|w| w[0] == "-t")
        .and_then(|w| parse_time_flexible(&w[1]))
}

fn requested_seek(args: &[String]) -> f64 {
    args.windows(2)
        .find(|w| w[0] == "-ss")
        .and_then(|w| parse_time_flexible(&w[1]))
        .unwrap_or(0.0)
}

/// `  Duration: 00:00:20.05, start: 0.000000, bitrate: ...`
fn parse_input_duration(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let value = rest.split(',').next()?.trim();
    parse_time_flexible(value)
}

/// `out_time=00:00:05.000000` from `-progress` output
fn parse_out_time(line: &str) -> Option<f64> {
    let value = line.trim().strip_prefix("out_time=")?;
    parse_time_flexible(value)
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn load(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let version = self.version_info().await?;
        info!("FFmpeg is available: {}", version);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn execute(&self, args: &[String]) -> Result<()> {
        if !self.is_ready() {
            return Err(VizError::EngineNotReady);
        }

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.current_dir(self.workdir.path())
            .args(&self.config.global_args)
            .args(["-nostats", "-progress", "pipe:1"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Executing ffmpeg command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                VizError::EngineUnavailable(format!("FFmpeg not found: {}", e))
            } else {
                VizError::Io(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VizError::EngineFailed("ffmpeg stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| VizError::EngineFailed("ffmpeg stderr unavailable".to_string()))?;

        let started = Instant::now();
        let seek = requested_seek(args);
        let expected_ms = AtomicU64::new(
            requested_length(args).map(|t| (t * 1000.0) as u64).unwrap_or(0),
        );
        self.progress_tx.send_replace(Some(Progress { ratio: 0.0, elapsed_seconds: 0.0 }));

        let progress = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let done = line.trim() == "progress=end";
                let position = parse_out_time(&line);
                if !done && position.is_none() {
                    continue;
                }

                let expected = expected_ms.load(Ordering::Relaxed) as f64 / 1000.0;
                let ratio = match position {
                    _ if done => 1.0,
                    Some(t) if expected > 0.0 => (t / expected).clamp(0.0, 1.0),
                    _ => 0.0,
                };
                self.progress_tx.send_replace(Some(Progress {
                    ratio,
                    elapsed_seconds: started.elapsed().as_secs_f64(),
                }));
            }
        };

        let logs = async {
            let mut tail = VecDeque::with_capacity(LOG_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "ffviz::engine", "{}", line);
                if let Some(input) = parse_input_duration(&line) {
                    let _ = expected_ms.compare_exchange(
                        0,
                        ((input - seek).max(0.0) * 1000.0) as u64,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    );
                }
                let _ = self.log_tx.send(line.clone());
                if tail.len() == LOG_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        };

        let ((), tail) = tokio::join!(progress, logs);
        let status = child.wait().await;
        self.progress_tx.send_replace(None);
        let status = status?;

        if !status.success() {
            let message = Vec::from(tail).join("\n");
            return Err(VizError::EngineFailed(if message.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                message
            }));
        }

        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => VizError::FileNotFound(name.to_string()),
            _ => VizError::Io(e),
        })
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        tokio::fs::remove_file(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => VizError::FileNotFound(name.to_string()),
            _ => VizError::Io(e),
        })
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(self.workdir.path()).await?;
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                entries.push(FileEntry {
                    name: entry.file_name().to_string_lossy().to_string(),
                    size: metadata.len(),
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn progress(&self) -> watch::Receiver<Option<Progress>> {
        self.progress_tx.subscribe()
    }

    fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }
}

/// Read the media duration in seconds with ffprobe.
pub async fn probe_duration<P: AsRef<Path>>(probe_path: &str, media: P) -> Result<Option<f64>> {
    let media = media.as_ref();
    debug!("Probing duration of {}", media.display());

    let output = Command::new(probe_path)
        .args(["-v", "error", "-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(media)
        .output()
        .await
        .map_err(|e| VizError::EngineUnavailable(format!("Failed to execute ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VizError::EngineFailed(format!("ffprobe failed: {}", stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_requested_length_and_seek() {
        let a = args(&["-i", "input", "-ss", "00:00:05.000", "-t", "00:00:10.000", "out.mp4"]);
        assert_eq!(requested_length(&a), Some(10.0));
        assert_eq!(requested_seek(&a), 5.0);
        assert_eq!(requested_length(&args(&["-i", "input", "out.mp4"])), None);
    }

    #[test]
    fn test_parse_stderr_and_progress_lines() {
        assert_eq!(
            parse_input_duration("  Duration: 00:01:05.50, start: 0.000000, bitrate: 1205 kb/s"),
            Some(65.5)
        );
        assert_eq!(parse_input_duration("Stream #0:0: Video: h264"), None);
        assert_eq!(parse_out_time("out_time=00:00:05.000000"), Some(5.0));
        assert_eq!(parse_out_time("out_time_ms=5000000"), None);
    }

    #[tokio::test]
    async fn test_file_namespace() {
        let engine = FfmpegEngine::new(EngineConfig::default()).unwrap();

        engine.write_file("input", b"abc").await.unwrap();
        let files = engine.list_files().await.unwrap();
        assert_eq!(files, vec![FileEntry { name: "input".to_string(), size: 3 }]);
        assert_eq!(engine.read_file("input").await.unwrap(), b"abc");

        engine.delete_file("input").await.unwrap();
        assert!(matches!(engine.delete_file("input").await, Err(VizError::FileNotFound(_))));
        assert!(matches!(engine.read_file("../etc").await, Err(VizError::InvalidFileName(_))));
    }

    #[tokio::test]
    async fn test_execute_requires_load() {
        let engine = FfmpegEngine::new(EngineConfig::default()).unwrap();
        let result = engine.execute(&args(&["-i", "input", "out.mp4"])).await;
        assert!(matches!(result, Err(VizError::EngineNotReady)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let config = EngineConfig {
            binary_path: "/nonexistent/ffmpeg-binary".to_string(),
            ..EngineConfig::default()
        };
        let engine = FfmpegEngine::new(config).unwrap();
        assert!(matches!(engine.load().await, Err(VizError::EngineUnavailable(_))));
        assert!(!engine.is_ready());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropped_invocation_kills_child() {
        let config = EngineConfig {
            binary_path: "sh".to_string(),
            global_args: args(&["-c", "echo $$ > pid; exec sleep 30", "sh"]),
            ..EngineConfig::default()
        };
        let engine = std::sync::Arc::new(FfmpegEngine::new(config).unwrap());
        engine.ready.store(true, Ordering::SeqCst);

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.execute(&[]).await })
        };

        let pid_file = engine.workdir.path().join("pid");
        let mut pid = None;
        for _ in 0..200 {
            if let Ok(text) = std::fs::read_to_string(&pid_file) {
                pid = text.trim().parse::<u32>().ok();
                if pid.is_some() {
                    break;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let pid = pid.expect("child wrote its pid");

        task.abort();
        let _ = task.await;

        let mut running = true;
        for _ in 0..200 {
            match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
                Err(_) => running = false,
                Ok(stat) => running = stat.split_whitespace().nth(2) != Some("Z"),
            }
            if !running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!running);
    }
}
