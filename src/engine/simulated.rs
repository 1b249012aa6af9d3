use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use super::{validate_file_name, FileEntry, Progress, TranscodeEngine};
use crate::error::{Result, VizError};

/// What a simulated invocation does with its input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SimulatedBehavior {
    /// Copy the input bytes to the output name
    #[default]
    Copy,
    /// Fail with the given engine message
    Fail(String),
    /// Succeed without creating the output
    NoOutput,
    /// Succeed with a zero-length output
    EmptyOutput,
}

/// In-memory engine: the virtual file system is a map and execution copies
/// the `-i` file to the last token.
pub struct SimulatedEngine {
    files: Mutex<HashMap<String, Vec<u8>>>,
    behavior: Mutex<SimulatedBehavior>,
    latency: Duration,
    ready: AtomicBool,
    invocations: Mutex<Vec<Vec<String>>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    progress_tx: watch::Sender<Option<Progress>>,
    log_tx: broadcast::Sender<String>,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        let (progress_tx, _) = watch::channel(None);
        let (log_tx, _) = broadcast::channel(64);
        Self {
            files: Mutex::new(HashMap::new()),
            behavior: Mutex::new(SimulatedBehavior::Copy),
            latency: Duration::ZERO,
            ready: AtomicBool::new(false),
            invocations: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            progress_tx,
            log_tx,
        }
    }

    /// Time each invocation takes, split across its progress steps.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_behavior(self, behavior: SimulatedBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn set_behavior(&self, behavior: SimulatedBehavior) {
        if let Ok(mut guard) = self.behavior.lock() {
            *guard = behavior;
        }
    }

    /// Argument lists of every execution so far.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Highest number of executions that overlapped.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn lock_files(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| VizError::EngineFailed("virtual file system poisoned".to_string()))
    }

    fn log(&self, line: String) {
        debug!(target: "ffviz::engine", "{}", line);
        let _ = self.log_tx.send(line);
    }

    fn run(&self, args: &[String], started: Instant) -> Result<()> {
        let input = args
            .windows(2)
            .find(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .ok_or_else(|| VizError::EngineFailed("Invalid argument: no input specified".to_string()))?;
        let output = match args.last() {
            Some(last) if args.len() > 2 && *last != input => last.clone(),
            _ => {
                return Err(VizError::EngineFailed(
                    "Invalid argument: at least one output file must be specified".to_string(),
                ))
            }
        };

        let behavior = self.behavior.lock().map(|g| g.clone()).unwrap_or_default();
        let mut files = self.lock_files()?;
        let data = files
            .get(&input)
            .cloned()
            .ok_or_else(|| VizError::EngineFailed(format!("{}: No such file or directory", input)))?;

        match behavior {
            SimulatedBehavior::Copy => {
                files.insert(output, data);
            }
            SimulatedBehavior::EmptyOutput => {
                files.insert(output, Vec::new());
            }
            SimulatedBehavior::NoOutput => {}
            SimulatedBehavior::Fail(message) => return Err(VizError::EngineFailed(message)),
        }

        self.progress_tx.send_replace(Some(Progress {
            ratio: 1.0,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        }));
        Ok(())
    }
}

#[async_trait]
impl TranscodeEngine for SimulatedEngine {
    async fn load(&self) -> Result<()> {
        if !self.ready.swap(true, Ordering::SeqCst) {
            self.log("simulated engine loaded".to_string());
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn execute(&self, args: &[String]) -> Result<()> {
        if !self.is_ready() {
            return Err(VizError::EngineNotReady);
        }

        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(args.to_vec());
        }
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let started = Instant::now();
        self.log(format!("ffmpeg {}", args.join(" ")));
        self.progress_tx.send_replace(Some(Progress { ratio: 0.0, elapsed_seconds: 0.0 }));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency / 2).await;
            self.progress_tx.send_replace(Some(Progress {
                ratio: 0.5,
                elapsed_seconds: started.elapsed().as_secs_f64(),
            }));
            tokio::time::sleep(self.latency / 2).await;
        }

        let result = self.run(args, started);
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.progress_tx.send_replace(None);
        result
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        validate_file_name(name)?;
        self.lock_files()?.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        validate_file_name(name)?;
        self.lock_files()?
            .get(name)
            .cloned()
            .ok_or_else(|| VizError::FileNotFound(name.to_string()))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        validate_file_name(name)?;
        self.lock_files()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| VizError::FileNotFound(name.to_string()))
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let files = self.lock_files()?;
        let mut entries: Vec<FileEntry> = files
            .iter()
            .map(|(name, data)| FileEntry {
                name: name.clone(),
                size: data.len() as u64,
            })
            .collect();
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
