// Processing orchestration
//
// Decides when the transcoding engine runs and owns its file namespace for
// the duration of one invocation:
// - classify: engine failure categories and user-facing messages
// - delayed: cancellable delayed task used for debouncing
//
// Triggers are manual (`process_now`), one-shot on engine ready
// (`on_engine_ready`) and debounced on settings change (`settings_changed`).
// At most one invocation is in flight at a time.

pub mod classify;
pub mod delayed;

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub use classify::{execution_error, user_message, FailureKind};
pub use delayed::DelayedTask;

use crate::config::ProcessingConfig;
use crate::engine::{validate_file_name, Progress, TranscodeEngine};
use crate::error::{Result, VizError};
use crate::settings::{AudioCodec, Settings, VideoCodec};

pub const OPUS_COPY_WARNING: &str = "Using Opus audio with copied video stream may cause \
compatibility issues. Consider using AAC audio codec for better compatibility.";

/// Everything one invocation needs, captured at trigger time.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingJob {
    #[serde(skip)]
    pub input: Arc<Vec<u8>>,
    /// Option tokens between `-i <input>` and the output name
    pub options: Vec<String>,
    pub output_name: String,
    pub settings: Settings,
}

impl ProcessingJob {
    /// Token list handed to the engine.
    pub fn engine_args(&self, input_name: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.options.len() + 3);
        args.push("-i".to_string());
        args.push(input_name.to_string());
        args.extend(self.options.iter().cloned());
        args.push(self.output_name.clone());
        args
    }

    /// Structural hash of everything except the input bytes.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match serde_json::to_string(self) {
            Ok(json) => json.hash(&mut hasher),
            Err(_) => self.options.hash(&mut hasher),
        }
        hasher.finish()
    }

    /// Reasons a job may not be started at all.
    pub fn validate(&self) -> Result<()> {
        if self.input.is_empty() {
            return Err(VizError::MissingInput);
        }

        let s = &self.settings;
        if !(s.duration > 0.0) {
            return Err(VizError::InvalidTrim("invalid video duration".to_string()));
        }
        if s.start_time >= s.duration {
            return Err(VizError::InvalidTrim(
                "start time is at or beyond video duration".to_string(),
            ));
        }
        if s.end_time <= s.start_time {
            return Err(VizError::InvalidTrim("end time must be after start time".to_string()));
        }
        Ok(())
    }
}

/// Bytes produced by a successful invocation.
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    pub file_name: String,
    pub data: Arc<Vec<u8>>,
    pub elapsed: Duration,
}

impl ProcessedOutput {
    pub fn size_mb(&self) -> f64 {
        self.data.len() as f64 / 1024.0 / 1024.0
    }
}

#[derive(Debug, Clone)]
pub enum ProcessingEvent {
    Started { output_name: String },
    Progress(Progress),
    Finished(ProcessedOutput),
    Failed(String),
}

/// Observable state between and during invocations.
#[derive(Debug, Clone, Default)]
pub struct ProcessorStatus {
    pub progress: Option<Progress>,
    pub last_error: Option<String>,
    pub last_output: Option<ProcessedOutput>,
}

struct Inner {
    engine: Arc<dyn TranscodeEngine>,
    config: ProcessingConfig,
    auto_process: AtomicBool,
    in_flight: AtomicBool,
    queued: AtomicBool,
    status: Mutex<ProcessorStatus>,
    last_fingerprint: Mutex<Option<u64>>,
    debounce: DelayedTask,
    ready_task: DelayedTask,
    events: broadcast::Sender<ProcessingEvent>,
}

/// Releases the in-flight flag however the invocation ends.
/// Clears a busy flag when the owning scope ends, including on cancellation.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct Processor {
    inner: Arc<Inner>,
}

impl Processor {
    pub fn new(engine: Arc<dyn TranscodeEngine>, config: ProcessingConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                engine,
                auto_process: AtomicBool::new(config.auto_process),
                config,
                in_flight: AtomicBool::new(false),
                queued: AtomicBool::new(false),
                status: Mutex::new(ProcessorStatus::default()),
                last_fingerprint: Mutex::new(None),
                debounce: DelayedTask::new(),
                ready_task: DelayedTask::new(),
                events,
            }),
        }
    }

    pub fn engine(&self) -> &Arc<dyn TranscodeEngine> {
        &self.inner.engine
    }

    pub fn input_name(&self) -> &str {
        &self.inner.config.input_name
    }

    pub fn auto_process(&self) -> bool {
        self.inner.auto_process.load(Ordering::SeqCst)
    }

    /// Turning auto-processing off drops any pending debounced run.
    pub fn set_auto_process(&self, enabled: bool) {
        self.inner.auto_process.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.inner.debounce.cancel();
            self.inner.ready_task.cancel();
        }
        info!("Auto-process {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_processing(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_queued(&self) -> bool {
        self.inner.queued.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ProcessorStatus {
        self.inner.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Drop the last result and error, e.g. when the video is reset.
    pub fn clear_results(&self) {
        self.inner.debounce.cancel();
        self.inner.ready_task.cancel();
        if let Ok(mut status) = self.inner.status.lock() {
            status.last_error = None;
            status.last_output = None;
        }
        if let Ok(mut last) = self.inner.last_fingerprint.lock() {
            *last = None;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingEvent> {
        self.inner.events.subscribe()
    }

    /// Manual trigger: run `job` right away.
    pub async fn process_now(&self, job: ProcessingJob) -> Result<ProcessedOutput> {
        self.inner.clone().process(job).await
    }

    /// The engine became ready. With a pending input and no result yet,
    /// run once after the configured delay.
    pub fn on_engine_ready(&self, job: Option<ProcessingJob>) {
        let Some(job) = job else { return };
        if !self.auto_process() || !self.inner.engine.is_ready() {
            return;
        }
        if self.status().last_output.is_some() || self.is_processing() {
            return;
        }

        debug!("Engine ready with pending input; scheduling first run");
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .ready_task
            .schedule(self.inner.config.ready_delay(), async move {
                if let Some(inner) = weak.upgrade() {
                    if !inner.in_flight.load(Ordering::SeqCst) {
                        let _ = inner.process(job).await;
                    }
                }
            });
    }

    /// Settings changed. A job whose fingerprint differs from the last one
    /// seen (re)starts the debounce timer; the first one only sets the
    /// baseline.
    pub fn settings_changed(&self, job: ProcessingJob) {
        if !self.auto_process() {
            return;
        }

        let fingerprint = job.fingerprint();
        let previous = match self.inner.last_fingerprint.lock() {
            Ok(mut last) => last.replace(fingerprint),
            Err(_) => return,
        };
        match previous {
            Some(previous) if previous != fingerprint => {}
            _ => return,
        }
        if !self.inner.engine.is_ready() || job.input.is_empty() {
            return;
        }

        debug!("Settings changed; auto-process in {:?}", self.inner.config.debounce());
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .debounce
            .schedule(self.inner.config.debounce(), Inner::debounced(weak, job));
    }

    /// Wait for a pending debounced or ready-triggered run to start and finish.
    pub async fn wait_idle(&self) {
        while self.inner.debounce.is_pending()
            || self.inner.ready_task.is_pending()
            || self.is_processing()
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Inner {
    async fn debounced(weak: Weak<Inner>, job: ProcessingJob) {
        let Some(inner) = weak.upgrade() else { return };
        if !inner.auto_process.load(Ordering::SeqCst)
            || !inner.engine.is_ready()
            || inner.in_flight.load(Ordering::SeqCst)
            || inner.queued.swap(true, Ordering::SeqCst)
        {
            debug!("Skipping auto-process: disabled, not ready or already running");
            return;
        }

        let _queued = FlagGuard(&inner.queued);
        let _ = inner.clone().process(job).await;
    }

    fn update_status(&self, f: impl FnOnce(&mut ProcessorStatus)) {
        if let Ok(mut status) = self.status.lock() {
            f(&mut status);
        }
    }

    async fn process(self: Arc<Self>, job: ProcessingJob) -> Result<ProcessedOutput> {
        if !self.engine.is_ready() {
            warn!("Cannot process: engine not ready");
            return Err(VizError::EngineNotReady);
        }
        if let Err(e) = job.validate() {
            warn!("Cannot process: {}", e);
            return Err(e);
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Cannot process: another invocation is in flight");
            return Err(VizError::Busy);
        }
        let _guard = FlagGuard(&self.in_flight);

        if job.settings.audio_codec == AudioCodec::Libopus
            && job.settings.video_codec == VideoCodec::Copy
        {
            warn!("{}", OPUS_COPY_WARNING);
        }

        info!(
            "Processing {} (start={} end={} duration={} video={} audio={})",
            job.output_name,
            job.settings.start_time,
            job.settings.end_time,
            job.settings.duration,
            job.settings.video_codec,
            job.settings.audio_codec
        );
        let _ = self.events.send(ProcessingEvent::Started {
            output_name: job.output_name.clone(),
        });

        let forwarder = self.forward_progress();
        let started = Instant::now();
        let result = self.run(&job).await;
        forwarder.abort();

        let result = result.map(|data| ProcessedOutput {
            file_name: job.output_name.clone(),
            data: Arc::new(data),
            elapsed: started.elapsed(),
        });

        match &result {
            Ok(output) => {
                info!(
                    "Processed {} ({:.2} MB in {:.1}s)",
                    output.file_name,
                    output.size_mb(),
                    output.elapsed.as_secs_f64()
                );
                self.update_status(|s| {
                    s.progress = None;
                    s.last_error = None;
                    s.last_output = Some(output.clone());
                });
                let _ = self.events.send(ProcessingEvent::Finished(output.clone()));
            }
            Err(e) => {
                let message = user_message(e);
                error!("Processing failed: {}", e);
                self.update_status(|s| {
                    s.progress = None;
                    s.last_error = Some(message.clone());
                });
                let _ = self.events.send(ProcessingEvent::Failed(message));
            }
        }

        result
    }

    fn forward_progress(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut rx = self.engine.progress();
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let progress = *rx.borrow_and_update();
                let Some(inner) = weak.upgrade() else { break };
                inner.update_status(|s| s.progress = progress);
                if let Some(progress) = progress {
                    let _ = inner.events.send(ProcessingEvent::Progress(progress));
                }
            }
        })
    }

    /// One invocation against the engine file namespace.
    async fn run(&self, job: &ProcessingJob) -> Result<Vec<u8>> {
        let input_name = self.config.input_name.as_str();
        let output_name = job.output_name.as_str();
        validate_file_name(output_name)?;

        self.remove_stale(&[input_name, output_name]).await;

        self.engine.write_file(input_name, &job.input).await?;
        match self.engine.list_files().await {
            Ok(files) if files.iter().any(|f| f.name == input_name) => {
                debug!("Input staged as {}", input_name);
            }
            Ok(_) => warn!("Input file {} not listed after write", input_name),
            Err(e) => warn!("Could not verify input file: {}", e),
        }

        let args = job.engine_args(input_name);
        debug!("Engine arguments: {:?}", args);

        let result = match self.engine.execute(&args).await {
            Ok(()) => self.collect_output(output_name).await,
            Err(VizError::EngineFailed(raw)) => Err(execution_error(&raw)),
            Err(e) => Err(e),
        };

        self.cleanup(&[input_name, output_name]).await;
        result
    }

    async fn collect_output(&self, output_name: &str) -> Result<Vec<u8>> {
        match self.engine.list_files().await {
            Ok(files) if !files.iter().any(|f| f.name == output_name) => {
                return Err(VizError::OutputNotCreated(output_name.to_string()));
            }
            Ok(_) => {}
            Err(e) => warn!("Could not verify output file: {}", e),
        }

        match self.engine.read_file(output_name).await {
            Ok(data) if !data.is_empty() => Ok(data),
            Ok(_) => Err(VizError::EmptyOutput(output_name.to_string())),
            Err(e) => {
                warn!("Failed to read output file {}: {}", output_name, e);
                Err(VizError::EmptyOutput(output_name.to_string()))
            }
        }
    }

    async fn remove_stale(&self, names: &[&str]) {
        let files = match self.engine.list_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list engine files: {}", e);
                return;
            }
        };

        for file in files.iter().filter(|f| names.contains(&f.name.as_str())) {
            debug!("Removing stale file {}", file.name);
            if let Err(e) = self.engine.delete_file(&file.name).await {
                warn!("Could not delete stale file {}: {}", file.name, e);
            }
        }
    }

    async fn cleanup(&self, names: &[&str]) {
        for name in names {
            if let Err(e) = self.engine.delete_file(name).await {
                debug!("Cleanup of {} skipped: {}", name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSynthesizer;
    use crate::engine::{FileEntry, MockTranscodeEngine, SimulatedBehavior, SimulatedEngine};
    use crate::settings::SettingsUpdate;
    use tokio::sync::watch;

    fn settings(duration: f64) -> Settings {
        let mut s = Settings::default();
        s.apply(SettingsUpdate {
            duration: Some(duration),
            end_time: Some(duration),
            ..Default::default()
        });
        s
    }

    fn job(settings: Settings) -> ProcessingJob {
        ProcessingJob {
            input: Arc::new(b"source video".to_vec()),
            options: CommandSynthesizer::options(&settings),
            output_name: "clip_processed.mp4".to_string(),
            settings,
        }
    }

    fn config() -> ProcessingConfig {
        ProcessingConfig {
            auto_process: true,
            debounce_ms: 100,
            ready_delay_ms: 50,
            ..ProcessingConfig::default()
        }
    }

    async fn ready_engine() -> Arc<SimulatedEngine> {
        let engine = Arc::new(SimulatedEngine::new());
        engine.load().await.unwrap();
        engine
    }

    #[test]
    fn test_engine_args_and_validation() {
        let j = job(settings(20.0));
        let args = j.engine_args("input");
        assert_eq!(&args[..2], &["-i".to_string(), "input".to_string()]);
        assert_eq!(args.last().map(String::as_str), Some("clip_processed.mp4"));
        assert!(j.validate().is_ok());

        let mut bad = job(settings(0.0));
        assert!(matches!(bad.validate(), Err(VizError::InvalidTrim(_))));
        bad.settings = settings(20.0);
        bad.settings.apply(SettingsUpdate { start_time: Some(20.0), ..Default::default() });
        assert!(matches!(bad.validate(), Err(VizError::InvalidTrim(_))));

        let mut empty = job(settings(20.0));
        empty.input = Arc::new(Vec::new());
        assert!(matches!(empty.validate(), Err(VizError::MissingInput)));
    }

    #[tokio::test]
    async fn test_process_now_success_cleans_up() {
        let engine = ready_engine().await;
        let processor = Processor::new(engine.clone(), config());

        let output = processor.process_now(job(settings(20.0))).await.unwrap();

        assert_eq!(output.data.as_slice(), b"source video");
        assert_eq!(output.file_name, "clip_processed.mp4");
        assert!(engine.list_files().await.unwrap().is_empty());

        let status = processor.status();
        assert!(status.progress.is_none());
        assert!(status.last_error.is_none());
        assert!(status.last_output.is_some());
        assert!(!processor.is_processing());

        let invocation = &engine.invocations()[0];
        assert_eq!(invocation[..2], ["-i", "input"]);
        assert!(invocation.contains(&"-c:v".to_string()));
    }

    #[tokio::test]
    async fn test_manual_trigger_rejections() {
        let engine = Arc::new(SimulatedEngine::new());
        let processor = Processor::new(engine.clone(), config());

        let result = processor.process_now(job(settings(20.0))).await;
        assert!(matches!(result, Err(VizError::EngineNotReady)));

        engine.load().await.unwrap();
        let mut reversed = settings(20.0);
        reversed.start_time = 10.0;
        reversed.end_time = 5.0;
        let result = processor.process_now(job(reversed)).await;
        assert!(matches!(result, Err(VizError::InvalidTrim(_))));

        assert!(engine.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_post_condition_failures() {
        let engine = ready_engine().await;
        let processor = Processor::new(engine.clone(), config());

        engine.set_behavior(SimulatedBehavior::NoOutput);
        let result = processor.process_now(job(settings(20.0))).await;
        assert!(matches!(result, Err(VizError::OutputNotCreated(_))));
        assert_eq!(
            processor.status().last_error.as_deref(),
            Some("Video processing failed. Please check your settings and try again.")
        );

        engine.set_behavior(SimulatedBehavior::EmptyOutput);
        let result = processor.process_now(job(settings(20.0))).await;
        assert!(matches!(result, Err(VizError::EmptyOutput(_))));

        assert!(engine.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_is_classified_once() {
        let engine = ready_engine().await;
        engine.set_behavior(SimulatedBehavior::Fail(
            "Error while opening encoder: Invalid argument".to_string(),
        ));
        let processor = Processor::new(engine.clone(), config());
        let mut events = processor.subscribe();

        let result = processor.process_now(job(settings(20.0))).await;
        assert!(matches!(
            result,
            Err(VizError::Execution { kind: FailureKind::InvalidArgument, .. })
        ));
        assert_eq!(engine.invocations().len(), 1);

        assert!(matches!(events.recv().await.unwrap(), ProcessingEvent::Started { .. }));
        loop {
            match events.recv().await.unwrap() {
                ProcessingEvent::Failed(message) => {
                    assert!(message.contains("Invalid parameters provided"));
                    break;
                }
                ProcessingEvent::Progress(_) => continue,
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_cleanup_failures_are_not_fatal() {
        let mut engine = MockTranscodeEngine::new();
        let (_progress_tx, progress_rx) = watch::channel(None);
        let (log_tx, _) = broadcast::channel(4);

        engine.expect_is_ready().return_const(true);
        engine.expect_progress().returning(move || progress_rx.clone());
        engine.expect_subscribe_logs().returning(move || log_tx.subscribe());
        engine.expect_list_files().returning(|| {
            Ok(vec![
                FileEntry { name: "input".to_string(), size: 1 },
                FileEntry { name: "clip_processed.mp4".to_string(), size: 1 },
            ])
        });
        engine
            .expect_delete_file()
            .times(4)
            .returning(|name| Err(VizError::FileNotFound(name.to_string())));
        engine.expect_write_file().times(1).returning(|_, _| Ok(()));
        engine.expect_execute().times(1).returning(|_| Ok(()));
        engine.expect_read_file().returning(|_| Ok(b"encoded".to_vec()));

        let processor = Processor::new(Arc::new(engine), config());
        let output = processor.process_now(job(settings(20.0))).await.unwrap();
        assert_eq!(output.data.as_slice(), b"encoded");
    }

    #[tokio::test]
    async fn test_second_trigger_while_in_flight_is_rejected() {
        let engine = Arc::new(SimulatedEngine::new().with_latency(Duration::from_millis(200)));
        engine.load().await.unwrap();
        let processor = Processor::new(engine.clone(), config());

        let first = {
            let processor = processor.clone();
            tokio::spawn(async move { processor.process_now(job(settings(20.0))).await })
        };
        while !processor.is_processing() {
            tokio::task::yield_now().await;
        }

        let second = processor.process_now(job(settings(20.0))).await;
        assert!(matches!(second, Err(VizError::Busy)));
        assert!(first.await.unwrap().is_ok());
        assert_eq!(engine.invocations().len(), 1);
        assert_eq!(engine.max_concurrency(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_runs_once_with_last_settings() {
        let engine = ready_engine().await;
        let processor = Processor::new(engine.clone(), config());

        let mut current = settings(20.0);
        processor.settings_changed(job(current.clone()));

        for bitrate in ["1M", "2M", "3M", "4M", "5M"] {
            current.apply(SettingsUpdate {
                video_codec: Some(VideoCodec::Libx264),
                video_bitrate: Some(bitrate.to_string()),
                ..Default::default()
            });
            processor.settings_changed(job(current.clone()));
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert!(engine.invocations().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        processor.wait_idle().await;

        let invocations = engine.invocations();
        assert_eq!(invocations.len(), 1);
        assert!(invocations[0].contains(&"5M".to_string()));
        assert!(!invocations[0].contains(&"4M".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_settings_do_not_schedule() {
        let engine = ready_engine().await;
        let processor = Processor::new(engine.clone(), config());

        processor.settings_changed(job(settings(20.0)));
        processor.settings_changed(job(settings(20.0)));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(engine.invocations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_process_on_ready() {
        let engine = ready_engine().await;
        let processor = Processor::new(engine.clone(), config());

        processor.on_engine_ready(Some(job(settings(20.0))));
        tokio::time::sleep(Duration::from_millis(200)).await;
        processor.wait_idle().await;
        assert_eq!(engine.invocations().len(), 1);

        // a result exists now
        processor.on_engine_ready(Some(job(settings(20.0))));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.invocations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_auto_process_never_runs() {
        let engine = ready_engine().await;
        let processor = Processor::new(engine.clone(), config());
        processor.set_auto_process(false);

        processor.on_engine_ready(Some(job(settings(20.0))));
        processor.settings_changed(job(settings(20.0)));
        processor.settings_changed(job(settings(10.0)));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(engine.invocations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_auto_run_does_not_interrupt_it() {
        let engine = Arc::new(SimulatedEngine::new().with_latency(Duration::from_millis(1000)));
        engine.load().await.unwrap();
        let processor = Processor::new(engine.clone(), config());

        let mut current = settings(20.0);
        processor.settings_changed(job(current.clone()));
        current.apply(SettingsUpdate { mute_audio: Some(true), ..Default::default() });
        processor.settings_changed(job(current.clone()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(processor.is_processing());
        assert_eq!(engine.invocations().len(), 1);

        current.apply(SettingsUpdate { video_bitrate: Some("2M".to_string()), ..Default::default() });
        processor.settings_changed(job(current.clone()));
        processor.wait_idle().await;

        let status = processor.status();
        assert!(status.last_output.is_some());
        assert!(status.last_error.is_none());
        assert!(!processor.is_processing());
        assert!(!processor.is_queued());
        assert!(engine.list_files().await.unwrap().is_empty());
        assert_eq!(engine.invocations().len(), 1);

        current.apply(SettingsUpdate {
            video_codec: Some(VideoCodec::Libx264),
            video_bitrate: Some("3M".to_string()),
            ..Default::default()
        });
        processor.settings_changed(job(current.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        processor.wait_idle().await;

        let invocations = engine.invocations();
        assert_eq!(invocations.len(), 2);
        assert!(invocations[1].contains(&"3M".to_string()));
    }
}
