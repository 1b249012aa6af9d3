//! ffviz - ffmpeg command visualizer
//!
//! Builds ffmpeg command lines from trim and codec settings, lets them be
//! edited by hand, and runs them through ffmpeg (or an in-memory engine) to
//! produce a preview of the transcoded output.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ffviz::cli::{Args, Commands, ConfigAction, SettingsAction, SettingsArgs, TimeAction};
use ffviz::command::CommandSynthesizer;
use ffviz::config::Config;
use ffviz::engine::probe_duration;
use ffviz::processor::{user_message, ProcessingEvent, Processor};
use ffviz::session::Session;
use ffviz::settings::{options, AudioCodec, SettingsUpdate, VideoCodec};
use ffviz::store::{JsonFileStore, SettingsStore};
use ffviz::timecode::{format_time, format_time_flexible, parse_time_flexible};
use ffviz::workflow::{write_output, Workflow};

const DEFAULT_CONFIG_FILE: &str = "ffviz.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Command { input, settings, tokens } => {
            print_command(&config, &input, &settings, tokens).await?;
        }
        Commands::Process { input, settings, command, simulate, output } => {
            process_once(config, &input, &settings, command.as_deref(), simulate, output).await?;
        }
        Commands::Interactive { input, duration, simulate } => {
            let duration = SettingsArgs { duration, ..Default::default() }.duration_seconds()?;
            interactive(config, &input, duration, simulate).await?;
        }
        Commands::Settings { action } => {
            let store = JsonFileStore::new(&config.storage.settings_path);
            match action {
                SettingsAction::Show => match store.load() {
                    Some(saved) => println!("{}", serde_json::to_string_pretty(&saved)?),
                    None => println!("No saved settings in {}", store.path().display()),
                },
                SettingsAction::Clear => {
                    store.clear()?;
                    println!("Saved settings cleared");
                }
            }
        }
        Commands::Time { action } => match action {
            TimeAction::Format { seconds } => {
                println!("{}", format_time(seconds));
                println!("{}", format_time_flexible(seconds));
            }
            TimeAction::Parse { text } => match parse_time_flexible(&text) {
                Some(seconds) => println!("{}", seconds),
                None => anyhow::bail!("Unrecognized time: {}", text),
            },
        },
        Commands::Options => print_options(),
        Commands::Config { action } => match action {
            ConfigAction::Init { path } => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                if path.exists() {
                    anyhow::bail!("{} already exists", path.display());
                }
                Config::default().save_to_file(&path)?;
                println!("Wrote default configuration to {}", path.display());
            }
        },
    }

    Ok(())
}

/// Print the command for `input` without touching the engine.
async fn print_command(config: &Config, input: &Path, flags: &SettingsArgs, tokens: bool) -> Result<()> {
    let store = JsonFileStore::new(&config.storage.settings_path);
    let mut session = Session::new(store.load());
    session.load_video(input, Vec::new());

    let duration = match flags.duration_seconds()? {
        Some(duration) => Some(duration),
        None if input.exists() => match probe_duration(&config.engine.probe_path, input).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Could not probe duration: {}", e);
                None
            }
        },
        None => None,
    };
    match duration {
        Some(duration) => {
            session.set_duration(duration);
        }
        None => warn!("Media duration unknown; trim flags have no effect"),
    }
    for update in flags.updates()? {
        session.update(update);
    }

    println!("{}", session.command());
    if tokens {
        let settings = session.settings();
        println!();
        println!("-i");
        println!("{}", config.processing.input_name);
        for token in CommandSynthesizer::options(settings) {
            println!("{}", token);
        }
        println!("{}", settings.resolved_output_name(session.file_name()));
    }
    Ok(())
}

async fn open_workflow(
    config: Config,
    input: &Path,
    duration: Option<f64>,
    simulate: bool,
) -> Result<Workflow> {
    let mut workflow = Workflow::from_config(config, simulate)?;
    workflow
        .open_video(input, duration)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    Ok(workflow)
}

async fn process_once(
    mut config: Config,
    input: &Path,
    flags: &SettingsArgs,
    command: Option<&str>,
    simulate: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    config.processing.auto_process = false;
    let mut workflow = open_workflow(config, input, flags.duration_seconds()?, simulate).await?;

    for update in flags.updates()? {
        workflow.overlay(update);
    }
    if let Some(command) = command {
        workflow.commit_edit(command)?;
    }

    println!("{}", workflow.session().command());
    if let Some(warning) = workflow.session().warning() {
        println!("Warning: {}", warning);
    }

    workflow.start_engine().await?;

    let bar = progress_bar()?;
    let progress = spawn_progress(workflow.processor(), bar.clone());
    let result = workflow.process().await;
    progress.abort();
    bar.finish_and_clear();

    match result {
        Ok(processed) => {
            let target = output.unwrap_or_else(|| PathBuf::from(&processed.file_name));
            write_output(&processed, &target).await?;
            println!(
                "Processed {} ({:.2} MB) in {:.1}s",
                target.display(),
                processed.size_mb(),
                processed.elapsed.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", user_message(&e)),
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(1000);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn spawn_progress(processor: &Processor, bar: ProgressBar) -> tokio::task::JoinHandle<()> {
    let mut events = processor.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ProcessingEvent::Started { output_name }) => bar.set_message(output_name),
                Ok(ProcessingEvent::Progress(progress)) => {
                    bar.set_position((progress.ratio * 1000.0) as u64)
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

const INTERACTIVE_HELP: &str = "\
Commands:
  set <field> <value>   change a setting (start, end, mute, vcodec, acodec, vbitrate,
                        abitrate, preset, profile, level, fps, pix-fmt, channels,
                        sample-rate, name, restart)
  show                  print settings and the current command
  edit <command>        replace the command with a hand-edited one
  reset-command         return to the generated command
  process               run the engine now
  auto on|off           toggle processing on settings change
  play | pause          toggle playback state
  seek <time>           move the playback position
  reset-video           forget the video and trim window
  clear-settings        remove saved settings and restore defaults
  help                  show this help
  quit                  leave";

async fn interactive(config: Config, input: &Path, duration: Option<f64>, simulate: bool) -> Result<()> {
    let output_dir = std::env::current_dir()?;
    let mut workflow = open_workflow(config, input, duration, simulate).await?;

    let reporter = spawn_reporter(workflow.processor(), output_dir.clone());
    workflow.start_engine().await?;

    println!("{}", workflow.session().command());
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let outcome: Result<()> = match verb {
            "" => Ok(()),
            "quit" | "exit" => break,
            "help" => {
                println!("{}", INTERACTIVE_HELP);
                Ok(())
            }
            "show" => {
                show_session(&workflow);
                Ok(())
            }
            "set" => match rest.split_once(char::is_whitespace) {
                Some((field, value)) => SettingsUpdate::field(field, value)
                    .and_then(|update| workflow.update(update))
                    .map(|changed| {
                        if changed {
                            println!("{}", workflow.session().command());
                        }
                    })
                    .map_err(Into::into),
                None => Err(anyhow::anyhow!("usage: set <field> <value>")),
            },
            "edit" => workflow.commit_edit(rest).map(|overridden| {
                if overridden {
                    println!("Warning: {}", workflow.session().warning().unwrap_or_default());
                }
            })
            .map_err(Into::into),
            "reset-command" => {
                workflow.reset_command();
                println!("{}", workflow.session().command());
                Ok(())
            }
            "process" => match workflow.process().await {
                // the reporter prints the result
                Ok(_) => Ok(()),
                Err(e) => Err(anyhow::anyhow!(user_message(&e))),
            },
            "auto" => match rest {
                "on" => {
                    workflow.set_auto_process(true);
                    Ok(())
                }
                "off" => {
                    workflow.set_auto_process(false);
                    Ok(())
                }
                _ => Err(anyhow::anyhow!("usage: auto on|off")),
            },
            "play" | "pause" => {
                workflow.set_playing(verb == "play");
                Ok(())
            }
            "seek" => match parse_time_flexible(rest) {
                Some(seconds) => {
                    workflow.seek(seconds);
                    println!("playback:    {}", format_time_flexible(workflow.session().current_time()));
                    Ok(())
                }
                None => Err(anyhow::anyhow!("usage: seek <time>")),
            },
            "reset-video" => workflow.reset_video().map_err(Into::into),
            "clear-settings" => workflow.clear_settings().map(|_| {
                println!("{}", workflow.session().command());
            })
            .map_err(Into::into),
            other => Err(anyhow::anyhow!("Unknown command '{}'; type 'help'", other)),
        };

        if let Err(e) = outcome {
            println!("Error: {}", e);
        }
    }

    workflow.processor().set_auto_process(false);
    reporter.abort();
    Ok(())
}

fn show_session(workflow: &Workflow) {
    let session = workflow.session();
    let s = session.settings();
    println!("file:        {}", if session.file_name().is_empty() { "-" } else { session.file_name() });
    println!(
        "trim:        {} - {} of {}",
        format_time_flexible(s.start_time),
        format_time_flexible(s.end_time),
        format_time_flexible(s.duration)
    );
    println!("playback:    {} ({})", format_time_flexible(session.current_time()),
        if session.is_playing() { "playing" } else { "paused" });
    println!("restart:     {}", s.restart_at_trim_start);
    println!("mute:        {}", s.mute_audio);
    println!("video:       {} bitrate={} preset={} profile={} level={} fps={} pix_fmt={}",
        s.video_codec, s.video_bitrate, s.video_preset, s.video_profile, s.video_level,
        s.video_fps, s.pixel_format);
    println!("audio:       {} bitrate={} channels={} rate={}",
        s.audio_codec, s.audio_bitrate, s.audio_channels, s.audio_sample_rate);
    println!("output:      {}", s.resolved_output_name(session.file_name()));
    let processor = workflow.processor();
    println!(
        "auto:        {}{}{}",
        if processor.auto_process() { "on" } else { "off" },
        if processor.is_processing() { ", processing" } else { "" },
        if processor.is_queued() { ", queued" } else { "" }
    );

    let status = workflow.processor().status();
    if let Some(progress) = status.progress {
        println!("progress:    {:.0}% ({:.1}s)", progress.ratio * 100.0, progress.elapsed_seconds);
    }
    if let Some(error) = status.last_error {
        println!("last error:  {}", error);
    }
    println!();
    println!("{}", session.command());
    if let Some(warning) = session.warning() {
        println!("Warning: {}", warning);
    }
}

/// Print and save every finished invocation.
fn spawn_reporter(processor: &Processor, output_dir: PathBuf) -> tokio::task::JoinHandle<()> {
    let mut events = processor.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ProcessingEvent::Started { output_name }) => {
                    println!("Processing {}...", output_name);
                }
                Ok(ProcessingEvent::Finished(processed)) => {
                    let target = output_dir.join(&processed.file_name);
                    match write_output(&processed, &target).await {
                        Ok(()) => println!(
                            "Processed {} ({:.2} MB) in {:.1}s",
                            target.display(),
                            processed.size_mb(),
                            processed.elapsed.as_secs_f64()
                        ),
                        Err(e) => println!("Error: could not write {}: {}", target.display(), e),
                    }
                }
                Ok(ProcessingEvent::Failed(message)) => println!("Error: {}", message),
                Ok(ProcessingEvent::Progress(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_options() {
    println!("\nVideo codecs:");
    for codec in VideoCodec::ALL {
        println!("  {:<14} {}", codec.as_str(), codec.label());
    }
    println!("\nAudio codecs:");
    for codec in AudioCodec::ALL {
        println!("  {:<14} {}", codec.as_str(), codec.label());
    }
    for (name, table) in options::tables() {
        println!("\n{}:", name);
        for entry in table {
            println!("  {:<14} {}", entry.value, entry.label);
        }
    }
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".ffviz").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "ffviz.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("ffviz.log").display()
    );

    Ok(guard)
}
