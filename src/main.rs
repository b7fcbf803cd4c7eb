//! system-sentinel - periodic sampling, spike/alert detection, event
//! logging, and operator script execution for a single Linux host.

use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::{signal, time::interval};
use tracing::{debug, error, info, Level};

mod cli;
mod collector;
mod config;
mod debounce;
mod detector;
mod logger;
mod rotator;
mod scripts;
mod snapshot;

use cli::{Args, LogLevel};
use collector::Collector;
use config::Config;
use debounce::Debouncer;
use detector::{AlertDetector, SpikeDetector};
use logger::EventLogger;
use rotator::Rotator;
use scripts::ScriptRunner;
use snapshot::Snapshot;

/// Initializes the tracing subsystem with the configured log level.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config: {:#}", e);
            std::process::exit(1);
        }
    };

    if args.check_config {
        println!("Configuration is valid");
        return;
    }

    info!("starting system-sentinel");

    let mut collector = Collector::new(&cfg.interface);
    let spike_detector = SpikeDetector::new(cfg.spikes.clone());
    let alert_detector = AlertDetector::new(cfg.alerts.clone());
    let debouncer = Debouncer::new(cfg.debounce_interval());

    let logger = match EventLogger::new(Path::new(&cfg.log_dir)) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("logger: {:#}", e);
            std::process::exit(1);
        }
    };

    let rotator = Rotator::new(Path::new(&cfg.log_dir), cfg.retention_days).start();

    let runner = Arc::new(ScriptRunner::new(
        Path::new(&cfg.scripts.dir),
        Path::new(&cfg.scripts.env_file),
        cfg.script_timeout(),
    ));

    // Graceful shutdown on SIGINT or SIGTERM.
    let shutdown_signal = async {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT, shutting down");
            }
            _ = terminate => {
                info!("received SIGTERM, shutting down");
            }
        }
    };
    tokio::pin!(shutdown_signal);

    let collection_interval = cfg.collection_interval();
    let mut previous = Snapshot::default();
    let mut last_sample_write: Option<Instant> = None;
    let mut ticker = interval(cfg.sample_interval());

    info!(
        "sampling every {}s on interface {}, logging to {}",
        cfg.sample_interval_sec, cfg.interface, cfg.log_dir
    );

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => break,
            _ = ticker.tick() => {
                let snap = match collector.collect() {
                    Ok(snap) => snap,
                    Err(e) => {
                        error!("metrics collect error: {}", e);
                        continue;
                    }
                };

                let spikes = spike_detector.detect(&snap, &previous);
                if !spikes.is_empty() {
                    debug!("spike detected: {:?}", spikes);
                    if let Err(e) = logger.log_spike(&snap, &spikes) {
                        error!("log spike error: {:#}", e);
                    }
                }

                let alerts = alert_detector.detect(&snap, &previous);
                if !alerts.is_empty() {
                    info!("alert detected: {:?}", alerts);
                    if let Err(e) = logger.log_alert(&snap, &alerts) {
                        error!("log alert error: {:#}", e);
                    }

                    if cfg.scripts.enabled && debouncer.should_execute(&alerts) {
                        let runner = runner.clone();
                        let snap = snap.clone();
                        tokio::spawn(async move {
                            if let Err(e) = runner.execute(&alerts, &snap).await {
                                error!("script execution error: {:#}", e);
                            }
                        });
                    }
                }

                let now = Instant::now();
                let due = last_sample_write
                    .map_or(true, |last| now.duration_since(last) >= collection_interval);
                if due {
                    if let Err(e) = logger.log_sample(&snap) {
                        error!("log sample error: {:#}", e);
                    }
                    last_sample_write = Some(now);
                }

                previous = snap;
            }
        }
    }

    // In-flight script rounds are not awaited; operators expect prompt exit.
    rotator.stop().await;
    info!("system-sentinel stopped");
}
