//! Service assembly and lifecycle: builds the pipeline from config, runs it until a stop signal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::app::logging::{filter_for_level, reload_level};
use crate::config::persistence::load_config;
use crate::config::types::ServiceConfig;
use crate::pipeline::{LogObserver, Publisher, Reducer, Sampler, Scheduler, StateFileObserver, StopOutcome};
use crate::sensor::{SourceRouter, ValueSource};

/// Wire sampler, reducer and publisher together. Observers are registered by the caller.
pub fn build_scheduler(config: &ServiceConfig, source: Arc<dyn ValueSource>) -> Arc<Scheduler> {
    let sampler = Sampler::new(source, config.sources.clone(), config.polling.source_timeout());
    let reducer: Arc<dyn Reducer> = Arc::new(config.aggregation.policy);
    let publisher = Arc::new(Publisher::new(
        config.publishing.unavailable_policy,
        config.publishing.change_epsilon,
    ));

    Arc::new(Scheduler::new(
        sampler,
        reducer,
        publisher,
        config.polling.interval(),
        config.polling.drain_timeout(),
    ))
}

/// `--run`: tick until SIGINT/SIGTERM. Fails only at startup.
pub async fn run_service(config: ServiceConfig, config_path: PathBuf) -> Result<()> {
    let scheduler = build_scheduler(&config, Arc::new(SourceRouter::default()));
    let publisher = Arc::clone(scheduler.publisher());

    // The state file is the publishing surface; not being able to write it is fatal
    let state_file = Arc::new(StateFileObserver::new(&config.publishing.state_file, config.sensor.clone()));
    state_file
        .initialize(&publisher.current_value())
        .await
        .context("Cannot publish virtual sensor state")?;

    publisher.register_observer(state_file).await;
    publisher
        .register_observer(Arc::new(LogObserver::new(config.sensor.clone())))
        .await;

    info!(
        "Virtual sensor {} ({:?} of {} sources, {:?})",
        config.sensor.object_path,
        config.aggregation.policy,
        config.sources.len(),
        config.sensor.unit
    );

    scheduler.start().await?;

    #[cfg(unix)]
    let reload_task = tokio::spawn(reload_on_sighup(config_path));
    #[cfg(not(unix))]
    let _ = config_path;

    wait_for_shutdown().await;

    match scheduler.stop().await {
        StopOutcome::Abandoned => warn!("Shutdown abandoned an in-flight tick"),
        _ => info!("Shutdown complete"),
    }
    debug!(
        "Scheduler {:?} after {} published changes",
        scheduler.state(),
        publisher.current_value().sequence
    );

    #[cfg(unix)]
    reload_task.abort();

    Ok(())
}

/// `--once`: a single tick without observers, printed to stdout.
pub async fn run_once(config: &ServiceConfig) -> Result<()> {
    let scheduler = build_scheduler(config, Arc::new(SourceRouter::default()));
    let reading = scheduler.run_tick().await;

    let name = config.sensor.name();
    match reading.value() {
        Some(value) => println!(
            "{}: {:.2} {} ({} of {} sources)",
            name,
            value,
            config.sensor.unit.symbol(),
            reading.valid_sources(),
            config.sources.len()
        ),
        None => println!("{}: unavailable (0 of {} sources)", name, config.sources.len()),
    }
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Shutdown signal received (Ctrl+C)"),
                    _ = sigterm.recv() => info!("Shutdown signal received (SIGTERM)"),
                }
                return;
            }
            Err(e) => warn!("Cannot install SIGTERM handler: {}", e),
        }
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received (Ctrl+C)");
    }
}

/// Re-read `logging.log_level` from the config file on every SIGHUP.
#[cfg(unix)]
async fn reload_on_sighup(config_path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Cannot install SIGHUP handler: {}", e);
            return;
        }
    };

    while sighup.recv().await.is_some() {
        info!("SIGHUP received, reloading log level configuration");
        reload_log_level(&config_path).await;
    }
}

#[cfg(unix)]
async fn reload_log_level(config_path: &Path) {
    let config = match load_config(config_path).await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to reload config: {:#}", e);
            return;
        }
    };

    let level = config.logging.log_level;
    let Some(filter) = filter_for_level(&level) else {
        error!("Invalid log level '{}' in config, keeping current level", level);
        return;
    };

    match reload_level(filter) {
        Ok(_) => info!("Log level reloaded: {}", level.to_uppercase()),
        Err(e) => error!("Failed to reload log level: {}", e),
    }
}
