use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod mcp_server;

use cli::{Cli, Transport};
use gan_core::CompletionReason;
use gan_engine::{DiskContextPackBuilder, EngineConfig, GanEngine};
use gan_evaluator::CompletionTier;

/// Validation guarantees exactly 3 tiers in order; their reasons are fixed
/// by position, matching `EvaluatorConfig::default()`'s own ordering.
fn completion_tiers(configured: &[gan_config::TierConfig]) -> [CompletionTier; 3] {
    let reasons = [
        CompletionReason::Score95At10,
        CompletionReason::Score90At15,
        CompletionReason::Score85At20,
    ];
    let defaults = gan_evaluator::EvaluatorConfig::default().tiers;
    std::array::from_fn(|i| match configured.get(i) {
        Some(t) => CompletionTier {
            score: t.score as u32,
            max_loops: t.max_loops,
            reason: reasons[i],
        },
        None => defaults[i].clone(),
    })
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            cli.log_level
                .clone()
                .map(tracing_subscriber::EnvFilter::new)
                .unwrap_or_else(tracing_subscriber::EnvFilter::from_default_env),
        )
        .try_init()
        .ok();

    let cwd = match &cli.cd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("determining current directory")?,
    };

    let mut config = gan_config::load(&cwd).context("loading gan-audit configuration")?;
    if let Some(state_dir) = &cli.state_dir {
        config.state_directory = state_dir.clone();
    }
    if let Some(judge) = &cli.judge {
        config.judge_executable = judge.clone();
    }

    let problems = gan_config::validate_config(&config);
    if !problems.is_empty() {
        for problem in &problems {
            tracing::warn!(problem = %problem, "invalid configuration");
        }
        anyhow::bail!("configuration is invalid: {}", problems.join("; "));
    }

    let engine_config = EngineConfig {
        enable_audit: config.enable_audit,
        audit_timeout: Duration::from_millis(config.audit_timeout_millis),
        state_directory: if config.state_directory.is_relative() {
            cwd.join(&config.state_directory)
        } else {
            config.state_directory.clone()
        },
        judge_executable: config.judge_executable.clone(),
        max_concurrent_audits: config.max_concurrent_audits,
        cache_capacity: 256,
        cache_ttl: Duration::from_secs(3600),
        context_call_timeout: Duration::from_secs(10),
        history: gan_session::history::HistoryConfig {
            max_iterations_in_memory: config.max_iterations_in_memory,
            compression_age: Duration::from_millis(config.compression_age_millis),
            compression_threshold_bytes: config.compression_threshold_bytes,
            max_memory_usage_bytes: config.max_memory_usage_bytes,
        },
        evaluator: gan_evaluator::EvaluatorConfig {
            stagnation_similarity_threshold: config.stagnation_similarity_threshold,
            stagnation_start_loop: config.stagnation_start_loop,
            hard_stop_loops: config.hard_stop_loops,
            tiers: completion_tiers(&config.completion_tiers),
        },
    };

    let builder = Arc::new(DiskContextPackBuilder::new(cwd.clone()));
    let engine = Arc::new(GanEngine::new(engine_config, builder)?);

    let sweep_engine = engine.clone();
    let max_session_age = Duration::from_millis(config.max_session_age_millis);
    let sweep_interval = Duration::from_millis(config.sweep_interval_millis);
    let sweep_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_engine.sweep(max_session_age).await {
                tracing::warn!(error = %e, "background sweep failed");
            }
        }
    });

    match cli.transport {
        Transport::Stdio => {}
    }
    let server = tokio::spawn(mcp_server::run(engine));

    tokio::select! {
        result = server => {
            sweep_task.abort();
            result.context("transport task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
            sweep_task.abort();
        }
    }

    Ok(())
}
