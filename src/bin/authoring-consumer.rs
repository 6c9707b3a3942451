// Copyright (c) 2025 - Cowboy AI, Inc.
//! Survey Authoring Consumer
//!
//! Pulls question and answer commands from JetStream, applies them to the
//! survey and answer buckets, and publishes the resulting snapshots:
//! - Commands → AUTHORING_COMMANDS → MutationConsumer → KV buckets → AUTHORING_EVENTS
//!
//! One command loop runs per command stream partition, all sharing the same
//! stores and notifier.
//!
//! Run with: cargo run --bin authoring-consumer
//!
//! Prerequisites:
//! 1. NATS server with JetStream enabled (default: localhost:4222)
//! 2. Optional overrides via `AUTHORING_*` environment variables

use anyhow::{Context, Result};
use std::sync::Arc;
use survey_authoring::{
    jetstream::{create_stream, ensure_pull_consumer},
    pipeline::{CommandRunner, MutationConsumer, NatsNotifier, RunStats},
    store::{KvAnswerStore, KvSurveyStore},
    AuthoringConfig, NatsClient,
};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting Survey Authoring Consumer");

    let config = AuthoringConfig::from_env().context("Invalid configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - NATS: {:?}", config.nats.servers);
    info!("  - Command stream: {}", config.command_stream.stream_name);
    info!("  - Event stream: {}", config.event_stream.stream_name);
    info!("  - Consumer: {}", config.consumer.name);
    info!("  - Partitions: {:?}", config.command_stream.partitions);
    info!("  - Buckets: {} / {}", config.survey_bucket, config.answer_bucket);
    info!("  - Answer retention: {}", config.pipeline.answer_retention);

    info!("🔌 Connecting to NATS");
    let client = NatsClient::connect(&config.nats)
        .await
        .context("Failed to connect to NATS")?;
    let jetstream = client.jetstream().clone();

    info!("📡 Setting up streams");
    let commands = create_stream(&jetstream, config.command_stream.clone())
        .await
        .context("Failed to set up command stream")?;
    create_stream(&jetstream, config.event_stream.clone())
        .await
        .context("Failed to set up event stream")?;

    info!("🗄️ Opening key-value buckets");
    let surveys = KvSurveyStore::open(&jetstream, &config.survey_bucket)
        .await
        .context("Failed to open survey bucket")?;
    let answers = KvAnswerStore::open(&jetstream, &config.answer_bucket)
        .await
        .context("Failed to open answer bucket")?;

    let pipeline = MutationConsumer::new(
        Arc::new(surveys),
        Arc::new(answers),
        Arc::new(NatsNotifier::new(jetstream)),
        config.pipeline,
    );

    let consumer_configs: Vec<_> = match config.command_stream.partitions {
        Some(_) => config
            .command_stream
            .partition_numbers()
            .map(|partition| config.consumer.for_partition(partition))
            .collect(),
        None => vec![config.consumer.clone()],
    };

    let mut runners = JoinSet::new();
    for consumer_config in consumer_configs {
        info!("👂 Setting up consumer: {}", consumer_config.name);
        let consumer = ensure_pull_consumer(&commands, &consumer_config)
            .await
            .with_context(|| format!("Failed to set up consumer {}", consumer_config.name))?;

        let pipeline = pipeline.clone();
        runners.spawn(async move {
            let stats = CommandRunner::new(consumer, pipeline).run().await;
            (consumer_config.name, stats)
        });
    }

    info!("🎧 Starting command consumption on {} consumers...", runners.len());
    let mut total = RunStats::default();
    while let Some(joined) = runners.join_next().await {
        let (name, stats) = joined.context("Command loop panicked")?;
        match stats {
            Ok(stats) => {
                warn!(
                    "⚠️ Consumer {} stopped: {} stored, {} rejected, {} failed, {} terminated",
                    name, stats.stored, stats.rejected, stats.failed, stats.terminated
                );
                total.stored += stats.stored;
                total.rejected += stats.rejected;
                total.failed += stats.failed;
                total.terminated += stats.terminated;
            }
            Err(e) => {
                error!("❌ Consumer {} failed: {}", name, e);
                runners.abort_all();
                return Err(e).context("Command loop failed");
            }
        }
    }

    warn!("⚠️ All consumers stopped after {} commands", total.total());
    Ok(())
}
