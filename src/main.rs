// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use futures::future::join_all;
use harvest_sentinel::app::config::GlobalSettings;
use harvest_sentinel::app::logging::setup_logging;
use harvest_sentinel::domain::error::AppError;
use harvest_sentinel::infrastructure::data::metadata_cache::MetadataCache;
use harvest_sentinel::infrastructure::network::discord::{
    DiscordChannel, LogSink, ReportGroup, ReportSink,
};
use harvest_sentinel::infrastructure::network::explorer::{EtherscanClient, TransactionSource};
use harvest_sentinel::infrastructure::network::price_feed::{PriceFeed, PriceSource};
use harvest_sentinel::infrastructure::network::provider::{ConnectionFactory, RpcChainReader};
use harvest_sentinel::services::pipeline::{ChainRuntime, Pipeline};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about = "harvest sentinel")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Run the pipeline once and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Log payloads instead of posting them to Discord
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Resolve and persist strategy metadata for every chain, then exit
    #[arg(long, default_value_t = false)]
    prefetch_metadata: bool,
}

/// Pipeline, output channel and cache, driven on a fixed interval.
struct Service<'a, T: TransactionSource, P: PriceSource, S: ReportSink> {
    pipeline: &'a Pipeline<'a, T, P>,
    chains: &'a [ChainRuntime<RpcChainReader>],
    cache: &'a MetadataCache,
    sink: &'a S,
}

impl<T: TransactionSource, P: PriceSource, S: ReportSink> Service<'_, T, P, S> {
    async fn run_once(&self) {
        let started = Instant::now();
        let report = self.pipeline.run(self.chains).await;
        for (group, payload) in [
            (ReportGroup::Harvests, &report.harvests),
            (ReportGroup::Pools, &report.pools),
        ] {
            if let Err(e) = self.sink.publish(group, payload).await {
                tracing::error!(target: "discord", group = %group, error = %e, "Publish failed");
            }
        }
        flush_cache(self.cache);
        tracing::info!(
            target: "pipeline",
            harvest_tables = report.harvests.tables.len(),
            pool_tables = report.pools.tables.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run finished"
        );
    }

    async fn run_until(&self, interval: Duration, once: bool, shutdown: &CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::warn!(target: "pipeline", "Shutdown during run; in-flight work dropped");
                    break;
                }
                _ = self.run_once() => {}
            }
            if once {
                break;
            }
        }
    }
}

fn flush_cache(cache: &MetadataCache) {
    match cache.flush() {
        Ok(true) => {
            tracing::info!(target: "metadata", entries = cache.len(), "Metadata cache written")
        }
        Ok(false) => {}
        Err(e) => tracing::warn!(target: "metadata", error = %e, "Metadata cache flush failed"),
    }
}

async fn prefetch<T: TransactionSource, P: PriceSource>(
    pipeline: &Pipeline<'_, T, P>,
    chains: &[ChainRuntime<RpcChainReader>],
) {
    let results = join_all(
        chains
            .iter()
            .map(|rt| pipeline.prefetch_metadata(rt.chain, &rt.reader)),
    )
    .await;
    for (rt, result) in chains.iter().zip(results) {
        if let Err(e) = result {
            tracing::error!(target: "metadata", chain_id = rt.chain.chain_id, error = %e, "Prefetch failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let settings = GlobalSettings::load_with_path(cli.config.as_deref())?;
    setup_logging(settings.log_level(), settings.json_logs);

    let options = settings.pipeline_options()?;
    let timeout = settings.rpc_timeout();

    let mut chains = Vec::new();
    for chain in settings.chain_configs()? {
        let url = settings.get_http_provider(chain)?;
        let provider = ConnectionFactory::http(&url)?;
        tracing::info!(
            target: "rpc",
            chain_id = chain.chain_id,
            network = chain.name,
            "HTTP provider configured"
        );
        chains.push(ChainRuntime {
            chain,
            reader: RpcChainReader::new(provider, timeout),
        });
    }

    let etherscan_key = settings.etherscan_api_key_value();
    if etherscan_key.is_none() {
        tracing::warn!(target: "config", "No explorer API key set; requests will be rate limited");
    }
    let explorer = EtherscanClient::new(etherscan_key, timeout)?;
    let prices = PriceFeed::new(settings.price_endpoints(), timeout)?;
    let cache = MetadataCache::load(settings.metadata_path())?;
    let pipeline = Pipeline::new(&explorer, &prices, &cache, &options);

    if cli.prefetch_metadata {
        prefetch(&pipeline, &chains).await;
        flush_cache(&cache);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "pipeline", "Ctrl-C received; shutting down");
            signal.cancel();
        }
    });

    let interval = settings.refresh_interval();
    tracing::info!(
        target: "pipeline",
        chains = ?settings.chains,
        interval_secs = interval.as_secs(),
        once = cli.once,
        dry_run = cli.dry_run,
        "Harvest sentinel started"
    );

    match settings.discord_credentials() {
        Some((token, channel_id)) if !cli.dry_run => {
            let sink = DiscordChannel::new(token, channel_id, timeout)?;
            Service {
                pipeline: &pipeline,
                chains: &chains,
                cache: &cache,
                sink: &sink,
            }
            .run_until(interval, cli.once, &shutdown)
            .await;
        }
        credentials => {
            if credentials.is_none() && !cli.dry_run {
                tracing::warn!(target: "discord", "Discord credentials missing; logging payloads instead");
            }
            Service {
                pipeline: &pipeline,
                chains: &chains,
                cache: &cache,
                sink: &LogSink,
            }
            .run_until(interval, cli.once, &shutdown)
            .await;
        }
    }

    flush_cache(&cache);
    Ok(())
}
