//! Sifter DNS server entrypoint.
//!
//! Loads the TOML configuration, wires the filter, cache, store,
//! resolver, and collector into the query pipeline, and runs the
//! configured listener until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use sifter_cache::Cache;
use sifter_config::Config;
use sifter_filter::{FilterEngine, FilterMode};
use sifter_resolver::{
    ForwardingResolver, IterativeResolver, RecursiveResolver, Resolver, RootHints,
};
use sifter_server::{PipelineHandler, Protocol, Server};
use sifter_store::MemoryStore;
use sifter_telemetry::logging::{self, LogFormat, LogOptions};
use sifter_telemetry::{Collector, DiscardSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Sifter: a filtering recursive DNS server.
#[derive(Parser, Debug)]
#[command(name = "sifter", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::read(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => Config::default(),
    };
    config.validate().context("invalid configuration")?;

    init_logging(&config)?;
    info!(
        address = %config.server.address,
        network = %config.server.network,
        resolver = %config.resolver.mode,
        "starting sifter"
    );

    // The cache is shared between the handler and the resolver; either
    // side can be disabled independently.
    let cache = Arc::new(Cache::new(Duration::from_secs(config.resolver.max_expire)));
    let handler_cache = config.server.cache_enabled.then(|| cache.clone());
    let resolver_cache = config.resolver.cache_enabled.then(|| cache.clone());

    let filter = build_filter(&config).await?;
    let resolver = build_resolver(&config, resolver_cache)?;
    let store = Arc::new(MemoryStore::new());

    let (collector, flush_task) = if config.collector.enabled {
        if config.collector.backend != "default" {
            warn!(
                backend = %config.collector.backend,
                "collector backend not linked in, discarding entries"
            );
        }
        let collector = Collector::new(
            Box::new(DiscardSink),
            config.collector.max_entries,
            Duration::from_secs(config.collector.interval),
            config.collector.anonymize,
        );
        let task = collector.run();
        (Some(collector), Some(task))
    } else {
        (None, None)
    };

    // Recursive and forwarding modes both answer on behalf of the
    // client; only iterative mode leaves recursion unavailable.
    let recursion_available = matches!(config.resolver.mode.as_str(), "r" | "f");

    let handler = Arc::new(PipelineHandler::new(
        filter,
        handler_cache,
        store,
        resolver,
        collector.clone(),
        recursion_available,
    ));

    let protocol = if config.server.is_tcp() {
        Protocol::Tcp
    } else {
        Protocol::Udp
    };
    let address = config.server.socket_addr().context("invalid listen address")?;
    let server = Arc::new(Server::new(address, protocol, handler));

    let mut runner = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::select! {
        result = &mut runner => {
            result.context("listener task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to install signal handler")?;
            info!("shutting down");
            server.shutdown();
            runner.await.context("listener task panicked")??;
        }
    }

    if let Some(task) = flush_task {
        task.abort();
    }
    if let Some(collector) = collector {
        collector.flush().await;
    }

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let options = LogOptions {
        enabled: config.log.enabled,
        format: if config.log.mode == "dev" {
            LogFormat::Dev
        } else {
            LogFormat::Prod
        },
        level: config.log.level.clone(),
        outputs: config.log.outputs.clone(),
    };
    logging::init(&options).context("failed to initialize logging")?;
    Ok(())
}

async fn build_filter(config: &Config) -> Result<Option<Arc<FilterEngine>>> {
    let mode: FilterMode = config
        .filter
        .mode
        .parse()
        .context("invalid filter configuration")?;
    let server_ip = config.server.socket_addr()?.ip();

    let engine = FilterEngine::new(mode, config.filter.ttl, server_ip);

    for source in &config.filter.lists {
        if source.starts_with("http://") || source.starts_with("https://") {
            engine
                .load_url(source)
                .await
                .with_context(|| format!("failed to load filter list {source}"))?;
        } else {
            engine
                .load_file(source)
                .with_context(|| format!("failed to load filter list {source}"))?;
        }
    }

    if engine.rule_count() == 0 && config.filter.lists.is_empty() {
        // No rules configured; skip the filter stage entirely.
        return Ok(None);
    }

    info!(rules = engine.rule_count(), mode = %engine.mode(), "filter enabled");
    Ok(Some(Arc::new(engine)))
}

fn build_resolver(
    config: &Config,
    cache: Option<Arc<Cache>>,
) -> Result<Arc<dyn Resolver>> {
    let resolver: Arc<dyn Resolver> = match config.resolver.mode.as_str() {
        "f" => {
            let upstream = config.resolver.upstream_ip()?;
            info!(%upstream, "forwarding resolver");
            Arc::new(ForwardingResolver::new(upstream, cache))
        }
        "i" => {
            info!("iterative resolver (refuses queries)");
            Arc::new(IterativeResolver::new())
        }
        _ => {
            let hints = if config.resolver.hint_path.is_empty() {
                RootHints::builtin()
            } else {
                RootHints::from_file(&config.resolver.hint_path)
                    .context("failed to load hint file")?
            };
            info!(hints = hints.len(), "recursive resolver");
            Arc::new(RecursiveResolver::with_hints(hints, cache))
        }
    };

    Ok(resolver)
}
