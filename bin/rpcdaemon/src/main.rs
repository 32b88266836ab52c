//! Entry point (spec.md §6): parse the CLI surface, wire up C1-C12, and serve
//! the general and engine JSON-RPC HTTP listeners until SIGINT/SIGTERM.

mod cli;

use cli::Args;
use clap::Parser;
use jsonrpsee::server::ServerBuilder;
use rpcdaemon_concurrency::ContextPool;
use rpcdaemon_errors::CliError;
use rpcdaemon_net_clients::{BackendClient, KvRawClient};
use rpcdaemon_provider::BlockCache;
use rpcdaemon_rpc::method_table::{build_module, parse_namespaces, Namespace};
use rpcdaemon_rpc::AppContext;
use rpcdaemon_state_cache::{CoherentCacheConfig, CoherentStateCache, StateChangesIngester};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    if let Err(err) = args.validate() {
        eprintln!("rpcdaemon: {err}");
        std::process::exit(1);
    }

    let filter = EnvFilter::try_new(&args.log_verbosity).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        tracing::warn!(%err, "failed to install prometheus metrics exporter");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rpcdaemon-main")
        .build()
        .expect("failed to build main runtime");

    if let Err(err) = runtime.block_on(run(args)) {
        tracing::error!(%err, "rpcdaemon exited with an error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let endpoint = args.endpoint();

    let requested = parse_namespaces(&args.api_spec);
    let general_namespaces: Vec<Namespace> = requested.into_iter().filter(|ns| *ns != Namespace::Engine).collect();
    let engine_namespaces = [Namespace::Engine];

    let channel = rpcdaemon_net_clients::connect(endpoint.clone()).await.map_err(|err| CliError::Bind {
        addr: endpoint.clone(),
        source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
    })?;

    let kv_client = KvRawClient::new(channel.clone());
    let backend_client = BackendClient::new(channel);

    let state_cache =
        Arc::new(CoherentStateCache::new(CoherentCacheConfig { label: "rpcdaemon".to_owned(), ..Default::default() }));
    let block_cache = Arc::new(BlockCache::default());

    // Dedicated single-context pool for the state-changes ingester (spec.md
    // §4.5: "runs on its own context"), kept separate from the pool that
    // serves requests so cache ingestion never shares a reactor with a
    // handler.
    let ingest_pool = ContextPool::new(1, args.wait_mode).expect("validated: num_contexts path guarantees size > 0");
    let ingester = StateChangesIngester::new(endpoint.clone(), state_cache.clone());
    ingest_pool.next_context().spawn(ingester.run());

    let request_pool = Arc::new(ContextPool::new(args.num_contexts, args.wait_mode).map_err(|_| CliError::ZeroResource("num_contexts"))?);

    let ctx = AppContext::new(kv_client, backend_client, state_cache, block_cache, request_pool);

    let general_module = build_module(&general_namespaces, ctx.clone()).expect("method table has no duplicate names");
    let engine_module = build_module(&engine_namespaces, ctx).expect("method table has no duplicate names");

    let general_server = ServerBuilder::default().build(args.http_port.as_str()).await.map_err(|err| CliError::Bind {
        addr: args.http_port.clone(),
        source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
    })?;
    let engine_server = ServerBuilder::default().build(args.engine_port.as_str()).await.map_err(|err| CliError::Bind {
        addr: args.engine_port.clone(),
        source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
    })?;

    tracing::info!(addr = %args.http_port, namespaces = ?general_namespaces, "general JSON-RPC listener up");
    tracing::info!(addr = %args.engine_port, "engine API listener up");

    let general_handle = general_server.start(general_module);
    let engine_handle = engine_server.start(engine_module);

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining listeners");

    let _ = general_handle.stop();
    let _ = engine_handle.stop();
    general_handle.stopped().await;
    engine_handle.stopped().await;

    // `ingest_pool`/`request_pool` fall out of scope here; `ContextPool`'s
    // `Drop` impl calls `stop()`/`join()` (spec.md §4.2 graceful shutdown).
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
