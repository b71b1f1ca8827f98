//! eppgwd - EPP HTTP Gateway Daemon
//!
//! Serves a REST/JSON API and transcodes each request into a gRPC call
//! against an EPP registry backend over a TLS channel.
//!
//! Usage:
//!   eppgwd [OPTIONS]
//!
//! Every option falls back to an EPPGW_* environment variable; the
//! backend endpoint, CA certificate, route table and descriptor set are
//! required.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eppgw_api::{create_router, AppState, TranscodeOptions};
use eppgw_channel::GrpcChannel;
use eppgw_core::{schema, RouteTable};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parsed command-line arguments
struct Args {
    /// Address the HTTP server listens on
    listen: SocketAddr,
    /// Backend gRPC endpoint, `host:port`
    backend: String,
    /// PEM CA certificate the backend's TLS certificate must chain to
    backend_ca: PathBuf,
    /// Route table (TOML)
    routes: PathBuf,
    /// Serialized FileDescriptorSet with the backend's schema
    descriptors: PathBuf,
    /// Reject unknown body fields and query parameters
    strict: bool,
    /// Backend deadline when the client sends no grpc-timeout
    default_timeout: Duration,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut listen: Option<String> = None;
    let mut backend: Option<String> = None;
    let mut backend_ca: Option<String> = None;
    let mut routes: Option<String> = None;
    let mut descriptors: Option<String> = None;
    let mut strict = false;
    let mut timeout: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--listen" | "-l" => listen = Some(take_value(&args, &mut i, "--listen")?),
            "--backend" | "-b" => backend = Some(take_value(&args, &mut i, "--backend")?),
            "--backend-ca" => backend_ca = Some(take_value(&args, &mut i, "--backend-ca")?),
            "--routes" | "-r" => routes = Some(take_value(&args, &mut i, "--routes")?),
            "--descriptors" => descriptors = Some(take_value(&args, &mut i, "--descriptors")?),
            "--timeout" => timeout = Some(take_value(&args, &mut i, "--timeout")?),
            "--strict" => {
                strict = true;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let env = |name: &str| std::env::var(name).ok();

    let listen = listen
        .or_else(|| env("EPPGW_LISTEN"))
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());
    let listen: SocketAddr = listen
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen address {listen:?}: {e}"))?;

    let backend = backend
        .or_else(|| env("EPPGW_BACKEND"))
        .ok_or_else(|| anyhow::anyhow!("missing --backend (or EPPGW_BACKEND)"))?;
    let backend_ca = backend_ca
        .or_else(|| env("EPPGW_BACKEND_CA"))
        .ok_or_else(|| anyhow::anyhow!("missing --backend-ca (or EPPGW_BACKEND_CA)"))?;
    let routes = routes
        .or_else(|| env("EPPGW_ROUTES"))
        .ok_or_else(|| anyhow::anyhow!("missing --routes (or EPPGW_ROUTES)"))?;
    let descriptors = descriptors
        .or_else(|| env("EPPGW_DESCRIPTORS"))
        .ok_or_else(|| anyhow::anyhow!("missing --descriptors (or EPPGW_DESCRIPTORS)"))?;

    let strict = strict || env("EPPGW_STRICT").is_some_and(|v| v == "1" || v == "true");

    let timeout = timeout.or_else(|| env("EPPGW_TIMEOUT_SECS"));
    let default_timeout = match timeout {
        Some(value) => Duration::from_secs(
            value
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid --timeout {value:?}: {e}"))?,
        ),
        None => Duration::from_secs(30),
    };

    Ok(Args {
        listen,
        backend,
        backend_ca: PathBuf::from(backend_ca),
        routes: PathBuf::from(routes),
        descriptors: PathBuf::from(descriptors),
        strict,
        default_timeout,
    })
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<String> {
    let value = args
        .get(*i + 1)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing argument for {flag}"))?;
    *i += 2;
    Ok(value)
}

fn print_help() {
    eprintln!(
        r#"eppgwd - EPP HTTP Gateway Daemon

Usage: eppgwd [OPTIONS]

Options:
  -l, --listen <addr>       HTTP listen address [default: 0.0.0.0:8080]
  -b, --backend <endpoint>  Backend gRPC endpoint, host:port (required)
      --backend-ca <path>   PEM CA certificate for the backend TLS channel (required)
  -r, --routes <path>       Route table TOML file (required)
      --descriptors <path>  Serialized FileDescriptorSet (required)
      --strict              Reject unknown body fields and query parameters
      --timeout <secs>      Default backend deadline [default: 30]
  -h, --help                Print this help message

Every option also reads an environment variable: EPPGW_LISTEN,
EPPGW_BACKEND, EPPGW_BACKEND_CA, EPPGW_ROUTES, EPPGW_DESCRIPTORS,
EPPGW_STRICT, EPPGW_TIMEOUT_SECS.

Examples:
  eppgwd --backend registry.example:9090 --backend-ca ca.pem \
         --routes config/routes.toml --descriptors epp.pb
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eppgwd=info,eppgw_api=info,eppgw_channel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting eppgwd (EPP HTTP Gateway Daemon)");

    let args = parse_args()?;

    // Load startup artifacts; any failure here is fatal, nothing below
    // this point produces a ConfigError.
    let pool = schema::load_descriptor_pool(&args.descriptors)?;
    let table = RouteTable::load(&args.routes, &pool)?;
    tracing::info!(
        routes = table.len(),
        descriptors = %args.descriptors.display(),
        "Loaded route table"
    );

    let channel = GrpcChannel::connect(&args.backend, &args.backend_ca)?;
    tracing::info!(backend = %args.backend, "Prepared backend TLS channel");

    let state = AppState::new(
        Arc::new(channel),
        TranscodeOptions {
            strict: args.strict,
            default_timeout: args.default_timeout,
        },
    );
    let app = create_router(state, &table);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!("Listening on http://{}", args.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
