#![forbid(unsafe_code)]

use mldegrees_server::{build_router, validate_startup_config_contract, ApiConfig, AppState};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("MLDEGREES_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let api = ApiConfig {
        bind_addr: env::var("MLDEGREES_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        max_body_bytes: env_usize("MLDEGREES_MAX_BODY_BYTES", 64 * 1024),
        cors_allowed_origins: env_list("MLDEGREES_CORS_ALLOWED_ORIGINS"),
        enable_local_auth: env_bool("MLDEGREES_ENABLE_LOCAL_AUTH", false),
        enable_request_log: env_bool("MLDEGREES_ENABLE_REQUEST_LOG", true),
    };
    validate_startup_config_contract(&api)?;

    let db_path = PathBuf::from(
        env::var("MLDEGREES_DB_PATH").unwrap_or_else(|_| "mldegrees.db".to_string()),
    );
    let conn = mldegrees_store::open(&db_path)
        .map_err(|e| format!("open database {}: {e}", db_path.display()))?;
    info!(db = %db_path.display(), "database ready");

    let bind_addr = api.bind_addr.clone();
    let state = AppState::with_config(conn, api);
    let app = build_router(state);

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket
        .set_keepalive(env_bool("MLDEGREES_TCP_KEEPALIVE_ENABLED", true))
        .map_err(|e| format!("set_keepalive failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("mldegrees-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            // Give in-flight requests a moment to drain before the runtime exits.
            let drain_ms = env_u64("MLDEGREES_SHUTDOWN_DRAIN_MS", 0);
            if drain_ms > 0 {
                tokio::time::sleep(Duration::from_millis(drain_ms)).await;
            }
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
