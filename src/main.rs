use std::process::ExitCode;
use std::sync::Arc;
use todo_chat_server::{routes, state::AppState, Settings, Store};

#[tokio::main]
async fn main() -> ExitCode {
    // ── Settings ───────────────────────────────────────────────
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings.log_filter);

    // ── Store ──────────────────────────────────────────────────
    let store = match Store::open(&settings.database_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, path = %settings.database_path, "failed to open database");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(path = %settings.database_path, "database opened");

    // ── Router ─────────────────────────────────────────────────
    let addr = settings.socket_address();
    let state = Arc::new(AppState { store, settings });
    let app = routes::router(state);

    // ── Start ──────────────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("server running on http://{addr}");
    tracing::info!("  Chat:    POST http://{addr}/api/chat");
    tracing::info!("  Sign in: POST http://{addr}/api/auth/sign-in");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// `RUST_LOG` wins over the settings file. With `profile-console`, tokio
/// task instrumentation goes to tokio-console instead.
fn init_tracing(default_filter: &str) {
    #[cfg(feature = "profile-console")]
    {
        let _ = default_filter;
        console_subscriber::init();
    }

    #[cfg(not(feature = "profile-console"))]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
