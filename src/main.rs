//! The Bite Me Buddy API server.
mod constants;
mod db;
mod middleware;
mod routes;
mod services;
mod state;
mod utils;

use axum::Router;
use tokio::{
    net::TcpListener,
    signal::{
        ctrl_c,
        unix::{signal, SignalKind},
    },
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    constants::api::{API_URI_PREFIX, BOOTSTRAP_ADMIN_MOBILE, LOG_JSON, PORT},
    services::{media, sessions, users},
    state::AppState,
    utils::mobile::MobileNumber,
};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "bite_me_buddy=info,tower_http=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if *LOG_JSON {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Promote the configured bootstrap administrator, if any.
async fn bootstrap_administrator(db_conn: &db::ConnectionPool) {
    let Some(raw_mobile) = BOOTSTRAP_ADMIN_MOBILE.as_deref() else {
        return;
    };
    let Ok(mobile) = MobileNumber::try_from(raw_mobile) else {
        warn!("BOOTSTRAP_ADMIN_MOBILE is not a valid mobile number, ignoring");
        return;
    };
    match users::bootstrap_administrator(&mobile, db_conn).await {
        Ok(true) => info!("Bootstrap administrator is in place"),
        Ok(false) => warn!("No user registered with BOOTSTRAP_ADMIN_MOBILE yet"),
        Err(err) => warn!("Failed to promote bootstrap administrator: {err}"),
    }
}

/// Mount the application router under the configured prefix.
fn with_prefix(router: Router<AppState>) -> Router<AppState> {
    let prefix = API_URI_PREFIX.trim_matches('/');
    if prefix.is_empty() {
        router
    } else {
        Router::new().nest(&format!("/{prefix}"), router)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };
    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    constants::load();
    init_tracing();

    let db = db::connect()
        .await
        .expect("Failed to connect to the database");
    db::migrate(&db)
        .await
        .expect("Failed to apply database migrations");
    bootstrap_administrator(&db).await;
    let session_store = sessions::store::Connection::connect()
        .await
        .expect("Failed to connect to the session store");
    let media_store = media::connect().expect("Failed to open the media store");
    let state = AppState {
        db,
        session_store,
        media_store,
    };

    let app = with_prefix(routes::create_router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let address = format!("0.0.0.0:{}", *PORT);
    let listener = TcpListener::bind(&address)
        .await
        .expect("Failed to bind listener");
    info!("Listening on {address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to init Axum service");
    info!("Server stopped");
}
