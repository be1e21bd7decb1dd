use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use evlog::meta;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};

use crate::db::dbclient::DBClient;
use crate::runtime::get_logger;

pub mod auth;
pub mod error;
pub mod pages;
pub mod routes;

pub struct AppState {
    pub db: DBClient,
}

pub async fn serve(addr: &str, db: DBClient) -> anyhow::Result<()> {
    let state = Arc::new(AppState { db });

    let app = Router::new()
        .route("/", get(routes::root))
        .route("/polls", get(routes::index))
        .route("/polls/:id", get(routes::detail))
        .route("/polls/:id/results", get(routes::results))
        .route("/polls/:id/vote", post(routes::vote))
        .route("/accounts/login", get(routes::login_form).post(routes::login_submit))
        .route("/accounts/logout", get(routes::logout))
        .route("/accounts/signup", get(routes::signup_form).post(routes::signup_submit))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;

    get_logger().info("Server listening.", meta! {
        "Addr" => addr,
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    get_logger().info("Shutting down.", None);
}
