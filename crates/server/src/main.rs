//! polls-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use polls_api::{AppState, Templates, app};
use polls_common::Config;
use polls_core::{AdminService, QuestionService, UserService, VoteService};
use polls_db::repositories::{
    ChoiceRepository, QuestionRepository, UserRepository, VoteRepository,
};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polls=debug,tower_http=debug,sqlx=warn".into()),
        )
        .init();

    info!("Starting polls-rs server...");

    let config = match std::env::var("POLLS_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {path}"))?,
        Err(_) => Config::load().context("loading configuration")?,
    };

    let db = polls_db::init(&config).await?;

    info!("Running database migrations...");
    polls_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let question_repo = QuestionRepository::new(Arc::clone(&db));
    let choice_repo = ChoiceRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));
    let user_repo = UserRepository::new(Arc::clone(&db));

    // Initialize services
    let question_service = QuestionService::new(
        question_repo.clone(),
        choice_repo.clone(),
        config.polls.page_size,
    );
    let vote_service = VoteService::new(question_repo.clone(), vote_repo);
    let user_service = UserService::new(user_repo);
    let admin_service = AdminService::new(question_repo, choice_repo);

    if let Some(admin) = &config.admin {
        user_service
            .ensure_admin(&admin.username, &admin.password)
            .await?;
    }

    let templates = Templates::load(&config.templates)?;

    let state = AppState {
        question_service,
        vote_service,
        user_service,
        admin_service,
        templates,
        auth: config.auth.clone(),
    };

    let app = app(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.host))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
