/// MathsApp backend
///
/// REST API for an educational content platform: account lifecycle
/// with email verification, topic cards with attached files, videos,
/// flashcards and quizzes, object storage for uploaded assets, and
/// recorded quiz attempts with admin reporting.

mod account;
mod api;
mod auth;
mod cards;
mod cloud;
mod config;
mod context;
mod db;
mod error;
mod mailer;
mod quizzes;
mod server;
mod storage;
mod uploads;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mathsapp_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}
