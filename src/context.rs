/// Shared application context
///
/// Built once at startup and cloned into every handler as axum state.
/// Owns the connection pool, the object store, and every domain
/// manager.
use crate::{
    account::AccountManager,
    cards::CardManager,
    cloud::CloudMessageManager,
    config::ServerConfig,
    db,
    error::ApiResult,
    mailer::Mailer,
    quizzes::QuizManager,
    storage::{self, ObjectStore},
    uploads::UploadManager,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: sqlx::SqlitePool,
    pub store: Arc<dyn ObjectStore>,
    pub accounts: Arc<AccountManager>,
    pub cards: Arc<CardManager>,
    pub uploads: Arc<UploadManager>,
    pub quizzes: Arc<QuizManager>,
    pub cloud: Arc<CloudMessageManager>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let pool = db::create_pool(
            &config.database.path,
            db::DatabaseOptions {
                max_connections: config.database.max_connections,
                enable_wal: true,
            },
        )
        .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let store = storage::build_store(&config.storage.backend)?;
        let mailer = Arc::new(Mailer::new(config.email.as_ref())?);

        let accounts = Arc::new(AccountManager::new(
            pool.clone(),
            config.auth.code_ttl_minutes,
        ));
        let cards = Arc::new(CardManager::new(pool.clone()));
        let uploads = Arc::new(UploadManager::new(
            store.clone(),
            cards.clone(),
            &config.storage,
            &config.auth,
            &config.service.public_url,
        ));
        let quizzes = Arc::new(QuizManager::new(
            pool.clone(),
            cards.clone(),
            accounts.clone(),
        ));
        let cloud = Arc::new(CloudMessageManager::new(pool.clone(), accounts.clone()));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            store,
            accounts,
            cards,
            uploads,
            quizzes,
            cloud,
            mailer,
        })
    }
}
