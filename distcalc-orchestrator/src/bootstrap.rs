//! Wires configuration, stores, authentication, and the scheduler into one
//! shared application state, and starts the HTTP and gRPC servers.

use std::sync::Arc;
use std::time::Duration;

use distcalc_shared::auth::{Authenticator, RevocationCache};
use distcalc_shared::config::OrchestratorConfig;
use distcalc_shared::store::{
    ExpressionStore, InMemoryExpressionStore, InMemoryTaskStore, InMemoryUserStore, TaskStore,
    UserStore,
};

use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OrchestratorConfig>,
    pub scheduler: Arc<Scheduler>,
    pub authenticator: Arc<Authenticator>,
    pub users: Arc<dyn UserStore>,
    pub revocations: Arc<RevocationCache>,
}

impl AppState {
    /// Builds application state from configuration. Uses the in-memory
    /// stores unless `database_url` is set, in which case it connects to
    /// Postgres and runs migrations.
    pub async fn bootstrap(config: OrchestratorConfig) -> Result<Self, anyhow::Error> {
        let authenticator = Authenticator::generate(
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        )?;
        let revocations = RevocationCache::new(Duration::from_secs(config.refresh_token_ttl_secs));

        let (tasks, expressions, users): (
            Arc<dyn TaskStore>,
            Arc<dyn ExpressionStore>,
            Arc<dyn UserStore>,
        ) = match &config.database_url {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await?;
                sqlx::migrate!("../distcalc-shared/migrations").run(&pool).await?;
                (
                    Arc::new(distcalc_shared::store::PgTaskStore::new(pool.clone())),
                    Arc::new(distcalc_shared::store::PgExpressionStore::new(pool.clone())),
                    Arc::new(distcalc_shared::store::PgUserStore::new(pool)),
                )
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => anyhow::bail!("database_url configured but the postgres feature is disabled"),
            None => (
                Arc::new(InMemoryTaskStore::new()),
                Arc::new(InMemoryExpressionStore::new()),
                Arc::new(InMemoryUserStore::new()),
            ),
        };

        let scheduler = Arc::new(Scheduler::new(tasks, expressions));

        Ok(Self {
            config: Arc::new(config),
            scheduler,
            authenticator: Arc::new(authenticator),
            users,
            revocations,
        })
    }
}
