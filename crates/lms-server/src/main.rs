//! LMS Server: application entry point.
//!
//! Loads configuration, connects to SurrealDB, applies migrations and
//! wires the tenant and review services, then runs until interrupted.

mod config;
mod error;

use lms_db::repository::{
    SurrealCourseRepository, SurrealMembershipRepository, SurrealReviewRepository,
    SurrealTenantRepository, SurrealUserRepository,
};
use lms_db::{DbManager, SurrealTenantProvisioner};
use lms_service::{ReviewService, TenantService};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ServerError;

type Reviews = ReviewService<
    SurrealReviewRepository<Client>,
    SurrealMembershipRepository<Client>,
    SurrealCourseRepository<Client>,
>;

type Tenants = TenantService<
    SurrealTenantRepository<Client>,
    SurrealMembershipRepository<Client>,
    SurrealUserRepository<Client>,
    SurrealTenantProvisioner<Client>,
>;

/// Services shared by every request handler.
pub struct AppState {
    pub reviews: Reviews,
    pub tenants: Tenants,
}

impl AppState {
    fn new(db: &Surreal<Client>, config: &ServerConfig) -> Self {
        Self {
            reviews: ReviewService::new(
                SurrealReviewRepository::new(db.clone()),
                SurrealMembershipRepository::new(db.clone()),
                SurrealCourseRepository::new(db.clone()),
                config.review.clone(),
            ),
            tenants: TenantService::new(
                SurrealTenantRepository::new(db.clone()),
                SurrealMembershipRepository::new(db.clone()),
                SurrealUserRepository::new(db.clone()),
                SurrealTenantProvisioner::new(db.clone()),
                config.tenant.clone(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting LMS server...");

    let config = ServerConfig::from_env()?;
    let manager = DbManager::connect(&config.db).await?;
    lms_db::run_migrations(manager.client()).await?;

    let _state = AppState::new(manager.client(), &config);
    info!(
        namespace = %config.db.namespace,
        database = %config.db.database,
        "LMS services ready"
    );

    tokio::signal::ctrl_c().await?;

    info!("LMS server stopped.");
    Ok(())
}
