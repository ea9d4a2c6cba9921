use std::sync::Arc;

use seatwise_agent::ChatAssistant;
use seatwise_core::config::{AppConfig, ConfigError};
use seatwise_core::store::{CourseStore, EnrollmentStore};
use seatwise_core::AdmissionController;
use seatwise_db::{connect, migrations, DbPool, SqlCourseRepository, SqlEnrollmentRepository};
use thiserror::Error;
use tracing::info;

use crate::api::ApiState;
use crate::health::HealthState;
use crate::identity::{GatewayHeaderVerifier, IdentityError};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api: ApiState,
    pub health: HealthState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("identity verifier setup failed: {0}")]
    Identity(#[from] IdentityError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let courses: Arc<dyn CourseStore> = Arc::new(SqlCourseRepository::new(db_pool.clone()));
    let enrollments: Arc<dyn EnrollmentStore> =
        Arc::new(SqlEnrollmentRepository::new(db_pool.clone()));
    let admission =
        Arc::new(AdmissionController::new(courses.clone(), enrollments, &config.admission));
    let assistant =
        Arc::new(ChatAssistant::from_config(&config.llm, courses.clone(), admission.clone()));
    let identity = Arc::new(GatewayHeaderVerifier::new(
        &config.server.identity_header,
        &config.server.role_header,
    )?);

    let health = HealthState::new(db_pool.clone(), assistant.is_available());
    let api = ApiState { courses, admission, assistant, identity };

    Ok(Application { config, db_pool, api, health })
}
