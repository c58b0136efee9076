use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectOptions, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, EntityTrait, PaginatorTrait, Statement,
};

use super::InitError;
use tracing::{debug_span, instrument, Instrument};

use crate::config;
use crate::{controller::crypto::CryptoController, util::auth::RoleLv};

/// initialize the database and connection
///
/// 1. Connect to database.
/// 2. Check and run migration.(skip when not(feature="standalone"))
/// 3. insert the admin account if the user table is empty.
#[instrument(skip_all, name = "construct_db")]
pub async fn init(
    config: &config::Database,
    crypto: &CryptoController,
) -> super::Result<DatabaseConnection> {
    let uri = format!("sqlite://{}?mode=rwc&cache=private", config.path.clone());

    let mut opt = ConnectOptions::new(uri);
    opt.sqlx_logging_level(log::LevelFilter::Trace);

    let db = Database::connect(opt).await.map_err(InitError::InitConn)?;

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA cache_size = -65536;PRAGMA optimize;", // 64MiB cache
    ))
    .instrument(debug_span!("db_optimize"))
    .await
    .map_err(InitError::OptimizeDB)?;

    #[cfg(feature = "standalone")]
    if config.migrate == Some(true) {
        migrate(&db).await?;
    }

    init_user(&db, crypto).await?;

    Ok(db)
}

#[cfg(feature = "standalone")]
async fn migrate(db: &DatabaseConnection) -> super::Result<()> {
    use sea_orm_migration::MigratorTrait;
    migration::Migrator::up(db, None)
        .await
        .map_err(InitError::AutoMigrate)?;
    Ok(())
}

/// insert the admin@admin account on an empty user table
#[instrument(skip_all, name = "construct_admin")]
async fn init_user(db: &DatabaseConnection, crypto: &CryptoController) -> super::Result<()> {
    if crate::entity::user::Entity::find()
        .count(db)
        .await
        .map_err(InitError::UserCreation)?
        != 0
    {
        return Ok(());
    }

    tracing::info!("Setting up admin@admin");

    crate::entity::user::ActiveModel {
        role: ActiveValue::Set(RoleLv::Root as i32),
        username: ActiveValue::Set("admin".to_owned()),
        display_name: ActiveValue::Set("admin".to_owned()),
        password: ActiveValue::Set(crypto.hash("admin")),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(InitError::UserCreation)?;

    Ok(())
}
