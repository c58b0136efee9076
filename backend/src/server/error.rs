use opentelemetry::trace::TraceError;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Fail to create initial connection: `{0}`")]
    InitConn(sea_orm::DbErr),
    #[error("Fail to optimize database: `{0}`")]
    OptimizeDB(sea_orm::DbErr),
    #[cfg(feature = "standalone")]
    #[error("Fail to run auto migration: `{0}`")]
    AutoMigrate(sea_orm::DbErr),
    #[error("Fail to create initial user: `{0}`")]
    UserCreation(sea_orm::DbErr),
    #[error("`{0}`")]
    Tracer(#[from] TraceError),
    #[error("Fail to read pem file: `{0}`")]
    ReadPem(std::io::Error),
}
