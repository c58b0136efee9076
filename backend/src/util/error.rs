use crate::controller::{coach, session};
use crate::report_internal;
use tonic::Status;

use super::auth::RoleLv;

pub type Result<T> = std::result::Result<T, Error>;

/// Centralized Error for endpoint, usually calling with `Into::into()`
/// to transform it into `Status` immediately
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Permission deny: `{0}`")]
    PermissionDeny(&'static str),
    #[error("seaorm error: `{0}`")]
    DBErr(sea_orm::DbErr),
    #[error("payload.`{0}` is not a valid argument")]
    BadArgument(&'static str),
    #[error("Not in payload: `{0}`")]
    NotInPayload(&'static str),
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Not in database")]
    NotInDB,
    #[error("Invalid request_id")]
    InvalidUUID(#[from] uuid::Error),
    #[error("Function should be unreachable!")]
    Unreachable(&'static str),
    #[error("Number too large(or small)")]
    NumberTooLarge,
    #[error("`{0}` Already exist")]
    AlreadyExist(&'static str),
    #[error("require permission `{0}`")]
    RequirePermission(RoleLv),
    #[error("rate limit reached")]
    RateLimit(&'static str),
    #[error("session error: `{0}`")]
    Session(#[from] session::Error),
    #[error("coach error: `{0}`")]
    Coach(#[from] coach::Error),
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        match value {
            sea_orm::DbErr::RecordNotUpdated => Error::NotInDB,
            _ => Error::DBErr(value),
        }
    }
}

impl From<Error> for Status {
    fn from(value: Error) -> Self {
        match value {
            Error::PermissionDeny(x) => {
                tracing::debug!(hint = x, "permission_invalid");
                Status::permission_denied(x)
            }
            Error::DBErr(x) => report_internal!(error, "{}", x),
            Error::BadArgument(x) => {
                tracing::trace!(miss_type = x, "argument_invalid");
                Status::invalid_argument(x)
            }
            Error::NotInPayload(x) => {
                tracing::trace!(miss_type = x, "argument_missing");
                Status::invalid_argument(format!("payload.{} is not found", x))
            }
            Error::Unauthenticated => {
                tracing::trace!("Client sent invalid or no token");
                Status::unauthenticated("")
            }
            Error::NotInDB => {
                tracing::trace!("database_notfound");
                Status::not_found("")
            }
            Error::InvalidUUID(_) => {
                Status::invalid_argument("Invalid request_id(should be a client generated UUIDv4)")
            }
            Error::Unreachable(x) => report_internal!(error, "{}", x),
            Error::NumberTooLarge => Status::invalid_argument("number too large"),
            Error::AlreadyExist(x) => Status::already_exists(format!("{} already exist", x)),
            Error::RequirePermission(x) => {
                Status::permission_denied(format!("require permission {}", x))
            }
            Error::RateLimit(x) => {
                tracing::warn!(traffic = x, "rate_limit");
                Status::resource_exhausted("rate limit reached!")
            }
            Error::Session(x) => x.into(),
            Error::Coach(x) => x.into(),
        }
    }
}
