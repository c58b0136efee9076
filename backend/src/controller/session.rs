use quick_cache::sync::Cache;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tonic::Status;
use tracing::instrument;

use super::crypto::{self, CryptoController};
use crate::{entity::token, entity::user, report_internal, util::auth::RoleLv};

type Result<T> = std::result::Result<T, Error>;

const CACHE_SIZE: usize = 512;
/// a month
const EXPIRY_MAX_SECS: u64 = 60 * 60 * 24 * 30;
const EXPIRY_DEFAULT_SECS: u64 = 60 * 60 * 24;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid username or password")]
    BadCredential,
    #[error("Token not exist")]
    NonExist,
    #[error("Token expired")]
    Expired,
    #[error("Unknown role in database")]
    UnknownRole,
    #[error("`{0}`")]
    Crypto(#[from] crypto::Error),
    #[error("Database error: `{0}`")]
    DBErr(#[from] sea_orm::DbErr),
}

impl From<Error> for Status {
    fn from(value: Error) -> Self {
        match value {
            Error::BadCredential => Status::unauthenticated("Invalid username or password"),
            Error::NonExist | Error::Expired | Error::Crypto(_) => Status::unauthenticated(""),
            Error::UnknownRole => report_internal!(error, "unknown role in database"),
            Error::DBErr(x) => report_internal!(error, "{}", x),
        }
    }
}

/// what the bearer string decodes to
#[derive(Serialize, Deserialize)]
struct Claim {
    id: i32,
    rand: [u8; 16],
}

#[derive(Clone)]
struct CachedSession {
    user_id: i32,
    role: RoleLv,
    rand: [u8; 16],
    expiry: chrono::NaiveDateTime,
}

/// Bearer session controller backed by the token table,
/// with an in-process cache in front of it
pub struct SessionController {
    cache: Cache<i32, CachedSession>,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(CACHE_SIZE),
        }
    }
    /// check credentials and issue a fresh bearer token
    #[instrument(skip_all, level = "info", fields(username = username))]
    pub async fn login(
        &self,
        db: &DatabaseConnection,
        crypto: &CryptoController,
        username: &str,
        password: &str,
        expiry_secs: Option<u64>,
    ) -> Result<(String, RoleLv, chrono::NaiveDateTime)> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?
            .ok_or(Error::BadCredential)?;

        if !crypto.hash_eq(password, &user.password) {
            return Err(Error::BadCredential);
        }

        let role = RoleLv::try_from(user.role).map_err(|_| Error::UnknownRole)?;
        let rand: [u8; 16] = rand::thread_rng().gen();
        let expiry = chrono::Utc::now().naive_utc()
            + chrono::Duration::seconds(
                expiry_secs.unwrap_or(EXPIRY_DEFAULT_SECS).min(EXPIRY_MAX_SECS) as i64,
            );

        let model = token::ActiveModel {
            user_id: ActiveValue::Set(user.id),
            rand: ActiveValue::Set(rand.to_vec()),
            role: ActiveValue::Set(user.role),
            expiry: ActiveValue::Set(expiry),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::debug!(token_id = model.id, "token_created");

        let bearer = crypto.encode(Claim { id: model.id, rand })?;
        Ok((bearer, role, expiry))
    }
    /// resolve a bearer string to (user_id, role)
    #[instrument(skip_all, level = "debug")]
    pub async fn verify(
        &self,
        db: &DatabaseConnection,
        crypto: &CryptoController,
        bearer: &str,
    ) -> Result<(i32, RoleLv)> {
        let claim: Claim = crypto.decode(bearer.to_owned())?;
        let now = chrono::Utc::now().naive_utc();

        if let Some(cached) = self.cache.get(&claim.id) {
            if cached.rand != claim.rand {
                return Err(Error::NonExist);
            }
            if cached.expiry < now {
                self.cache.remove(&claim.id);
                return Err(Error::Expired);
            }
            return Ok((cached.user_id, cached.role));
        }

        let model = token::Entity::find_by_id(claim.id)
            .one(db)
            .await?
            .ok_or(Error::NonExist)?;
        if model.rand != claim.rand {
            return Err(Error::NonExist);
        }
        if model.expiry < now {
            token::Entity::delete_by_id(claim.id).exec(db).await?;
            return Err(Error::Expired);
        }

        let role = RoleLv::try_from(model.role).map_err(|_| Error::UnknownRole)?;
        self.cache.insert(
            claim.id,
            CachedSession {
                user_id: model.user_id,
                role,
                rand: claim.rand,
                expiry: model.expiry,
            },
        );
        Ok((model.user_id, role))
    }
    /// drop the session the bearer points at
    #[instrument(skip_all, level = "info")]
    pub async fn logout(
        &self,
        db: &DatabaseConnection,
        crypto: &CryptoController,
        bearer: &str,
    ) -> Result<()> {
        let claim: Claim = crypto.decode(bearer.to_owned())?;
        self.cache.remove(&claim.id);
        let result = token::Entity::delete_by_id(claim.id)
            .filter(token::Column::Rand.eq(claim.rand.to_vec()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::NonExist);
        }
        Ok(())
    }
    /// forget every cached session of a user, used after password change
    pub fn evict_user(&self, db_tokens: &[i32]) {
        for id in db_tokens {
            self.cache.remove(id);
        }
    }
}
