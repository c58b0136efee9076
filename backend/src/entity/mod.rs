//! collection of entity
pub use sea_orm::{
    entity::prelude::*, EntityTrait, FromQueryResult, PrimaryKeyTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

pub mod assignment;
pub mod chat;
pub mod classroom;
pub mod enrollment;
pub mod problem;
pub mod submit;
pub mod testcase;
pub mod token;
pub mod user;
pub mod util;

pub use crate::util::{auth::Auth, error::Error};
pub use tonic::async_trait;

/// Parental filter are useful when reading by parent, mainly because plain
/// read filters cannot express membership(enrollment) scoped visibility
#[async_trait]
pub trait ParentalTrait<M> {
    async fn related_read_by_id(auth: &Auth, id: i32, db: &DatabaseConnection) -> Result<M, Error>;
}

/// filter for Entity r/w
pub trait Filter
where
    Self: EntityTrait,
{
    /// shortcut for empty `find` with read filter applied
    fn read_find(auth: &Auth) -> Result<Select<Self>, Error> {
        Self::read_filter(Self::find(), auth)
    }
    /// read filter
    fn read_filter<S: QueryFilter + Send>(_: S, _: &Auth) -> Result<S, Error> {
        Err(Error::Unauthenticated)
    }
    /// write filter
    fn write_filter<S: QueryFilter + Send>(_: S, _: &Auth) -> Result<S, Error> {
        Err(Error::Unauthenticated)
    }
    /// shortcut for empty `find_by_id` with read filter applied
    fn read_by_id<T>(id: T, auth: &Auth) -> Result<Select<Self>, Error>
    where
        T: Into<<Self::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        Self::read_filter(Self::find_by_id(id), auth)
    }
    /// shortcut for empty `find_by_id` with write filter applied
    fn write_by_id<T>(id: T, auth: &Auth) -> Result<Select<Self>, Error>
    where
        T: Into<<Self::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        Self::write_filter(Self::find_by_id(id), auth)
    }
    /// whether the caller may mutate this row
    fn writable(_model: &Self::Model, _auth: &Auth) -> bool {
        false
    }
}
