use tracing::instrument;

use super::*;
use crate::util::auth::RoleLv;

/// which side of the thread wrote a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Author {
    Student = 0,
    Coach = 1,
}

impl From<Author> for i32 {
    fn from(value: Author) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for Author {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Author::Student),
            1 => Ok(Author::Coach),
            _ => Err(Error::Unreachable("Invalid chat author")),
        }
    }
}

/// one message of an AI coach thread
///
/// `payload` is the raw client JSON(`{"text": ..., "context": ...}`),
/// kept verbatim so the dashboard can rescan history with newer
/// phrase lists
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "chat")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub problem_id: i32,
    pub classroom_id: i32,
    pub role: i32,
    pub payload: String,
    #[sea_orm(column_type = "Time")]
    pub create_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::classroom::Entity",
        from = "Column::ClassroomId",
        to = "super::classroom::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Classroom,
    #[sea_orm(
        belongs_to = "super::problem::Entity",
        from = "Column::ProblemId",
        to = "super::problem::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Problem,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,
}

impl Related<super::classroom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classroom.def()
    }
}

impl Related<super::problem::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Problem.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Filter for Entity {
    #[instrument(skip_all, level = "debug")]
    fn read_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        let (user_id, perm) = auth.assume_login()?;
        Ok(match perm {
            RoleLv::Admin | RoleLv::Root => query,
            _ => query.filter(Column::UserId.eq(user_id)),
        })
    }
    #[instrument(skip_all, level = "debug")]
    fn write_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        if auth.perm().admin() {
            return Ok(query);
        }
        Err(Error::RequirePermission(RoleLv::Admin))
    }
}
