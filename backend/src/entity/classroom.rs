use tracing::instrument;

use super::*;
use crate::util::auth::RoleLv;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "classroom")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub host: i32,
    pub title: String,
    pub description: String,
    pub join_code: String,
    #[sea_orm(column_type = "Time")]
    pub create_at: chrono::NaiveDateTime,
    #[sea_orm(column_type = "Time", on_update = "current_timestamp")]
    pub update_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignment,
    #[sea_orm(has_many = "super::chat::Entity")]
    Chat,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollment,
    #[sea_orm(has_many = "super::submit::Entity")]
    Submit,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::Host",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl Related<super::submit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submit.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// read scoped to membership: the host, an admin, or an enrolled student
#[async_trait]
impl ParentalTrait<Model> for Entity {
    #[instrument(skip_all, level = "debug")]
    async fn related_read_by_id(
        auth: &Auth,
        id: i32,
        db: &DatabaseConnection,
    ) -> Result<Model, Error> {
        let (user_id, perm) = auth.assume_login()?;
        let model = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(Error::NotInDB)?;
        if perm.admin() || model.host == user_id {
            return Ok(model);
        }
        enrollment::Entity::find()
            .filter(enrollment::Column::ClassroomId.eq(id))
            .filter(enrollment::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(Error::NotInDB)?;
        Ok(model)
    }
}

impl Filter for Entity {
    #[instrument(skip_all, level = "debug")]
    fn read_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        let (user_id, perm) = auth.assume_login()?;
        Ok(match perm {
            RoleLv::Admin | RoleLv::Root => query,
            _ => query.filter(Column::Host.eq(user_id)),
        })
    }
    #[instrument(skip_all, level = "debug")]
    fn write_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        let (user_id, perm) = auth.assume_login()?;
        if perm.admin() {
            return Ok(query);
        }
        if perm.teacher() {
            return Ok(query.filter(Column::Host.eq(user_id)));
        }
        Err(Error::RequirePermission(RoleLv::Teacher))
    }
    fn writable(model: &Self::Model, auth: &Auth) -> bool {
        auth.perm().admin() || (auth.user_id() == Some(model.host) && auth.perm().teacher())
    }
}
