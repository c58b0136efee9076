use tracing::instrument;

use super::*;
use crate::util::auth::RoleLv;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub difficulty: u32,
    pub category: String,
    pub match_rule: i32,
    pub public: bool,
    #[sea_orm(column_type = "Time")]
    pub create_at: chrono::NaiveDateTime,
    #[sea_orm(column_type = "Time", on_update = "current_timestamp")]
    pub update_at: chrono::NaiveDateTime,
}

/// A partial model with only enough information to check visibility
#[derive(DerivePartialModel, FromQueryResult)]
#[sea_orm(entity = "Entity")]
pub struct IdModel {
    pub id: i32,
    pub user_id: i32,
    pub public: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignment,
    #[sea_orm(has_many = "super::chat::Entity")]
    Chat,
    #[sea_orm(has_many = "super::submit::Entity")]
    Submit,
    #[sea_orm(has_many = "super::testcase::Entity")]
    Testcase,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
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

impl Related<super::submit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submit.def()
    }
}

impl Related<super::testcase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Testcase.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// public problems are readable by anyone signed in, private ones by the
/// author, an admin, or a student whose classroom got it assigned
#[async_trait]
impl ParentalTrait<IdModel> for Entity {
    #[instrument(skip_all, level = "debug")]
    async fn related_read_by_id(
        auth: &Auth,
        id: i32,
        db: &DatabaseConnection,
    ) -> Result<IdModel, Error> {
        let model: IdModel = Entity::find_by_id(id)
            .into_partial_model()
            .one(db)
            .await?
            .ok_or(Error::NotInDB)?;
        if model.public {
            return Ok(model);
        }
        let (user_id, perm) = auth.assume_login()?;
        if perm.admin() || model.user_id == user_id {
            return Ok(model);
        }
        let classrooms: Vec<i32> = enrollment::Entity::find()
            .filter(enrollment::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|x| x.classroom_id)
            .collect();
        assignment::Entity::find()
            .filter(assignment::Column::ProblemId.eq(id))
            .filter(assignment::Column::ClassroomId.is_in(classrooms))
            .one(db)
            .await?
            .ok_or(Error::NotInDB)?;
        Ok(model)
    }
}

impl Filter for Entity {
    #[instrument(skip_all, level = "debug")]
    fn read_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        Ok(match auth.perm() {
            RoleLv::Guest => query.filter(Column::Public.eq(true)),
            RoleLv::Admin | RoleLv::Root => query,
            _ => query.filter(
                Column::Public
                    .eq(true)
                    .or(Column::UserId.eq(auth.user_id().unwrap())),
            ),
        })
    }
    #[instrument(skip_all, level = "debug")]
    fn write_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        let (user_id, perm) = auth.assume_login()?;
        if perm.admin() {
            return Ok(query);
        }
        if perm.teacher() {
            return Ok(query.filter(Column::UserId.eq(user_id)));
        }
        Err(Error::RequirePermission(RoleLv::Teacher))
    }
    fn writable(model: &Self::Model, auth: &Auth) -> bool {
        auth.perm().admin() || (auth.user_id() == Some(model.user_id) && auth.perm().teacher())
    }
}
