use tracing::instrument;

use super::*;

/// (classroom, problem) pairing, carries the coach level and the
/// peer gallery switch for that pairing
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "assignment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub classroom_id: i32,
    pub problem_id: i32,
    pub ai_level: u32,
    pub gallery: bool,
    pub sequence: u32,
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

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// the pairing row, or `NotInDB` when the problem is not
    /// assigned to the classroom
    #[instrument(skip_all, level = "debug")]
    pub async fn by_pairing(
        classroom_id: i32,
        problem_id: i32,
        db: &DatabaseConnection,
    ) -> Result<Model, Error> {
        Entity::find()
            .filter(Column::ClassroomId.eq(classroom_id))
            .filter(Column::ProblemId.eq(problem_id))
            .one(db)
            .await?
            .ok_or(Error::NotInDB)
    }
}

impl Filter for Entity {
    #[instrument(skip_all, level = "debug")]
    fn read_filter<S: QueryFilter + Send>(query: S, _: &Auth) -> Result<S, Error> {
        Ok(query)
    }
    #[instrument(skip_all, level = "debug")]
    fn write_filter<S: QueryFilter + Send>(query: S, auth: &Auth) -> Result<S, Error> {
        if auth.perm().admin() {
            return Ok(query);
        }
        Err(Error::Unauthenticated)
    }
}
