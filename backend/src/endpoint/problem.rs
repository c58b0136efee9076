use super::tools::*;

use grpc::backend::problem_server::*;

use crate::entity::problem::*;
use crate::entity::{assignment, classroom, problem, testcase};

const LIST_SIZE_MAX: u64 = 128;

impl WithAuthTrait for Model {}

impl<'a> From<WithAuth<'a, Model>> for ProblemFullInfo {
    fn from(value: WithAuth<'a, Model>) -> Self {
        let model = value.1;
        ProblemFullInfo {
            id: model.id,
            info: Some(ProblemInfo {
                title: model.title,
                difficulty: model.difficulty,
                category: model.category,
            }),
            content: model.content,
            match_rule: model.match_rule,
            public: model.public,
            author: model.user_id,
            create_at: Some(into_prost(model.create_at)),
            update_at: Some(into_prost(model.update_at)),
        }
    }
}

fn into_entry(model: Model) -> ProblemEntry {
    ProblemEntry {
        id: model.id,
        info: Some(ProblemInfo {
            title: model.title,
            difficulty: model.difficulty,
            category: model.category,
        }),
        public: model.public,
    }
}

#[async_trait]
impl Problem for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Problem/create",
        err(level = "debug", Display)
    )]
    async fn create(&self, req: Request<CreateProblemRequest>) -> Result<Response<Id>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, perm) = auth.assume_login()?;
        if !perm.teacher() {
            return Err(Error::RequirePermission(RoleLv::Teacher).into());
        }

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let info = req.info.ok_or(Error::NotInPayload("info"))?;
            if info.difficulty == 0 {
                return Err(Error::BadArgument("difficulty"));
            }

            let model = ActiveModel {
                user_id: ActiveValue::Set(user_id),
                title: ActiveValue::Set(info.title),
                difficulty: ActiveValue::Set(info.difficulty),
                category: ActiveValue::Set(info.category),
                content: ActiveValue::Set(req.content),
                match_rule: ActiveValue::Set(req.match_rule),
                public: ActiveValue::Set(req.public),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::info!(problem_id = model.id, "problem_created");
            Ok(model.id.into())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Problem/update",
        err(level = "debug", Display)
    )]
    async fn update(&self, req: Request<UpdateProblemRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            if req.difficulty == Some(0) {
                return Err(Error::BadArgument("difficulty"));
            }
            let model = Entity::write_by_id(req.id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let mut model: ActiveModel = model.into();
            fill_exist_active_model!(
                model, req, title, difficulty, category, content, match_rule, public
            );
            model
                .update(self.db.deref())
                .instrument(info_span!("save").or_current())
                .await
                .map_err(Into::<Error>::into)?;
            Ok(())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Problem/remove",
        err(level = "debug", Display)
    )]
    async fn remove(&self, req: Request<RemoveRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.get_or_insert(|req| async move {
            let model = Entity::write_by_id(req.id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            testcase::Entity::delete_many()
                .filter(testcase::Column::ProblemId.eq(model.id))
                .exec(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?;
            assignment::Entity::delete_many()
                .filter(assignment::Column::ProblemId.eq(model.id))
                .exec(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?;

            let result = Entity::delete_by_id(model.id)
                .with_auth(&auth)
                .write()?
                .exec(self.db.deref())
                .instrument(info_span!("remove").or_current())
                .await
                .map_err(Into::<Error>::into)?;

            if result.rows_affected == 0 {
                Err(Error::NotInDB)
            } else {
                tracing::info!(problem_id = model.id, "problem_removed");
                Ok(())
            }
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Problem/full_info",
        err(level = "debug", Display)
    )]
    async fn full_info(&self, req: Request<Id>) -> Result<Response<ProblemFullInfo>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        problem::Entity::related_read_by_id(&auth, req.id, &self.db)
            .in_current_span()
            .await?;

        let model = Entity::find_by_id(req.id)
            .one(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?
            .ok_or(Error::NotInDB)?;

        Ok(Response::new(model.with_auth(&auth).into()))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Problem/list",
        err(level = "debug", Display)
    )]
    async fn list(
        &self,
        req: Request<ListProblemRequest>,
    ) -> Result<Response<ListProblemResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        match req.classroom_id {
            Some(classroom_id) => {
                classroom::Entity::related_read_by_id(&auth, classroom_id, &self.db)
                    .in_current_span()
                    .await?;

                let list: Vec<ProblemEntry> = assignment::Entity::find()
                    .filter(assignment::Column::ClassroomId.eq(classroom_id))
                    .find_also_related(problem::Entity)
                    .order_by_asc(assignment::Column::Sequence)
                    .all(self.db.deref())
                    .await
                    .map_err(Into::<Error>::into)?
                    .into_iter()
                    .filter_map(|(_, problem)| problem.map(into_entry))
                    .collect();

                Ok(Response::new(ListProblemResponse { list, remain: 0 }))
            }
            None => {
                let size = req.size.min(LIST_SIZE_MAX);
                let query = Entity::find().with_auth(&auth).read()?;
                let total = query
                    .clone()
                    .count(self.db.deref())
                    .await
                    .map_err(Into::<Error>::into)?;
                let list: Vec<ProblemEntry> = query
                    .order_by_asc(Column::Id)
                    .offset(req.offset)
                    .limit(size)
                    .all(self.db.deref())
                    .await
                    .map_err(Into::<Error>::into)?
                    .into_iter()
                    .map(into_entry)
                    .collect();

                let remain = total.saturating_sub(req.offset + list.len() as u64);
                Ok(Response::new(ListProblemResponse { list, remain }))
            }
        }
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Problem/generate",
        err(level = "debug", Display)
    )]
    async fn generate(
        &self,
        req: Request<GenerateProblemRequest>,
    ) -> Result<Response<GeneratedProblem>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (_, perm) = auth.assume_login()?;
        if !perm.teacher() {
            return Err(Error::RequirePermission(RoleLv::Teacher).into());
        }

        req.bound_check()?;

        let (title, content) = self
            .coach
            .generate_problem(&req.category, req.difficulty.max(1), &req.brief)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?;

        Ok(Response::new(GeneratedProblem {
            info: Some(ProblemInfo {
                title,
                difficulty: req.difficulty.max(1),
                category: req.category,
            }),
            content,
        }))
    }
}
