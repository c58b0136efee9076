use super::tools::*;

use grpc::backend::testcase_server::*;

use crate::entity::problem;
use crate::entity::testcase::*;

#[async_trait]
impl Testcase for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Testcase/add",
        err(level = "debug", Display)
    )]
    async fn add(&self, req: Request<CreateTestcaseRequest>) -> Result<Response<Id>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            problem::Entity::write_by_id(req.problem_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let info = req.info.ok_or(Error::NotInPayload("info"))?;
            let sequence = Entity::find()
                .filter(Column::ProblemId.eq(req.problem_id))
                .count(self.db.deref())
                .await
                .map_err(Into::<Error>::into)? as u32;

            let model = ActiveModel {
                problem_id: ActiveValue::Set(req.problem_id),
                input: ActiveValue::Set(info.input),
                output: ActiveValue::Set(info.output),
                sequence: ActiveValue::Set(sequence),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::debug!(testcase_id = model.id, "testcase_added");
            Ok(model.id.into())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Testcase/update",
        err(level = "debug", Display)
    )]
    async fn update(&self, req: Request<UpdateTestcaseRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let model = Entity::find_by_id(req.id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            problem::Entity::write_by_id(model.problem_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let mut model: ActiveModel = model.into();
            fill_exist_active_model!(model, req, input, output);
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
        name = "edu.backend.Testcase/remove",
        err(level = "debug", Display)
    )]
    async fn remove(&self, req: Request<RemoveRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.get_or_insert(|req| async move {
            let model = Entity::find_by_id(req.id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            problem::Entity::write_by_id(model.problem_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            Entity::delete_by_id(model.id)
                .exec(self.db.deref())
                .instrument(info_span!("remove").or_current())
                .await
                .map_err(Into::<Error>::into)?;

            tracing::debug!(testcase_id = model.id, "testcase_removed");
            Ok(())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Testcase/list_by_problem",
        err(level = "debug", Display)
    )]
    async fn list_by_problem(
        &self,
        req: Request<Id>,
    ) -> Result<Response<ListTestcaseResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        let id_model = problem::Entity::related_read_by_id(&auth, req.id, &self.db)
            .in_current_span()
            .await?;

        // the browser needs inputs to run the code, canonical outputs
        // stay with the author so they cannot be hardcoded around
        let show_output = auth.perm().admin() || auth.user_id() == Some(id_model.user_id);

        let list = Entity::find()
            .filter(Column::ProblemId.eq(req.id))
            .order_by_asc(Column::Sequence)
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        Ok(Response::new(ListTestcaseResponse {
            list: list
                .into_iter()
                .map(|x| TestcaseFullInfo {
                    id: x.id,
                    info: Some(TestcaseInfo {
                        input: x.input,
                        output: match show_output {
                            true => x.output,
                            false => String::new(),
                        },
                    }),
                    sequence: x.sequence,
                })
                .collect(),
        }))
    }
}
