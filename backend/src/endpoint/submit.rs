use std::collections::BTreeMap;

use super::tools::*;

use grpc::backend::submit_server::*;

use crate::controller::judge;
use crate::entity::submit::*;
use crate::entity::{assignment, classroom, enrollment, problem, testcase, user};

impl From<Model> for SubmitInfo {
    fn from(model: Model) -> Self {
        SubmitInfo {
            id: model.id,
            user_id: model.user_id,
            problem_id: model.problem_id,
            accept: model.accept,
            pass_case: model.pass_case,
            upload_at: Some(into_prost(model.upload_at)),
            score: model.score,
            grade: model.grade,
            has_feedback: model.feedback.is_some(),
        }
    }
}

async fn assert_enrolled(
    classroom_id: i32,
    user_id: i32,
    db: &DatabaseConnection,
) -> Result<(), Error> {
    enrollment::Entity::find()
        .filter(enrollment::Column::ClassroomId.eq(classroom_id))
        .filter(enrollment::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::PermissionDeny("not enrolled in this classroom"))?;
    Ok(())
}

#[async_trait]
impl Submit for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Submit/create",
        err(level = "debug", Display)
    )]
    async fn create(
        &self,
        req: Request<CreateSubmitRequest>,
    ) -> Result<Response<SubmitResult>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            assert_enrolled(req.classroom_id, user_id, self.db.deref()).await?;
            assignment::Entity::by_pairing(req.classroom_id, req.problem_id, self.db.deref())
                .await?;

            let problem = problem::Entity::find_by_id(req.problem_id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;
            let cases = testcase::Entity::find()
                .filter(testcase::Column::ProblemId.eq(req.problem_id))
                .order_by_asc(testcase::Column::Sequence)
                .all(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?;
            if cases.is_empty() {
                return Err(Error::BadArgument("problem has no testcase"));
            }

            let expected: Vec<&str> = cases.iter().map(|x| x.output.as_str()).collect();
            let actual: Vec<&str> = req.outputs.iter().map(String::as_str).collect();
            let verdict = judge::judge(problem.match_rule.into(), &expected, &actual);

            let model = ActiveModel {
                user_id: ActiveValue::Set(user_id),
                problem_id: ActiveValue::Set(req.problem_id),
                classroom_id: ActiveValue::Set(req.classroom_id),
                upload_at: ActiveValue::Set(chrono::Utc::now().naive_utc()),
                committed: ActiveValue::Set(true),
                code: ActiveValue::Set(req.code),
                pass_case: ActiveValue::Set(verdict.pass_case),
                total_case: ActiveValue::Set(verdict.total_case),
                accept: ActiveValue::Set(verdict.accept),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::info!(
                submit_id = model.id,
                accept = verdict.accept,
                pass_case = verdict.pass_case,
                "submit_created"
            );
            Ok(SubmitResult {
                id: model.id,
                accept: verdict.accept,
                pass_case: verdict.pass_case,
                total_case: verdict.total_case,
            })
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Submit/full_info",
        err(level = "debug", Display)
    )]
    async fn full_info(&self, req: Request<Id>) -> Result<Response<SubmitFullInfo>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        let model = Entity::find_by_id(req.id)
            .one(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?
            .ok_or(Error::NotInDB)?;

        if auth.user_id() != Some(model.user_id) && !auth.perm().admin() {
            let classroom = classroom::Entity::find_by_id(model.classroom_id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;
            // do not leak existence to outsiders
            if auth.user_id() != Some(classroom.host) {
                return Err(Error::NotInDB.into());
            }
        }

        let code = model.code.clone();
        let feedback = model.feedback.clone();
        Ok(Response::new(SubmitFullInfo {
            info: Some(model.into()),
            code,
            feedback,
        }))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Submit/list_mine",
        err(level = "debug", Display)
    )]
    async fn list_mine(
        &self,
        req: Request<ListSubmitRequest>,
    ) -> Result<Response<ListSubmitResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        let list = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ClassroomId.eq(req.classroom_id))
            .filter(Column::ProblemId.eq(req.problem_id))
            .order_by_desc(Column::UploadAt)
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        Ok(Response::new(ListSubmitResponse {
            list: list.into_iter().map(Into::into).collect(),
        }))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Submit/review",
        err(level = "debug", Display)
    )]
    async fn review(&self, req: Request<ReviewSubmitRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let model = Entity::find_by_id(req.id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let classroom = classroom::Entity::find_by_id(model.classroom_id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;
            if !classroom::Entity::writable(&classroom, &auth) {
                return Err(Error::PermissionDeny("only the host may review"));
            }

            let mut model: ActiveModel = model.into();
            if let Some(x) = req.score {
                model.score = ActiveValue::Set(Some(x));
            }
            if let Some(x) = req.grade {
                model.grade = ActiveValue::Set(Some(x));
            }
            if let Some(x) = req.feedback {
                model.feedback = ActiveValue::Set(Some(x));
            }
            model
                .update(self.db.deref())
                .instrument(info_span!("save").or_current())
                .await
                .map_err(Into::<Error>::into)?;

            tracing::info!(submit_id = req.id, "submit_reviewed");
            Ok(())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Submit/gallery",
        err(level = "debug", Display)
    )]
    async fn gallery(&self, req: Request<GalleryRequest>) -> Result<Response<GalleryResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        classroom::Entity::related_read_by_id(&auth, req.classroom_id, &self.db)
            .in_current_span()
            .await?;
        let pairing =
            assignment::Entity::by_pairing(req.classroom_id, req.problem_id, self.db.deref())
                .await?;
        if !pairing.gallery {
            return Err(Error::PermissionDeny("gallery is disabled for this assignment").into());
        }

        let rows = Entity::find()
            .filter(Column::ClassroomId.eq(req.classroom_id))
            .filter(Column::ProblemId.eq(req.problem_id))
            .filter(Column::Accept.eq(true))
            .filter(Column::Committed.eq(true))
            .order_by_asc(Column::UploadAt)
            .find_also_related(user::Entity)
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        // latest passing attempt per student, in user id order
        let mut latest: BTreeMap<i32, GalleryEntry> = BTreeMap::new();
        for (submit, user) in rows {
            let Some(user) = user else { continue };
            latest.insert(
                submit.user_id,
                GalleryEntry {
                    user_id: submit.user_id,
                    display_name: user.display_name,
                    code: submit.code,
                    upload_at: Some(into_prost(submit.upload_at)),
                },
            );
        }

        Ok(Response::new(GalleryResponse {
            list: latest.into_values().collect(),
        }))
    }
}
