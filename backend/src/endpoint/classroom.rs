use super::tools::*;

use grpc::backend::classroom_server::*;

use crate::entity::classroom::*;
use crate::entity::{assignment, classroom, enrollment, problem, user};

const JOIN_CODE_LEN: usize = 8;

fn generate_join_code() -> String {
    use rand::{distributions::Alphanumeric, Rng};
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JOIN_CODE_LEN)
        .map(char::from)
        .collect()
}

impl WithAuthTrait for Model {}

impl<'a> From<WithAuth<'a, Model>> for ClassroomFullInfo {
    fn from(value: WithAuth<'a, Model>) -> Self {
        let model = value.1;
        let writable = Entity::writable(&model, value.0);
        ClassroomFullInfo {
            id: model.id,
            info: Some(ClassroomInfo {
                title: model.title,
                description: model.description,
            }),
            host: model.host,
            // the join code is the admission ticket, only the host sees it
            join_code: writable.then_some(model.join_code),
            create_at: Some(into_prost(model.create_at)),
            update_at: Some(into_prost(model.update_at)),
        }
    }
}

#[async_trait]
impl Classroom for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Classroom/create",
        err(level = "debug", Display)
    )]
    async fn create(&self, req: Request<CreateClassroomRequest>) -> Result<Response<Id>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, perm) = auth.assume_login()?;
        if !perm.teacher() {
            return Err(Error::RequirePermission(RoleLv::Teacher).into());
        }

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let info = req.info.ok_or(Error::NotInPayload("info"))?;
            let model = ActiveModel {
                host: ActiveValue::Set(user_id),
                title: ActiveValue::Set(info.title),
                description: ActiveValue::Set(info.description),
                join_code: ActiveValue::Set(generate_join_code()),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::info!(classroom_id = model.id, "classroom_created");
            Ok(model.id.into())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Classroom/update",
        err(level = "debug", Display)
    )]
    async fn update(&self, req: Request<UpdateClassroomRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let model = Entity::write_by_id(req.id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let mut model: ActiveModel = model.into();
            fill_exist_active_model!(model, req, title, description);
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
        name = "edu.backend.Classroom/remove",
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

            enrollment::Entity::delete_many()
                .filter(enrollment::Column::ClassroomId.eq(model.id))
                .exec(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?;
            assignment::Entity::delete_many()
                .filter(assignment::Column::ClassroomId.eq(model.id))
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
                tracing::info!(classroom_id = model.id, "classroom_removed");
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
        name = "edu.backend.Classroom/list",
        err(level = "debug", Display)
    )]
    async fn list(&self, req: Request<()>) -> Result<Response<ListClassroomResponse>, Status> {
        let (auth, _) = self.rate_limit(req).in_current_span().await?;
        let (user_id, perm) = auth.assume_login()?;

        // hosted(or everything for admin), plus enrolled ones
        let mut list = Entity::read_find(&auth)?
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        if !perm.admin() {
            let enrolled = enrollment::Entity::find()
                .filter(enrollment::Column::UserId.eq(user_id))
                .find_also_related(classroom::Entity)
                .all(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?;
            list.extend(enrolled.into_iter().filter_map(|(_, x)| x));
        }
        list.sort_by_key(|x| x.id);
        list.dedup_by_key(|x| x.id);

        Ok(Response::new(ListClassroomResponse {
            list: list
                .into_iter()
                .map(|x| x.with_auth(&auth).into())
                .collect(),
        }))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Classroom/full_info",
        err(level = "debug", Display)
    )]
    async fn full_info(&self, req: Request<Id>) -> Result<Response<ClassroomFullInfo>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        let model = Entity::related_read_by_id(&auth, req.id, &self.db)
            .in_current_span()
            .await?;

        Ok(Response::new(model.with_auth(&auth).into()))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Classroom/join",
        err(level = "debug", Display)
    )]
    async fn join(&self, req: Request<JoinClassroomRequest>) -> Result<Response<Id>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let classroom = Entity::find()
                .filter(Column::JoinCode.eq(req.join_code.as_str()))
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            if classroom.host == user_id {
                return Err(Error::PermissionDeny("host cannot join own classroom"));
            }
            if enrollment::Entity::find()
                .filter(enrollment::Column::ClassroomId.eq(classroom.id))
                .filter(enrollment::Column::UserId.eq(user_id))
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .is_some()
            {
                return Err(Error::AlreadyExist("enrollment"));
            }

            let next_number = enrollment::Entity::find()
                .filter(enrollment::Column::ClassroomId.eq(classroom.id))
                .order_by_desc(enrollment::Column::RosterNumber)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .map(|x| x.roster_number + 1)
                .unwrap_or(1);

            enrollment::ActiveModel {
                classroom_id: ActiveValue::Set(classroom.id),
                user_id: ActiveValue::Set(user_id),
                roster_number: ActiveValue::Set(next_number),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::info!(
                classroom_id = classroom.id,
                roster_number = next_number,
                "student_joined"
            );
            Ok(classroom.id.into())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Classroom/leave",
        err(level = "debug", Display)
    )]
    async fn leave(&self, req: Request<LeaveClassroomRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        req.get_or_insert(|req| async move {
            let result = enrollment::Entity::delete_many()
                .filter(enrollment::Column::ClassroomId.eq(req.classroom_id))
                .filter(enrollment::Column::UserId.eq(user_id))
                .exec(self.db.deref())
                .instrument(info_span!("remove").or_current())
                .await
                .map_err(Into::<Error>::into)?;

            if result.rows_affected == 0 {
                Err(Error::NotInDB)
            } else {
                tracing::info!(classroom_id = req.classroom_id, "student_left");
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
        name = "edu.backend.Classroom/set_roster_number",
        err(level = "debug", Display)
    )]
    async fn set_roster_number(
        &self,
        req: Request<SetRosterNumberRequest>,
    ) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        req.get_or_insert(|req| async move {
            // students renumber themselves, the host renumbers anyone
            if req.user_id != user_id {
                Entity::write_by_id(req.classroom_id, &auth)?
                    .one(self.db.deref())
                    .await
                    .map_err(Into::<Error>::into)?
                    .ok_or(Error::NotInDB)?;
            }

            let row = enrollment::Entity::find()
                .filter(enrollment::Column::ClassroomId.eq(req.classroom_id))
                .filter(enrollment::Column::UserId.eq(req.user_id))
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let mut row: enrollment::ActiveModel = row.into();
            row.roster_number = ActiveValue::Set(req.roster_number);
            row.update(self.db.deref())
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
        name = "edu.backend.Classroom/assign",
        err(level = "debug", Display)
    )]
    async fn assign(&self, req: Request<AssignProblemRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.get_or_insert(|req| async move {
            if req.ai_level > 4 {
                return Err(Error::BadArgument("ai_level"));
            }
            Entity::write_by_id(req.classroom_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;
            problem::Entity::related_read_by_id(&auth, req.problem_id, &self.db)
                .in_current_span()
                .await?;

            match assignment::Entity::by_pairing(req.classroom_id, req.problem_id, self.db.deref())
                .await
            {
                Ok(_) => return Err(Error::AlreadyExist("assignment")),
                Err(Error::NotInDB) => (),
                Err(err) => return Err(err),
            }

            let sequence = assignment::Entity::find()
                .filter(assignment::Column::ClassroomId.eq(req.classroom_id))
                .count(self.db.deref())
                .await
                .map_err(Into::<Error>::into)? as u32;

            assignment::ActiveModel {
                classroom_id: ActiveValue::Set(req.classroom_id),
                problem_id: ActiveValue::Set(req.problem_id),
                ai_level: ActiveValue::Set(req.ai_level),
                gallery: ActiveValue::Set(req.gallery),
                sequence: ActiveValue::Set(sequence),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::info!(
                classroom_id = req.classroom_id,
                problem_id = req.problem_id,
                ai_level = req.ai_level,
                "problem_assigned"
            );
            Ok(())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Classroom/update_assignment",
        err(level = "debug", Display)
    )]
    async fn update_assignment(
        &self,
        req: Request<UpdateAssignmentRequest>,
    ) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.get_or_insert(|req| async move {
            if req.ai_level.unwrap_or_default() > 4 {
                return Err(Error::BadArgument("ai_level"));
            }
            Entity::write_by_id(req.classroom_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let row =
                assignment::Entity::by_pairing(req.classroom_id, req.problem_id, self.db.deref())
                    .await?;

            let mut row: assignment::ActiveModel = row.into();
            fill_exist_active_model!(row, req, ai_level, gallery);
            row.update(self.db.deref())
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
        name = "edu.backend.Classroom/revoke",
        err(level = "debug", Display)
    )]
    async fn revoke(&self, req: Request<RevokeProblemRequest>) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        req.get_or_insert(|req| async move {
            Entity::write_by_id(req.classroom_id, &auth)?
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            let result = assignment::Entity::delete_many()
                .filter(assignment::Column::ClassroomId.eq(req.classroom_id))
                .filter(assignment::Column::ProblemId.eq(req.problem_id))
                .exec(self.db.deref())
                .instrument(info_span!("remove").or_current())
                .await
                .map_err(Into::<Error>::into)?;

            if result.rows_affected == 0 {
                Err(Error::NotInDB)
            } else {
                tracing::info!(
                    classroom_id = req.classroom_id,
                    problem_id = req.problem_id,
                    "problem_revoked"
                );
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
        name = "edu.backend.Classroom/roster",
        err(level = "debug", Display)
    )]
    async fn roster(&self, req: Request<Id>) -> Result<Response<RosterResponse>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;

        Entity::related_read_by_id(&auth, req.id, &self.db)
            .in_current_span()
            .await?;

        let list = enrollment::Entity::find()
            .filter(enrollment::Column::ClassroomId.eq(req.id))
            .find_also_related(user::Entity)
            .order_by_asc(enrollment::Column::RosterNumber)
            .order_by_asc(user::Column::DisplayName)
            .all(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?;

        Ok(Response::new(RosterResponse {
            list: list
                .into_iter()
                .filter_map(|(enrollment, user)| {
                    user.map(|user| StudentInfo {
                        id: user.id,
                        display_name: user.display_name,
                        roster_number: enrollment.roster_number,
                    })
                })
                .collect(),
        }))
    }
}
