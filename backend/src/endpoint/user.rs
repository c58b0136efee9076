use super::tools::*;

use grpc::backend::user_server::*;

use crate::entity::token;
use crate::entity::user::*;

impl From<Model> for UserFullInfo {
    fn from(model: Model) -> Self {
        UserFullInfo {
            id: model.id,
            info: Some(UserInfo {
                username: model.username,
                display_name: model.display_name,
                role: Role::from(RoleLv::try_from(model.role).unwrap_or(RoleLv::Student)) as i32,
            }),
            create_at: Some(into_prost(model.create_at)),
        }
    }
}

#[async_trait]
impl User for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.User/create",
        err(level = "debug", Display)
    )]
    async fn create(&self, req: Request<CreateUserRequest>) -> Result<Response<Id>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (_, perm) = auth.assume_login()?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let info = req.info.ok_or(Error::NotInPayload("info"))?;
            let new_role = RoleLv::from(info.role());

            // teachers enroll their students, everything above needs an admin
            // who outranks the new account
            match new_role {
                RoleLv::Student => {
                    if !perm.teacher() {
                        return Err(Error::RequirePermission(RoleLv::Teacher));
                    }
                }
                _ => {
                    if !perm.admin() || perm < new_role {
                        return Err(Error::RequirePermission(RoleLv::Admin));
                    }
                }
            }

            if Entity::find()
                .filter(Column::Username.eq(info.username.as_str()))
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .is_some()
            {
                return Err(Error::AlreadyExist("username"));
            }

            let model = ActiveModel {
                role: ActiveValue::Set(new_role as i32),
                username: ActiveValue::Set(info.username),
                display_name: ActiveValue::Set(info.display_name),
                password: ActiveValue::Set(self.crypto.hash(&req.password)),
                ..Default::default()
            }
            .insert(self.db.deref())
            .instrument(info_span!("save").or_current())
            .await
            .map_err(Into::<Error>::into)?;

            tracing::info!(user_id = model.id, "user_created");
            Ok(model.id.into())
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.User/full_info",
        err(level = "debug", Display)
    )]
    async fn full_info(&self, req: Request<Id>) -> Result<Response<UserFullInfo>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, perm) = auth.assume_login()?;

        if req.id != user_id && !perm.teacher() {
            return Err(Error::PermissionDeny("cannot read other accounts").into());
        }

        let model = Entity::find_by_id(req.id)
            .one(self.db.deref())
            .await
            .map_err(Into::<Error>::into)?
            .ok_or(Error::NotInDB)?;

        Ok(Response::new(model.into()))
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.User/update_password",
        err(level = "debug", Display)
    )]
    async fn update_password(
        &self,
        req: Request<UpdatePasswordRequest>,
    ) -> Result<Response<()>, Status> {
        let (auth, req) = self.rate_limit(req).in_current_span().await?;
        let (user_id, _) = auth.assume_login()?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let model = Entity::find_by_id(user_id)
                .one(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .ok_or(Error::NotInDB)?;

            if !self.crypto.hash_eq(&req.current, &model.password) {
                return Err(Error::PermissionDeny("wrong password"));
            }

            let mut model: ActiveModel = model.into();
            model.password = ActiveValue::Set(self.crypto.hash(&req.updated));
            model
                .update(self.db.deref())
                .instrument(info_span!("save").or_current())
                .await
                .map_err(Into::<Error>::into)?;

            // every existing session dies with the old password
            let stale: Vec<i32> = token::Entity::find()
                .filter(token::Column::UserId.eq(user_id))
                .all(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?
                .into_iter()
                .map(|x| x.id)
                .collect();
            token::Entity::delete_many()
                .filter(token::Column::UserId.eq(user_id))
                .exec(self.db.deref())
                .await
                .map_err(Into::<Error>::into)?;
            self.session.evict_user(&stale);

            tracing::info!(user_id = user_id, "password_updated");
            Ok(())
        })
        .await
        .with_grpc()
        .into()
    }
}
