use super::tools::*;

use grpc::backend::token_server::*;

#[async_trait]
impl Token for ArcServer {
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Token/create",
        err(level = "debug", Display)
    )]
    async fn create(&self, req: Request<LoginRequest>) -> Result<Response<TokenInfo>, Status> {
        let (_, req) = self.rate_limit(req).in_current_span().await?;

        req.bound_check()?;

        req.get_or_insert(|req| async move {
            let (bearer, role, expiry) = self
                .session
                .login(
                    &self.db,
                    &self.crypto,
                    &req.username,
                    &req.password,
                    req.expiry_secs,
                )
                .in_current_span()
                .await
                .map_err(Into::<Error>::into)?;

            tracing::debug!(role = %role, "token_created");

            Ok(TokenInfo {
                token: bearer,
                role: Role::from(role) as i32,
                expiry: Some(into_prost(expiry)),
            })
        })
        .await
        .with_grpc()
        .into()
    }
    #[instrument(
        skip_all,
        level = "info",
        name = "edu.backend.Token/logout",
        err(level = "debug", Display)
    )]
    async fn logout(&self, req: Request<()>) -> Result<Response<()>, Status> {
        let bearer = req
            .metadata()
            .get("token")
            .and_then(|x| x.to_str().ok())
            .map(ToOwned::to_owned)
            .ok_or(Error::Unauthenticated)?;

        self.rate_limit(req).in_current_span().await?;

        self.session
            .logout(&self.db, &self.crypto, &bearer)
            .in_current_span()
            .await
            .map_err(Into::<Error>::into)?;

        tracing::debug!("token_removed");
        Ok(Response::new(()))
    }
}
