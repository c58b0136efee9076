use std::num::NonZeroU32;

use super::auth::Auth;
use crate::{
    controller::rate_limit::{Bucket, TrafficType},
    server::Server,
};
use grpc::backend::{Id, *};
use tracing::*;

impl Server {
    /// resolve authentication and pick the caller's rate limit bucket
    #[instrument(skip_all, level = "debug")]
    pub async fn parse_auth<T>(
        &self,
        req: &tonic::Request<T>,
    ) -> Result<(Auth, Bucket), tonic::Status> {
        let mut auth = Auth::Guest;

        let bucket = self
            .rate_limit
            .check(req, |_| async {
                if let Some(x) = req.metadata().get("token") {
                    let token = x.to_str().unwrap_or_default();

                    match self
                        .session
                        .verify(&self.db, &self.crypto, token)
                        .in_current_span()
                        .await
                    {
                        Ok(user) => {
                            tracing::debug!(user_id = user.0);
                            auth = Auth::User(user);
                            TrafficType::Login(user.0)
                        }
                        Err(err) => {
                            tracing::debug!(msg = err.to_string());
                            TrafficType::Blacklist(err)
                        }
                    }
                } else {
                    tracing::debug!("token_missing");
                    TrafficType::Guest
                }
            })
            .in_current_span()
            .await?;
        tracing::debug!(auth = %auth);
        Ok((auth, bucket))
    }
    /// parse request, charging a flat cost
    #[inline]
    pub async fn parse_request_n<T>(
        &self,
        req: tonic::Request<T>,
        permit: NonZeroU32,
    ) -> Result<(Auth, T), tonic::Status> {
        let (auth, bucket) = self.parse_auth(&req).await?;

        bucket.cost(permit)?;

        Ok((auth, req.into_inner()))
    }
    /// parse request, charging the payload's own cost
    #[instrument(skip_all, level = "info", fields(cost))]
    pub async fn rate_limit<T: RateLimit>(
        &self,
        req: tonic::Request<T>,
    ) -> Result<(Auth, T), tonic::Status> {
        let (auth, bucket) = self.parse_auth(&req).await?;
        bucket.cost(NonZeroU32::new(3).unwrap())?;
        let req = req.into_inner();

        if let Some(cost) = NonZeroU32::new(req.get_cost()) {
            Span::current().record("cost", cost.saturating_add(3).get());
            bucket.cost(cost)?;
        } else {
            Span::current().record("cost", 3);
        }

        Ok((auth, req))
    }
}

pub trait RateLimit {
    fn get_cost(&self) -> u32 {
        10
    }
}

impl RateLimit for () {}
impl RateLimit for Id {}
impl RateLimit for RemoveRequest {}

impl RateLimit for LoginRequest {
    fn get_cost(&self) -> u32 {
        50
    }
}
impl RateLimit for UpdatePasswordRequest {
    fn get_cost(&self) -> u32 {
        230
    }
}

macro_rules! impl_basic_rate_limit {
    ($t:ident) => {
        paste::paste! {
            impl RateLimit for [<Create $t Request>]{
                fn get_cost(&self) -> u32 {
                    17
                }
            }
            impl RateLimit for [<Update $t Request>]{
                fn get_cost(&self) -> u32 {
                    15
                }
            }
        }
    };
}
impl RateLimit for CreateUserRequest {
    fn get_cost(&self) -> u32 {
        17
    }
}
impl_basic_rate_limit!(Classroom);
impl_basic_rate_limit!(Problem);
impl_basic_rate_limit!(Testcase);

impl RateLimit for JoinClassroomRequest {}
impl RateLimit for LeaveClassroomRequest {}
impl RateLimit for SetRosterNumberRequest {}
impl RateLimit for AssignProblemRequest {}
impl RateLimit for UpdateAssignmentRequest {}
impl RateLimit for RevokeProblemRequest {}

impl RateLimit for ListProblemRequest {
    fn get_cost(&self) -> u32 {
        self.size
            .saturating_add(self.offset / 7)
            .saturating_add(5)
            .min(u32::MAX as u64) as u32
    }
}

impl RateLimit for CreateSubmitRequest {
    fn get_cost(&self) -> u32 {
        60
    }
}
impl RateLimit for ListSubmitRequest {}
impl RateLimit for ReviewSubmitRequest {
    fn get_cost(&self) -> u32 {
        15
    }
}
impl RateLimit for GalleryRequest {}

impl RateLimit for SendChatRequest {
    fn get_cost(&self) -> u32 {
        30
    }
}
impl RateLimit for ChatHistoryRequest {}

impl RateLimit for GenerateProblemRequest {
    fn get_cost(&self) -> u32 {
        430
    }
}

// the dashboard fans out four queries and a full grid derivation
impl RateLimit for MatrixRequest {
    fn get_cost(&self) -> u32 {
        25
    }
}
