use super::error::Result;
use grpc::backend::*;
use quick_cache::sync::Cache;
use std::future::Future;
use uuid::Uuid;

/// idempotent-retry support
///
/// Mutating requests may carry a client generated `request_id`;
/// a replayed id returns the cached response instead of
/// repeating the side effect.
pub trait Cacheable
where
    Self: Sized,
{
    type Item: 'static + Send + Sync + Clone;
    fn get_or_insert<F, Fut>(self, f: F) -> impl Future<Output = Result<Self::Item>>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<Self::Item>>;
}

macro_rules! create_cache {
    ($t:ident, $ret:ty) => {
        create_cache!($t, $ret, 16);
    };
    ($t:ident, $ret:ty, $cap:expr) => {
        paste::paste! {
            struct [<$t Cache>] {
                cache: Cache<Uuid, $ret>,
            }
            lazy_static::lazy_static! {
                static ref [<$t CacheInstance>]: [<$t Cache>]=[<$t Cache>]::new();
            }
            impl [<$t Cache>] {
                fn new() -> Self {
                    Self {
                        cache: Cache::new($cap),
                    }
                }
                async fn get<F, Fut>(&self, uuid: Uuid, f: F) -> Result<$ret>
                where
                    F: FnOnce() -> Fut,
                    Fut: Future<Output = Result<$ret>>,
                {
                    if let Some(x) = self.cache.peek(&uuid) {
                        return Ok(x.clone());
                    }
                    let res = f().await?;
                    self.cache.insert(uuid, res.clone());
                    Ok(res)
                }
            }
            impl Cacheable for $t {
                type Item = $ret;
                async fn get_or_insert<F, Fut>(self, f: F) -> Result<Self::Item>
                where
                    F: FnOnce(Self) -> Fut,
                    Fut: Future<Output = Result<Self::Item>>,
                {
                    match &self.request_id{
                        Some(x) => [<$t CacheInstance>]
                            .get(Uuid::parse_str(x)?, || f(self))
                            .await,
                        None=> f(self).await
                    }
                }
            }
        }
    };
}

create_cache!(LoginRequest, TokenInfo, 8);

create_cache!(CreateUserRequest, Id);
create_cache!(CreateClassroomRequest, Id);
create_cache!(CreateProblemRequest, Id);
create_cache!(CreateTestcaseRequest, Id);
create_cache!(JoinClassroomRequest, Id);
create_cache!(CreateSubmitRequest, SubmitResult);

create_cache!(UpdatePasswordRequest, ());
create_cache!(UpdateClassroomRequest, ());
create_cache!(UpdateProblemRequest, ());
create_cache!(UpdateTestcaseRequest, ());
create_cache!(ReviewSubmitRequest, ());
create_cache!(RemoveRequest, ());
create_cache!(LeaveClassroomRequest, ());
create_cache!(SetRosterNumberRequest, ());
create_cache!(AssignProblemRequest, ());
create_cache!(UpdateAssignmentRequest, ());
create_cache!(RevokeProblemRequest, ());
