//! collection of endpoint implementation from high level
//!
//! We don't use helper or some extra trait
//!
//! It's a decision to avoid coupling between each endpoint
mod chat;
mod classroom;
mod dashboard;
mod problem;
mod submit;
mod testcase;
mod token;
mod user;

pub(crate) mod tools {
    pub use crate::NonZeroU32;
    pub use grpc::backend::{Id, Order, *};
    pub use sea_orm::*;
    pub use std::ops::Deref;
    pub use tonic::*;
    pub use tracing::*;

    pub use crate::entity::util::filter::*;
    pub use crate::entity::{Filter, ParentalTrait};
    pub use crate::util::{
        auth::{Auth, RoleLv},
        bound::BoundCheck,
        duplicate::*,
        error::Error,
        rate_limit::RateLimit,
        time::*,
        with::*,
    };
    pub use crate::{fill_active_model, fill_exist_active_model, server::ArcServer, TonicStream};
    pub use tracing::{Instrument, Level};
}
