//! Data access layer.
//!
//! One repository per area. Each operation maps a single domain intent to a
//! store query, reshapes the result, and publishes a change event on the
//! [`ChangeHub`](crate::realtime::ChangeHub) once a mutation has been
//! accepted. Failures are returned to the caller as-is: no retries.

pub mod auth;
pub mod bids;
pub mod fleet;
pub mod loads;
pub mod notifications;
pub mod profiles;
pub mod stats;
pub mod tickets;

use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

use crate::entities::profile;

pub use auth::{AuthService, AuthenticatedUser, RegisterInput};
pub use bids::BidRepository;
pub use fleet::{FleetRepository, NewSubDriver, NewTruck};
pub use loads::{LoadRepository, PostLoad};
pub use notifications::NotificationRepository;
pub use profiles::{ProfileChanges, ProfileRepository};
pub use stats::{AdminStats, DriverStats, ShipperStats, StatsRepository};
pub use tickets::TicketRepository;

pub(crate) fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

/// Public fields of a profile shown next to loads and drivers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<profile::Model> for ProfileSummary {
    fn from(p: profile::Model) -> Self {
        Self {
            full_name: p.full_name,
            phone: p.phone,
            email: p.email,
            avatar_url: p.avatar_url,
        }
    }
}
