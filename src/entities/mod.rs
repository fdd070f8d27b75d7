pub mod credential;
pub mod driver_details;
pub mod load;
pub mod load_bid;
pub mod notification;
pub mod profile;
pub mod sub_driver;
pub mod support_ticket;
pub mod truck;
pub mod user_role;

pub use load::{BodyType, LoadStatus};
pub use truck::TruckType;
pub use user_role::Role;
