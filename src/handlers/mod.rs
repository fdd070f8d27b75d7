pub mod admin;
pub mod auth;
pub mod driver;
pub mod live;
pub mod me;
pub mod shipper;
