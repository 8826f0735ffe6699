pub mod auth;
pub mod catalog;
pub mod credit;
pub mod events;
pub mod finance;
pub mod organization;
pub mod provisioning;
