// src/handlers.rs

pub mod auth;
pub mod credits;
pub mod modules;
pub mod organizations;
pub mod payment;
