#![doc = "The `reminderd` library crate."]
#![doc = ""]
#![doc = "Task storage with a per-owner copy and a flat index, an email reminder pipeline"]
#![doc = "over the flat index, bearer-token authentication with role checks, and the"]
#![doc = "actix-web routing that exposes them. The binary (`main.rs`) wires these together"]
#![doc = "and runs the periodic reminder loop."]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod reminder;
pub mod routes;
pub mod service;
pub mod store;

pub use crate::error::AppError;
