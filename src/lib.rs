pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod query;
pub mod routes;
pub mod store;
pub mod utils;
pub mod validation;
