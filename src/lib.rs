pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
