pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod csrf;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
