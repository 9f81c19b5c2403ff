//! Book club API: shared library, book catalog, reviews, quotes, friends,
//! and nightly-refreshed reading recommendations.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod stores;
