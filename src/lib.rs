pub mod alerts;
pub mod auth;
pub mod calendar;
pub mod companies;
pub mod config;
pub mod directory;
pub mod requests;
pub mod shared;
