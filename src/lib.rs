//! Library exports for the bookmark service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod form;
pub mod handler;
pub mod list;
pub mod middleware;
pub mod model;
pub mod page;
pub mod route;
pub mod store;
