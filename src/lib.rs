//! Guidepost backend library
//!
//! This module exports the core components for testing and integration.

pub mod availability;
pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod logging;
pub mod server;
pub mod types;
