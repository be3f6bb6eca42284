//! Autostelle parking access admin server
//!
//! Operators sign in, reserve parking by binding an RFID tag to a name and a
//! plate, manage the authorized tags and watch slot occupancy. All shared
//! state lives in a realtime tree database that the gate hardware also reads
//! and writes.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
