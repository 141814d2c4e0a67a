//! # Confman Common Library
//!
//! Shared code for the conference management service:
//! - Error type and result alias
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Data model enums, state machines and records
//! - Database schema initialization
//! - Credential primitives (password hashing, signed tokens, verification codes)

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
