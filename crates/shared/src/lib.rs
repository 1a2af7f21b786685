//! Shared types and configuration for Fintra.
//!
//! This crate provides common types used across all other crates:
//! - Currency and money types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
