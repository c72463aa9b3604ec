//! Core types and storage for gemchat
//!
//! This crate provides the conversation model, configuration, logging setup
//! and the on-disk session store shared by the provider and CLI crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, ExportError, LoadError, Result, SaveError, StoreError};
