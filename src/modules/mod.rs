//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for external services such as blob storage.

pub mod storage;
