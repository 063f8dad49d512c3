//! Shared types for the lumina-cache workspace.
//!
//! This crate provides foundational types used across multiple crates in the
//! workspace, breaking circular dependency chains:
//!
//! - [`GitProvider`] - the hosting services documents are fetched from
//! - [`RepoKey`] - (provider, organization, repository) identity of a source
//! - [`LuminaDoc`] - a validated lumina.json document
//! - [`CacheError`] - the error taxonomy shared by store, upstream, and core

pub mod document;
pub mod env_utils;
pub mod error;
pub mod key;
pub mod provider;

pub use document::LuminaDoc;
pub use error::CacheError;
pub use key::{short_sha, RepoKey};
pub use provider::{GitProvider, ParseProviderError};
