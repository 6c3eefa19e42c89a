//! Domain and IP rule sets for DNS policy plugins.
//!
//! A set is assembled from inline rules, local files, remote files that are
//! downloaded, persisted and refreshed in the background, and other sets
//! referenced by tag. Lookups go through [`engine::Matcher`] and never block
//! on a refresh.

pub mod config;
pub mod engine;
pub mod error;
pub mod init;
pub mod plugin;
pub mod query;
pub mod remote;
