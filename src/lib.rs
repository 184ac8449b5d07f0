//! # ReguWatch
//!
//! Ingests regulatory announcements from three Canadian and international
//! insurance regulators, normalizes them into one record shape, deduplicates
//! them against a JSON store and serves filtered, sorted views.
//!
//! ## Sources
//!
//! - OSFI news listing (HTML scraping, article pages fetched for summaries)
//! - FCAC news feed (Atom)
//! - IAIS latest news (HTML scraping)
//!
//! ## Architecture
//!
//! 1. **Fetch**: each [`scrapers::SourceAdapter`] produces a batch of
//!    [`models::Record`]s and swallows its own failures
//! 2. **Merge**: [`store::JsonStore::merge`] appends records with unseen links
//! 3. **Query**: [`query::Query::run`] filters and sorts the stored records
//!
//! [`sync::run`] ties steps 1 and 2 together.

pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod query;
pub mod scrapers;
pub mod store;
pub mod sync;
pub mod utils;
