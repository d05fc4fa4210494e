#![doc = "wordpress-fetch: build-time WordPress content pipeline."]

//! Fetches collections of posts from a WordPress-compatible REST API,
//! normalizes each post into a lean shape and publishes the aggregate into the
//! shared locals a static-site templating stage consumes.
//!
//! # Usage
//! Configure a [`pipeline::Pipeline`] with [`config::SiteOptions`] and a
//! [`contract::ContentSource`] (usually [`fetch::WordpressClient`]), call
//! `run`, then optionally `emit` pages and the JSON export.

pub mod cli;
pub mod config;
pub mod contract;
pub mod data;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod load_config;
pub mod normalize;
pub mod pipeline;
pub mod query;

pub use config::{RemoteSite, SiteOptions};
pub use data::{ResultMapping, SharedLocals};
pub use error::{ConfigurationError, FetchError, PipelineError, TransformError};
pub use pipeline::Pipeline;
