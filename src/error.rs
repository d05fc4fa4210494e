//! Error types for every stage of the fetch-normalize-aggregate pipeline.
//!
//! Nothing in this crate retries. Each error is fatal to the current run and
//! propagates to the caller, which decides how to report it and halt the build.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ApiFlavor;

/// Boxed error used at the seams where user-supplied code runs
/// (custom transforms, post-transform hooks, renderers, sinks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Malformed or incomplete configuration, raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("content type #{index} has neither a `name` nor a `category` to derive one from")]
    MissingName { index: usize },

    #[error("content type name `{0}` is configured more than once")]
    DuplicateName(String),

    #[error("content type `{name}`: invalid `{key}` filter value `{value}`")]
    InvalidFilter {
        name: String,
        key: &'static str,
        value: String,
    },

    #[error("content type `{name}`: the {flavor} API cannot filter by `{key}`")]
    UnsupportedFilter {
        name: String,
        key: &'static str,
        flavor: ApiFlavor,
    },

    #[error("no remote site configured: set `site` or `name` (or WORDPRESS_SITE / WORDPRESS_NAME)")]
    MissingSite,

    #[error("invalid site url `{url}`: {reason}")]
    InvalidSite { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// A failed request against the content API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot build request url for endpoint `{endpoint}`: {reason}")]
    InvalidUrl { endpoint: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed payload from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// A custom per-item transform returned an error.
#[derive(Debug, Error)]
#[error("custom transform failed: {source}")]
pub struct TransformError {
    #[source]
    pub source: BoxError,
}

impl From<BoxError> for TransformError {
    fn from(source: BoxError) -> Self {
        TransformError { source }
    }
}

/// Run-level failure surfaced by [`crate::pipeline::Pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("fetching content type `{content_type}` failed: {source}")]
    Fetch {
        content_type: String,
        #[source]
        source: FetchError,
    },

    #[error("transforming item {index} of content type `{content_type}` failed: {source}")]
    Transform {
        content_type: String,
        index: usize,
        #[source]
        source: TransformError,
    },

    #[error("post-transform hook failed: {0}")]
    Hook(#[source] BoxError),

    #[error("nothing has been published under `wordpress`; run the pipeline before emitting")]
    NotPublished,

    #[error("failed to read template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rendering `{output}` for content type `{content_type}` failed: {source}")]
    Render {
        content_type: String,
        output: String,
        #[source]
        source: BoxError,
    },

    #[error("writing asset `{path}` failed: {source}")]
    Sink {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("serializing the JSON export failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
