#![allow(unused)]

//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline talks to three collaborators, each behind a trait so real
//! implementations and `mockall` mocks are interchangeable:
//!
//! - [`ContentSource`]: performs the remote fetch for one resolved query.
//! - [`TemplateRenderer`]: turns a template plus one item into HTML.
//! - [`AssetSink`]: registers a rendered page or the JSON export as a build output.
//!
//! All methods are async and `Send + Sync`, so one instance can be shared by
//! concurrently running fetches or renders.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde_json::{Map, Value};

use crate::data::SharedLocals;
use crate::error::{BoxError, FetchError};
use crate::query::Query;

/// A post exactly as the remote API returned it.
pub type RawPost = Map<String, Value>;

/// The posts of one collection, in the order the API returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedCollection {
    pub items: Vec<RawPost>,
    /// Total match count reported by the API, when it reports one.
    pub found: Option<u64>,
}

/// Issues the remote request for one resolved query.
///
/// Implementations make exactly one request per call, never retry, and keep
/// no mutable state between calls.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<FetchedCollection, FetchError>;
}

/// Renders one item of a templated content type.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// `template` is the template file's source text; `item` is the stored
    /// (normalized or custom-transformed) post.
    async fn render(
        &self,
        template: &str,
        locals: &SharedLocals,
        item: &Value,
    ) -> Result<String, BoxError>;
}

/// Receives build outputs keyed by their relative output path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AssetSink: Send + Sync {
    async fn write_asset(&self, path: &str, contents: &str) -> Result<(), BoxError>;
}
