//! High-level pipeline: orchestrates query → fetch → normalize → aggregate.
//!
//! # Responsibilities
//! - Resolves every configured content type up front, so configuration errors
//!   surface before any request is made
//! - Fetches all content types concurrently, but merges them into the
//!   [`ResultMapping`] strictly in configured order
//! - Runs the optional post-transform hook exactly once over the full mapping
//! - Publishes into [`SharedLocals`] only after everything above succeeded
//!
//! # Error Handling
//! Fail-fast: the first fetch, transform or hook error aborts the run. Shared
//! locals are left untouched and no partial mapping is returned.
//!
//! # Navigation
//! - Entrypoints: [`Pipeline::configure`], [`Pipeline::run`]
//! - Rendering and JSON export after a run: [`Pipeline::emit`](crate::emit)

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::SiteOptions;
use crate::contract::ContentSource;
use crate::data::{ResultMapping, SharedLocals};
use crate::error::{BoxError, ConfigurationError, PipelineError};
use crate::normalize::normalize;
use crate::query::{self, ContentType};

/// Finalization step over the complete mapping. Receives the mapping and a
/// snapshot of shared locals; returns the mapping to publish plus extra
/// locals, which are merged without overwriting existing keys.
pub type PostTransformHook = Arc<
    dyn Fn(ResultMapping, &SharedLocals) -> Result<(ResultMapping, Map<String, Value>), BoxError>
        + Send
        + Sync,
>;

/// A configured fetch run against one content source.
pub struct Pipeline<S> {
    pub(crate) content_types: Vec<ContentType>,
    pub(crate) source: S,
    pub(crate) json: Option<String>,
    pub(crate) post_transform: Option<PostTransformHook>,
    pub(crate) project_root: PathBuf,
}

impl<S> Pipeline<S>
where
    S: ContentSource,
{
    /// Validates and resolves `options`. Performs no I/O.
    pub fn configure(options: SiteOptions, source: S) -> Result<Self, ConfigurationError> {
        let content_types = query::resolve_for(&options.content_types, options.site.flavor())
            .map_err(|e| {
                error!(error = %e, "[PIPELINE][ERROR] Invalid content type configuration");
                e
            })?;
        info!(
            site = %options.site,
            content_types = content_types.len(),
            "[PIPELINE] Configured"
        );
        Ok(Pipeline {
            content_types,
            source,
            json: options.json,
            post_transform: options.hooks.post_transform,
            project_root: options.project_root,
        })
    }

    pub fn content_types(&self) -> &[ContentType] {
        &self.content_types
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one fetch-normalize-aggregate pass and publishes the result into
    /// `locals` under `wordpress`.
    pub async fn run(&self, locals: &mut SharedLocals) -> Result<ResultMapping, PipelineError> {
        info!(
            content_types = self.content_types.len(),
            "[PIPELINE] Starting fetch-normalize-aggregate run"
        );

        let collected = try_join_all(self.content_types.iter().map(|ct| self.collect(ct)))
            .await
            .map_err(|e| {
                error!(error = %e, "[PIPELINE][ERROR] Run aborted, nothing published");
                e
            })?;

        let mut mapping = ResultMapping::new();
        for (content_type, items) in self.content_types.iter().zip(collected) {
            debug!(name = %content_type.name, items = items.len(), "[PIPELINE] Stored content type");
            mapping.insert(content_type.name.clone(), items);
        }

        let (mapping, supplementary) = match &self.post_transform {
            Some(hook) => {
                info!("[PIPELINE] Running post-transform hook");
                hook(mapping, &*locals).map_err(|e| {
                    error!(error = %e, "[PIPELINE][ERROR] Post-transform hook failed");
                    PipelineError::Hook(e)
                })?
            }
            None => (mapping, Map::new()),
        };

        let skipped = locals.merge_missing(supplementary);
        if !skipped.is_empty() {
            warn!(
                ?skipped,
                "[PIPELINE] Hook locals already present in shared locals, keeping existing values"
            );
        }
        locals.publish(&mapping);

        info!(keys = mapping.len(), "[PIPELINE] Published results");
        Ok(mapping)
    }

    /// Fetches and normalizes one content type, preserving remote item order.
    async fn collect(&self, content_type: &ContentType) -> Result<Vec<Value>, PipelineError> {
        info!(
            name = %content_type.name,
            endpoint = %content_type.query.endpoint,
            query = %content_type.query.query_string(),
            "[PIPELINE] Fetching content type"
        );
        let fetched = self
            .source
            .fetch(&content_type.query)
            .await
            .map_err(|source| PipelineError::Fetch {
                content_type: content_type.name.clone(),
                source,
            })?;
        debug!(
            name = %content_type.name,
            items = fetched.items.len(),
            found = ?fetched.found,
            "[PIPELINE] Fetched content type"
        );

        fetched
            .items
            .into_iter()
            .enumerate()
            .map(|(index, mut raw)| {
                if let Some(template) = &content_type.template {
                    let output = template.output.render(&raw);
                    raw.insert(
                        "_url".to_string(),
                        Value::String(format!("/{}", output.trim_start_matches('/'))),
                    );
                }
                normalize(raw, &content_type.transform).map_err(|source| {
                    PipelineError::Transform {
                        content_type: content_type.name.clone(),
                        index,
                        source,
                    }
                })
            })
            .collect()
    }
}
