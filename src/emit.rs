//! Post-run outputs: per-item template pages and the JSON export.
//!
//! Rendering goes through a [`TemplateRenderer`] and every output is handed to
//! an [`AssetSink`]; [`PlaceholderRenderer`] and [`DirectorySink`] are the
//! implementations the CLI uses.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use futures::future::try_join_all;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::TemplateSpec;
use crate::contract::{AssetSink, ContentSource, TemplateRenderer};
use crate::data::SharedLocals;
use crate::error::{BoxError, PipelineError};
use crate::pipeline::Pipeline;

/// What [`Pipeline::emit`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub json: Option<String>,
    pub pages: Vec<String>,
}

impl<S> Pipeline<S>
where
    S: ContentSource,
{
    /// Writes the JSON export (when configured) and one page per item of every
    /// templated content type, reading the data published by a previous
    /// [`Pipeline::run`] from `locals`.
    pub async fn emit<R, W>(
        &self,
        locals: &SharedLocals,
        renderer: &R,
        sink: &W,
    ) -> Result<EmitReport, PipelineError>
    where
        R: TemplateRenderer + ?Sized,
        W: AssetSink + ?Sized,
    {
        let published = locals.wordpress().ok_or(PipelineError::NotPublished)?;
        let mut report = EmitReport::default();

        if let Some(file_name) = &self.json {
            let src = serde_json::to_string_pretty(published)?;
            write(sink, file_name, &src).await?;
            info!(file = %file_name, bytes = src.len(), "[EMIT] Wrote JSON export");
            report.json = Some(file_name.clone());
        }

        for content_type in &self.content_types {
            let Some(template) = &content_type.template else {
                continue;
            };
            let template_path = self.project_root.join(&template.path);
            let source = tokio::fs::read_to_string(&template_path)
                .await
                .map_err(|source| {
                    error!(path = %template_path.display(), error = %source, "[EMIT][ERROR] Failed to read template");
                    PipelineError::Template {
                        path: template_path.clone(),
                        source,
                    }
                })?;

            let items = match published.get(&content_type.name).and_then(Value::as_array) {
                Some(items) => items.as_slice(),
                None => {
                    warn!(name = %content_type.name, "[EMIT] No published items for templated content type");
                    &[]
                }
            };

            let renders = items.iter().map(|item| {
                let output = output_path(template, item);
                let source = source.as_str();
                async move {
                    let html = renderer
                        .render(source, locals, item)
                        .await
                        .map_err(|e| PipelineError::Render {
                            content_type: content_type.name.clone(),
                            output: output.clone(),
                            source: e,
                        })?;
                    Ok::<_, PipelineError>((output, html))
                }
            });
            let rendered = try_join_all(renders).await?;

            for (output, html) in rendered {
                write(sink, &output, &html).await?;
                debug!(name = %content_type.name, output = %output, "[EMIT] Wrote page");
                report.pages.push(output);
            }
            info!(name = %content_type.name, pages = items.len(), "[EMIT] Rendered content type");
        }

        Ok(report)
    }
}

async fn write<W: AssetSink + ?Sized>(sink: &W, path: &str, contents: &str) -> Result<(), PipelineError> {
    sink.write_asset(path, contents).await.map_err(|source| {
        error!(path = %path, error = %source, "[EMIT][ERROR] Failed to write asset");
        PipelineError::Sink {
            path: path.to_string(),
            source,
        }
    })
}

/// Output path of a stored item: its `_url` when the run annotated one,
/// otherwise the template's output path computed from the item itself.
fn output_path(template: &TemplateSpec, item: &Value) -> String {
    if let Some(url) = item.get("_url").and_then(Value::as_str) {
        return url.trim_start_matches('/').to_string();
    }
    let empty = Map::new();
    let post = item.as_object().unwrap_or(&empty);
    template.output.render(post).trim_start_matches('/').to_string()
}

/// Minimal `{{ path }}` renderer.
///
/// `{{ item.title }}` is HTML-escaped, `{{{ item.content }}}` is inserted raw.
/// Paths starting with `item` resolve against the item being rendered;
/// `locals.key` and bare `key` both resolve against shared locals. Missing
/// values render as nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

fn raw_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\{\s*([\w.-]+)\s*\}\}\}").expect("valid raw placeholder pattern"))
}

fn escaped_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([\w.-]+)\s*\}\}").expect("valid placeholder pattern"))
}

impl PlaceholderRenderer {
    pub fn render_str(&self, template: &str, locals: &SharedLocals, item: &Value) -> String {
        let raw = raw_placeholder().replace_all(template, |caps: &Captures| {
            lookup(&caps[1], locals, item).map(display).unwrap_or_default()
        });
        escaped_placeholder()
            .replace_all(&raw, |caps: &Captures| {
                lookup(&caps[1], locals, item)
                    .map(|v| html_escape::encode_text(&display(v)).into_owned())
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

#[async_trait]
impl TemplateRenderer for PlaceholderRenderer {
    async fn render(
        &self,
        template: &str,
        locals: &SharedLocals,
        item: &Value,
    ) -> Result<String, BoxError> {
        Ok(self.render_str(template, locals, item))
    }
}

fn lookup<'a>(path: &str, locals: &'a SharedLocals, item: &'a Value) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let root = segments.next()?;
    let mut current = match root {
        "item" => item,
        "locals" => locals.get(segments.next()?)?,
        key => locals.get(key)?,
    };
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(list) => list.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Writes assets below a root directory, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySink { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BoxError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.is_empty() {
            return Err(format!("refusing to write outside the output directory: `{path}`").into());
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetSink for DirectorySink {
    async fn write_asset(&self, path: &str, contents: &str) -> Result<(), BoxError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, contents).await?;
        Ok(())
    }
}
