//! Typed configuration for a fetch run: which remote to talk to, which content
//! types to pull, and the optional hooks and outputs around them.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::contract::RawPost;
use crate::error::{BoxError, ConfigurationError};
use crate::pipeline::PostTransformHook;

/// Name of the default collection; a shorthand entry with this name fetches it unfiltered.
pub const DEFAULT_COLLECTION: &str = "posts";

/// Base of the hosted (WordPress.com) public API.
pub const HOSTED_API_BASE: &str = "https://public-api.wordpress.com/rest/v1.1/sites/";

/// Identity of the remote content API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSite {
    /// A site served through the hosted public API, e.g. `example.wordpress.com`.
    Hosted { name: String },
    /// A self-hosted install exposing `/wp-json`.
    SelfHosted { site: String },
}

/// Which REST API a remote speaks. Decides how filters are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `rest/v1.1` on the hosted public API.
    Hosted,
    /// `wp/v2` on a self-hosted install.
    SelfHosted,
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFlavor::Hosted => f.write_str("hosted v1.1"),
            ApiFlavor::SelfHosted => f.write_str("self-hosted wp/v2"),
        }
    }
}

impl RemoteSite {
    pub fn hosted(name: impl Into<String>) -> Self {
        RemoteSite::Hosted { name: name.into() }
    }

    pub fn self_hosted(site: impl Into<String>) -> Self {
        RemoteSite::SelfHosted { site: site.into() }
    }

    pub fn flavor(&self) -> ApiFlavor {
        match self {
            RemoteSite::Hosted { .. } => ApiFlavor::Hosted,
            RemoteSite::SelfHosted { .. } => ApiFlavor::SelfHosted,
        }
    }

    /// Base URL that endpoint paths are joined onto. Always ends with `/`.
    pub fn base_url(&self) -> Result<Url, ConfigurationError> {
        let raw = match self {
            RemoteSite::Hosted { name } => {
                format!("{HOSTED_API_BASE}{}/", name.trim_matches('/'))
            }
            RemoteSite::SelfHosted { site } => {
                format!("{}/wp-json/wp/v2/", site.trim_end_matches('/'))
            }
        };
        Url::parse(&raw).map_err(|e| ConfigurationError::InvalidSite {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for RemoteSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteSite::Hosted { name } => write!(f, "hosted:{name}"),
            RemoteSite::SelfHosted { site } => write!(f, "{site}"),
        }
    }
}

/// Per-item mapping function supplied from Rust code.
pub type CustomTransform = Arc<dyn Fn(RawPost) -> Result<Value, BoxError> + Send + Sync>;

/// What happens to each fetched post before it is stored.
#[derive(Clone, Default)]
pub enum Transform {
    /// Project onto the template-friendly field set.
    #[default]
    Default,
    /// Store the raw post verbatim.
    Identity,
    /// Hand the raw post to a caller-supplied function.
    Custom(CustomTransform),
}

impl Transform {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(RawPost) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Transform::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Default => f.write_str("Default"),
            Transform::Identity => f.write_str("Identity"),
            Transform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// In config files `transform: true` keeps the default projection and `false` disables it.
impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(if bool::deserialize(deserializer)? {
            Transform::Default
        } else {
            Transform::Identity
        })
    }
}

/// Computes the output path of a rendered item from its raw post.
#[derive(Clone)]
pub enum OutputPath {
    /// `{field}` placeholders are filled from the post's top-level scalar fields.
    Pattern(String),
    Custom(Arc<dyn Fn(&RawPost) -> String + Send + Sync>),
}

impl OutputPath {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&RawPost) -> String + Send + Sync + 'static,
    {
        OutputPath::Custom(Arc::new(f))
    }

    pub fn render(&self, post: &RawPost) -> String {
        match self {
            OutputPath::Pattern(pattern) => fill_pattern(pattern, post),
            OutputPath::Custom(f) => f(post),
        }
    }
}

fn field_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid field placeholder pattern"))
}

fn fill_pattern(pattern: &str, post: &RawPost) -> String {
    field_placeholder()
        .replace_all(pattern, |caps: &Captures| match post.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        })
        .into_owned()
}

impl fmt::Debug for OutputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPath::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            OutputPath::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for OutputPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(OutputPath::Pattern)
    }
}

/// Renders each item of a content type to its own file.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSpec {
    /// Template file, relative to the project root.
    pub path: PathBuf,
    pub output: OutputPath,
}

/// Structured content-type request. Keys other than these are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentTypeDescriptor {
    /// Key the results are stored under. Falls back to `category`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Remote collection path; `posts` when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    /// `ASC` or `DESC`, case-insensitive.
    #[serde(default)]
    pub order: Option<String>,
    /// Result-count limit.
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub template: Option<TemplateSpec>,
}

/// One entry of the configured content-type list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentTypeSpec {
    Shorthand(String),
    Structured(ContentTypeDescriptor),
}

impl ContentTypeSpec {
    pub fn shorthand(name: impl Into<String>) -> Self {
        ContentTypeSpec::Shorthand(name.into())
    }
}

impl From<&str> for ContentTypeSpec {
    fn from(name: &str) -> Self {
        ContentTypeSpec::Shorthand(name.to_string())
    }
}

impl From<ContentTypeDescriptor> for ContentTypeSpec {
    fn from(descriptor: ContentTypeDescriptor) -> Self {
        ContentTypeSpec::Structured(descriptor)
    }
}

pub fn default_content_types() -> Vec<ContentTypeSpec> {
    vec![ContentTypeSpec::shorthand(DEFAULT_COLLECTION)]
}

/// Optional callbacks around a run.
#[derive(Clone, Default)]
pub struct Hooks {
    pub post_transform: Option<PostTransformHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("post_transform", &self.post_transform.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Everything a [`crate::pipeline::Pipeline`] is configured with.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub site: RemoteSite,
    pub content_types: Vec<ContentTypeSpec>,
    /// File name of the JSON export, if one should be written.
    pub json: Option<String>,
    pub hooks: Hooks,
    /// Directory template paths are resolved against.
    pub project_root: PathBuf,
}

impl SiteOptions {
    pub fn new(site: RemoteSite) -> Self {
        SiteOptions {
            site,
            content_types: default_content_types(),
            json: None,
            hooks: Hooks::default(),
            project_root: PathBuf::from("."),
        }
    }

    pub fn with_content_types<I, T>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentTypeSpec>,
    {
        self.content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_json(mut self, file_name: impl Into<String>) -> Self {
        self.json = Some(file_name.into());
        self
    }

    pub fn with_post_transform<F>(mut self, hook: F) -> Self
    where
        F: Fn(
                crate::data::ResultMapping,
                &crate::data::SharedLocals,
            ) -> Result<(crate::data::ResultMapping, serde_json::Map<String, Value>), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.post_transform = Some(Arc::new(hook));
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            site = %self.site,
            content_types = self.content_types.len(),
            json = self.json.as_deref().unwrap_or("-"),
            post_transform = self.hooks.post_transform.is_some(),
            "Loaded site options"
        );
        debug!(?self, "Site options loaded (full debug)");
    }
}
