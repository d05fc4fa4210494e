//! reqwest-backed [`ContentSource`] for WordPress-compatible REST APIs.
//!
//! Understands both payload shapes in the wild: the hosted v1.1 API wraps
//! posts in an object (`{"found": 3, "posts": [...]}`), while self-hosted
//! `wp/v2` endpoints return a bare array.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::{ApiFlavor, RemoteSite};
use crate::contract::{ContentSource, FetchedCollection, RawPost};
use crate::error::{ConfigurationError, FetchError};
use crate::query::Query;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for one remote site. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct WordpressClient {
    http: reqwest::Client,
    base_url: Url,
    flavor: ApiFlavor,
    token: Option<String>,
}

impl WordpressClient {
    pub fn new(site: &RemoteSite) -> Result<Self, ConfigurationError> {
        Ok(Self::with_base_url(site.base_url()?)?.with_flavor(site.flavor()))
    }

    /// Client rooted at an explicit base URL (mirrors, proxies, test fixtures).
    /// Speaks the hosted API unless [`WordpressClient::with_flavor`] says otherwise.
    pub fn with_base_url(base_url: Url) -> Result<Self, ConfigurationError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(mut base_url: Url, timeout: Duration) -> Result<Self, ConfigurationError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigurationError::HttpClient)?;
        Ok(WordpressClient {
            http,
            base_url,
            flavor: ApiFlavor::Hosted,
            token: None,
        })
    }

    pub fn with_flavor(mut self, flavor: ApiFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    /// Full request URL for `query`: base joined with the endpoint, then the
    /// filters in their serialized order, named the way this API expects.
    pub fn request_url(&self, query: &Query) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(query.endpoint.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidUrl {
                endpoint: query.endpoint.clone(),
                reason: e.to_string(),
            })?;
        let query_string = query.query_string_for(self.flavor).map_err(|key| {
            FetchError::InvalidUrl {
                endpoint: query.endpoint.clone(),
                reason: format!("the {} API cannot filter by `{}`", self.flavor, key.as_str()),
            }
        })?;
        if !query_string.is_empty() {
            url.set_query(Some(&query_string));
        }
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for WordpressClient {
    async fn fetch(&self, query: &Query) -> Result<FetchedCollection, FetchError> {
        let url = self.request_url(query)?;
        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        let payload: Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        parse_payload(payload, &query.endpoint).map_err(|reason| FetchError::Malformed {
            url: url.to_string(),
            reason,
        })
    }
}

/// Pulls the post list out of a decoded response body.
///
/// Object payloads are searched for the endpoint's last path segment, then for
/// `posts`. Every item must be a JSON object.
pub fn parse_payload(payload: Value, endpoint: &str) -> Result<FetchedCollection, String> {
    let (items, found) = match payload {
        Value::Array(items) => (items, None),
        Value::Object(mut body) => {
            let found = body.get("found").and_then(Value::as_u64);
            let key = endpoint
                .trim_matches('/')
                .rsplit('/')
                .next()
                .filter(|k| !k.is_empty())
                .unwrap_or(crate::config::DEFAULT_COLLECTION);
            let items = match body.remove(key).or_else(|| body.remove("posts")) {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(format!(
                        "expected `{key}` to be an array, found {}",
                        kind_of(&other)
                    ))
                }
                None => return Err(format!("payload has no `{key}` collection")),
            };
            (items, found)
        }
        other => {
            return Err(format!(
                "expected an array or object payload, found {}",
                kind_of(&other)
            ))
        }
    };

    let items = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(post) => Ok::<RawPost, String>(post),
            other => Err(format!("item {index} is {}, not an object", kind_of(&other))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FetchedCollection { items, found })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
