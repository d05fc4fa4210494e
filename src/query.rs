//! Resolves configured content-type entries into concrete remote queries.
//!
//! Resolution runs once, when a pipeline is configured, so every
//! configuration error surfaces before the first request goes out.

use std::collections::HashSet;

use tracing::debug;

use crate::config::{
    ApiFlavor, ContentTypeDescriptor, ContentTypeSpec, TemplateSpec, Transform,
    DEFAULT_COLLECTION,
};
use crate::error::ConfigurationError;

/// Query parameters the remote API accepts from configuration, in the order
/// they are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Category,
    Search,
    Order,
    Number,
}

impl FilterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Category => "category",
            FilterKey::Search => "search",
            FilterKey::Order => "order",
            FilterKey::Number => "number",
        }
    }

    /// Wire parameter name on `flavor`, or `None` when that API cannot filter
    /// by this key in a single request. `wp/v2` filters categories by numeric
    /// id only.
    pub fn param(&self, flavor: ApiFlavor) -> Option<&'static str> {
        match (self, flavor) {
            (FilterKey::Category, ApiFlavor::SelfHosted) => None,
            (FilterKey::Number, ApiFlavor::SelfHosted) => Some("per_page"),
            (key, _) => Some(key.as_str()),
        }
    }
}

/// Endpoint path plus allow-listed filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub endpoint: String,
    filters: Vec<(FilterKey, String)>,
}

impl Query {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Query {
            endpoint: endpoint.into(),
            filters: Vec::new(),
        }
    }

    /// Sets a filter, replacing an earlier value for the same key.
    pub fn with_filter(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.filters.retain(|(k, _)| *k != key);
        self.filters.push((key, value.into()));
        self.filters.sort_by_key(|(k, _)| *k);
        self
    }

    pub fn filters(&self) -> &[(FilterKey, String)] {
        &self.filters
    }

    pub fn filter(&self, key: FilterKey) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `key=value` pairs joined by `&` as the hosted API expects them; empty
    /// when there are no filters.
    pub fn query_string(&self) -> String {
        self.serialize_for(ApiFlavor::Hosted)
    }

    /// Filters rendered for `flavor`: parameter names mapped and `order`
    /// lower-cased for `wp/v2`. Fails with the first filter `flavor` cannot
    /// express.
    pub fn query_string_for(&self, flavor: ApiFlavor) -> Result<String, FilterKey> {
        match self.unsupported_filter(flavor) {
            Some(key) => Err(key),
            None => Ok(self.serialize_for(flavor)),
        }
    }

    pub fn unsupported_filter(&self, flavor: ApiFlavor) -> Option<FilterKey> {
        self.filters
            .iter()
            .map(|(key, _)| *key)
            .find(|key| key.param(flavor).is_none())
    }

    fn serialize_for(&self, flavor: ApiFlavor) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.filters {
            let Some(param) = key.param(flavor) else {
                continue;
            };
            match (key, flavor) {
                (FilterKey::Order, ApiFlavor::SelfHosted) => {
                    serializer.append_pair(param, &value.to_ascii_lowercase())
                }
                _ => serializer.append_pair(param, value),
            };
        }
        serializer.finish()
    }
}

/// A content type in its resolved, internal form.
#[derive(Debug, Clone)]
pub struct ContentType {
    pub name: String,
    pub query: Query,
    pub transform: Transform,
    pub template: Option<TemplateSpec>,
}

/// Resolves one entry. `index` is its position in the configured list and
/// only appears in error messages.
pub fn resolve(spec: &ContentTypeSpec, index: usize) -> Result<ContentType, ConfigurationError> {
    match spec {
        ContentTypeSpec::Shorthand(name) => resolve_shorthand(name, index),
        ContentTypeSpec::Structured(descriptor) => resolve_descriptor(descriptor, index),
    }
}

/// Resolves the whole list, rejecting duplicate names.
pub fn resolve_all(specs: &[ContentTypeSpec]) -> Result<Vec<ContentType>, ConfigurationError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let content_type = resolve(spec, index)?;
        if !seen.insert(content_type.name.clone()) {
            return Err(ConfigurationError::DuplicateName(content_type.name));
        }
        debug!(
            name = %content_type.name,
            endpoint = %content_type.query.endpoint,
            query = %content_type.query.query_string(),
            "Resolved content type"
        );
        resolved.push(content_type);
    }
    Ok(resolved)
}

/// Resolves the whole list, then rejects any filter the remote API cannot
/// apply. Sending such a filter would return unfiltered posts.
pub fn resolve_for(
    specs: &[ContentTypeSpec],
    flavor: ApiFlavor,
) -> Result<Vec<ContentType>, ConfigurationError> {
    let resolved = resolve_all(specs)?;
    for content_type in &resolved {
        if let Some(key) = content_type.query.unsupported_filter(flavor) {
            return Err(ConfigurationError::UnsupportedFilter {
                name: content_type.name.clone(),
                key: key.as_str(),
                flavor,
            });
        }
    }
    Ok(resolved)
}

fn resolve_shorthand(name: &str, index: usize) -> Result<ContentType, ConfigurationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigurationError::MissingName { index });
    }
    let query = if name == DEFAULT_COLLECTION {
        Query::new(DEFAULT_COLLECTION)
    } else {
        Query::new(DEFAULT_COLLECTION).with_filter(FilterKey::Category, name)
    };
    Ok(ContentType {
        name: name.to_string(),
        query,
        transform: Transform::Default,
        template: None,
    })
}

fn resolve_descriptor(
    descriptor: &ContentTypeDescriptor,
    index: usize,
) -> Result<ContentType, ConfigurationError> {
    let name = non_empty(descriptor.name.as_deref())
        .or_else(|| non_empty(descriptor.category.as_deref()))
        .ok_or(ConfigurationError::MissingName { index })?
        .to_string();

    let endpoint = non_empty(descriptor.endpoint.as_deref())
        .map(|e| e.trim_matches('/'))
        .unwrap_or(DEFAULT_COLLECTION);
    let mut query = Query::new(endpoint);

    if let Some(category) = non_empty(descriptor.category.as_deref()) {
        query = query.with_filter(FilterKey::Category, category);
    }
    if let Some(search) = non_empty(descriptor.search.as_deref()) {
        query = query.with_filter(FilterKey::Search, search);
    }
    if let Some(order) = non_empty(descriptor.order.as_deref()) {
        let normalized = order.to_ascii_uppercase();
        if normalized != "ASC" && normalized != "DESC" {
            return Err(ConfigurationError::InvalidFilter {
                name,
                key: FilterKey::Order.as_str(),
                value: order.to_string(),
            });
        }
        query = query.with_filter(FilterKey::Order, normalized);
    }
    if let Some(number) = descriptor.number {
        if number == 0 {
            return Err(ConfigurationError::InvalidFilter {
                name,
                key: FilterKey::Number.as_str(),
                value: number.to_string(),
            });
        }
        query = query.with_filter(FilterKey::Number, number.to_string());
    }

    Ok(ContentType {
        name,
        query,
        transform: descriptor.transform.clone(),
        template: descriptor.template.clone(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
