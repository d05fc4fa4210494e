//! Projects raw posts onto the lean, template-friendly shape.
//!
//! The default projection is lossy: anything outside
//! [`RELEVANT_FIELDS`] is dropped without complaint.
//!
//! HTML entities are decoded once, when a fetched post enters [`normalize`].
//! [`default_transform`] itself never decodes, so projecting an already
//! projected record returns it unchanged, entity-like text included.

use serde_json::{Map, Value};

use crate::config::Transform;
use crate::contract::RawPost;
use crate::error::TransformError;

/// Fields kept by the default projection. Kept keys are lower-cased.
pub const RELEVANT_FIELDS: &[&str] = &[
    "ID",
    "id",
    "author",
    "date",
    "modified",
    "title",
    "URL",
    "link",
    "content",
    "excerpt",
    "slug",
    "status",
    "type",
    "comment_count",
    "featured_image",
    "tags",
    "categories",
    "attachments",
    "_url",
    "post_thumbnail",
];

/// Applies `transform` to one post as fetched from the remote API.
pub fn normalize(raw: RawPost, transform: &Transform) -> Result<Value, TransformError> {
    match transform {
        Transform::Default => Ok(default_transform(decode_payload_text(raw))),
        Transform::Identity => Ok(Value::Object(raw)),
        Transform::Custom(f) => f(raw).map_err(TransformError::from),
    }
}

/// The default projection. Expects text fields already decoded.
pub fn default_transform(raw: RawPost) -> Value {
    let mut lean = Map::new();
    for (prop, value) in raw {
        if !RELEVANT_FIELDS.contains(&prop.as_str()) {
            continue;
        }
        match prop.as_str() {
            "author" => {
                lean.insert(prop, reshape_author(value));
            }
            "categories" => {
                lean.insert(prop, reshape_categories(value));
            }
            "post_thumbnail" => {
                lean.insert("thumbnail".to_string(), thumbnail_url(value));
            }
            "title" => {
                lean.insert(prop, unwrap_rendered(value));
            }
            "content" | "excerpt" => {
                lean.insert(prop, unwrap_rendered(value));
            }
            _ => {
                lean.insert(prop.to_lowercase(), value);
            }
        }
    }
    Value::Object(lean)
}

fn reshape_author(value: Value) -> Value {
    let Value::Object(author) = value else {
        // wp/v2 only carries the author id
        return value;
    };
    let has_parts = author.contains_key("first_name") || author.contains_key("last_name");
    let full_name = match author.get("full_name").and_then(Value::as_str) {
        Some(full) if !has_parts => full.to_string(),
        _ => format!(
            "{} {}",
            str_field(&author, "first_name"),
            str_field(&author, "last_name")
        )
        .trim()
        .to_string(),
    };
    let avatar = author
        .get("avatar_URL")
        .or_else(|| author.get("avatar"))
        .cloned()
        .unwrap_or(Value::Null);

    let mut lean = Map::new();
    lean.insert(
        "name".to_string(),
        author.get("name").cloned().unwrap_or(Value::Null),
    );
    lean.insert("full_name".to_string(), Value::String(full_name));
    lean.insert("avatar".to_string(), avatar);
    Value::Object(lean)
}

fn reshape_categories(value: Value) -> Value {
    match value {
        // hosted API: object keyed by category name
        Value::Object(by_name) => {
            Value::Array(by_name.into_iter().map(|(_, c)| reshape_category(c)).collect())
        }
        Value::Array(items) if items.iter().all(Value::is_object) => {
            Value::Array(items.into_iter().map(reshape_category).collect())
        }
        other => other,
    }
}

fn reshape_category(category: Value) -> Value {
    let Value::Object(category) = category else {
        return category;
    };
    let mut lean = Map::new();
    lean.insert(
        "name".to_string(),
        category.get("name").cloned().unwrap_or(Value::Null),
    );
    lean.insert(
        "post_count".to_string(),
        category
            .get("post_count")
            .or_else(|| category.get("count"))
            .cloned()
            .unwrap_or(Value::Null),
    );
    Value::Object(lean)
}

fn thumbnail_url(value: Value) -> Value {
    match value {
        Value::Object(thumb) => thumb
            .get("URL")
            .or_else(|| thumb.get("url"))
            .cloned()
            .unwrap_or(Value::Null),
        url @ Value::String(_) => url,
        _ => Value::Null,
    }
}

/// `{"rendered": "<p>..</p>"}` becomes the inner value; anything else passes through.
fn unwrap_rendered(value: Value) -> Value {
    match value {
        Value::Object(mut wrapped) if wrapped.contains_key("rendered") => {
            wrapped.remove("rendered").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decodes entities in the title (plain or `.rendered`) and in author and
/// category names of a fetched post. Runs once per post, before projection.
fn decode_payload_text(mut raw: RawPost) -> RawPost {
    if let Some(title) = raw.get_mut("title") {
        match title {
            Value::Object(wrapped) => {
                if let Some(rendered) = wrapped.get_mut("rendered") {
                    decode_in_place(rendered);
                }
            }
            other => decode_in_place(other),
        }
    }
    if let Some(Value::Object(author)) = raw.get_mut("author") {
        decode_name(author);
    }
    match raw.get_mut("categories") {
        Some(Value::Object(by_name)) => by_name.values_mut().for_each(decode_category_name),
        Some(Value::Array(items)) => items.iter_mut().for_each(decode_category_name),
        _ => {}
    }
    raw
}

fn decode_category_name(category: &mut Value) {
    if let Value::Object(category) = category {
        decode_name(category);
    }
}

fn decode_name(map: &mut Map<String, Value>) {
    if let Some(name) = map.get_mut("name") {
        decode_in_place(name);
    }
}

fn decode_in_place(value: &mut Value) {
    if let Value::String(text) = value {
        let decoded = html_escape::decode_html_entities(text.as_str()).into_owned();
        *text = decoded;
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("")
}
