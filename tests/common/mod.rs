#![allow(dead_code)]

use axum::extract::RawQuery;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use url::Url;

/// Hosted-API style post, the way the v1.1 endpoint returns it.
pub fn hosted_post(id: u64, slug: &str, category: &str) -> Value {
    let mut categories = Map::new();
    categories.insert(
        category.to_string(),
        json!({"ID": 2, "name": category, "slug": category, "post_count": 5, "description": ""}),
    );
    json!({
        "ID": id,
        "site_ID": 1234,
        "author": {
            "ID": 9,
            "login": "jdoe",
            "name": "jdoe",
            "first_name": "Jane",
            "last_name": "Doe",
            "avatar_URL": "https://gravatar.example/jdoe.png",
            "profile_URL": "https://gravatar.example/jdoe"
        },
        "date": "2017-03-01T10:00:00+00:00",
        "modified": "2017-03-02T10:00:00+00:00",
        "title": format!("{slug} &#8211; title"),
        "URL": format!("https://fixture.blog/{slug}"),
        "short_URL": "https://wp.me/p1",
        "content": "<p>body</p>",
        "excerpt": "<p>excerpt</p>",
        "slug": slug,
        "guid": "https://fixture.blog/?p=1",
        "status": "publish",
        "sticky": false,
        "type": "post",
        "comment_count": 0,
        "like_count": 3,
        "featured_image": "",
        "post_thumbnail": null,
        "tags": {},
        "categories": categories,
        "attachments": {},
        "meta": {"links": {"self": "https://public-api.wordpress.com/rest/v1.1/sites/1234/posts/1"}}
    })
}

pub fn as_post(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not an object: {other}"),
    }
}

fn hosted_page(posts: Vec<Value>) -> Response {
    Json(json!({"found": posts.len(), "posts": posts})).into_response()
}

async fn hosted_posts(RawQuery(query): RawQuery) -> Response {
    match query.as_deref() {
        None => hosted_page(vec![
            hosted_post(1, "first", "news"),
            hosted_post(2, "second", "news"),
            hosted_post(3, "third", "news"),
        ]),
        Some("category=interview") => hosted_page(vec![hosted_post(10, "an-interview", "interview")]),
        Some("category=review") => hosted_page(vec![
            hosted_post(20, "review-one", "review"),
            hosted_post(21, "review-two", "review"),
        ]),
        Some("category=review&search=wow") => {
            hosted_page(vec![hosted_post(22, "my-nice-review", "review")])
        }
        Some("category=broken") => {
            (StatusCode::INTERNAL_SERVER_ERROR, "database offline").into_response()
        }
        Some("category=garbled") => "<html>not json</html>".into_response(),
        Some(other) => (StatusCode::BAD_REQUEST, format!("unexpected query {other}")).into_response(),
    }
}

async fn self_hosted_posts(RawQuery(query): RawQuery) -> Response {
    let post = |id: u64, slug: &str| {
        json!({
            "id": id,
            "date": "2020-01-01T00:00:00",
            "slug": slug,
            "link": format!("https://self.example/{slug}"),
            "title": {"rendered": format!("{slug} &amp; more")},
            "content": {"rendered": "<p>v2 body</p>", "protected": false},
            "excerpt": {"rendered": "<p>v2 excerpt</p>", "protected": false},
            "author": 1,
            "categories": [3],
            "_links": {"self": []}
        })
    };
    match query.as_deref() {
        None => Json(json!([post(1, "alpha"), post(2, "beta")])).into_response(),
        Some("search=gamma&order=asc&per_page=1") => Json(json!([post(3, "gamma")])).into_response(),
        Some(other) => (StatusCode::BAD_REQUEST, format!("unexpected query {other}")).into_response(),
    }
}

/// Serves a hosted-style API under `/rest/v1.1/sites/fixture.blog/` and a
/// self-hosted one under `/wp-json/wp/v2/`. Returns the server root URL.
pub async fn spawn_fixture_api() -> Url {
    let app = Router::new()
        .route("/rest/v1.1/sites/fixture.blog/posts", get(hosted_posts))
        .route("/wp-json/wp/v2/posts", get(self_hosted_posts));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().expect("fixture address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fixture server");
    });
    Url::parse(&format!("http://{addr}/")).expect("fixture url")
}

/// Base URL of the hosted-style fixture API.
pub fn hosted_base(root: &Url) -> Url {
    root.join("rest/v1.1/sites/fixture.blog/").expect("hosted base")
}
