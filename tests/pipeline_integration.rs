mod common;

use common::{as_post, hosted_post};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wordpress_fetch::config::{
    ContentTypeDescriptor, ContentTypeSpec, OutputPath, RemoteSite, SiteOptions, TemplateSpec,
    Transform,
};
use wordpress_fetch::contract::{FetchedCollection, MockContentSource};
use wordpress_fetch::data::{ResultMapping, SharedLocals};
use wordpress_fetch::error::{ConfigurationError, FetchError, PipelineError};
use wordpress_fetch::pipeline::Pipeline;
use wordpress_fetch::query::FilterKey;

fn options() -> SiteOptions {
    SiteOptions::new(RemoteSite::hosted("fixture.blog"))
}

fn collection(posts: Vec<Value>) -> FetchedCollection {
    FetchedCollection {
        found: Some(posts.len() as u64),
        items: posts.into_iter().map(as_post).collect(),
    }
}

/// Answers by category filter, like the fixture API would.
fn source_by_category() -> MockContentSource {
    let mut source = MockContentSource::new();
    source.expect_fetch().returning(|query| {
        let posts = match query.filter(FilterKey::Category) {
            Some("interview") => vec![hosted_post(10, "an-interview", "interview")],
            Some("review") => vec![
                hosted_post(20, "review-one", "review"),
                hosted_post(21, "review-two", "review"),
            ],
            Some(other) => vec![hosted_post(30, other, other)],
            None => vec![
                hosted_post(1, "first", "news"),
                hosted_post(2, "second", "news"),
                hosted_post(3, "third", "news"),
            ],
        };
        Ok(collection(posts))
    });
    source
}

#[tokio::test]
async fn interview_and_review_are_stored_under_their_names() {
    let pipeline = Pipeline::configure(
        options().with_content_types(["interview", "review"]),
        source_by_category(),
    )
    .expect("configure");
    let mut locals = SharedLocals::new();

    let mapping = pipeline.run(&mut locals).await.expect("run should succeed");

    assert_eq!(mapping.get("interview").unwrap().len(), 1);
    assert_eq!(mapping.get("review").unwrap().len(), 2);
    assert_eq!(locals.wordpress(), Some(&mapping.to_value()));
}

#[tokio::test]
async fn key_set_matches_configured_names_in_order() {
    let names = ["zeta", "posts", "alpha", "review", "mid"];
    let pipeline =
        Pipeline::configure(options().with_content_types(names), source_by_category()).unwrap();
    let mut locals = SharedLocals::new();

    let mapping = pipeline.run(&mut locals).await.unwrap();

    assert_eq!(mapping.len(), names.len());
    assert_eq!(mapping.keys().collect::<Vec<_>>(), names);
}

#[tokio::test]
async fn default_options_fetch_posts() {
    let pipeline = Pipeline::configure(options(), source_by_category()).unwrap();
    let mut locals = SharedLocals::new();

    let mapping = pipeline.run(&mut locals).await.unwrap();

    assert_eq!(mapping.keys().collect::<Vec<_>>(), ["posts"]);
    assert_eq!(mapping.get("posts").unwrap().len(), 3);
}

#[tokio::test]
async fn item_order_follows_the_remote_order() {
    let mut source = MockContentSource::new();
    source.expect_fetch().times(1).returning(|_| {
        Ok(collection(vec![
            hosted_post(3, "c", "news"),
            hosted_post(1, "a", "news"),
            hosted_post(2, "b", "news"),
        ]))
    });
    let pipeline =
        Pipeline::configure(options().with_content_types(["posts"]), source).unwrap();

    let mapping = pipeline.run(&mut SharedLocals::new()).await.unwrap();

    let slugs: Vec<_> = mapping.get("posts").unwrap().iter().map(|p| p["slug"].clone()).collect();
    assert_eq!(slugs, [json!("c"), json!("a"), json!("b")]);
}

#[tokio::test]
async fn filtered_descriptor_yields_matching_post() {
    let mut source = MockContentSource::new();
    source
        .expect_fetch()
        .withf(|query| query.query_string() == "category=review&search=wow")
        .times(1)
        .returning(|_| Ok(collection(vec![hosted_post(22, "my-nice-review", "review")])));
    let spec = ContentTypeSpec::Structured(ContentTypeDescriptor {
        category: Some("review".into()),
        search: Some("wow".into()),
        ..Default::default()
    });
    let pipeline = Pipeline::configure(options().with_content_types([spec]), source).unwrap();

    let mapping = pipeline.run(&mut SharedLocals::new()).await.unwrap();

    let reviews = mapping.get("review").unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["slug"], json!("my-nice-review"));
}

#[tokio::test]
async fn fetch_failure_aborts_and_leaves_locals_untouched() {
    let mut source = MockContentSource::new();
    source.expect_fetch().returning(|query| match query.filter(FilterKey::Category) {
        Some("broken") => Err(FetchError::Status {
            url: "http://fixture/posts?category=broken".into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }),
        _ => Ok(collection(vec![hosted_post(1, "fine", "news")])),
    });
    let pipeline = Pipeline::configure(
        options().with_content_types(["interview", "broken", "review"]),
        source,
    )
    .unwrap();
    let mut locals = SharedLocals::new();
    locals.insert("site_title", json!("My site"));
    let before = locals.clone();

    let err = pipeline.run(&mut locals).await.unwrap_err();

    assert!(
        matches!(&err, PipelineError::Fetch { content_type, .. } if content_type == "broken"),
        "unexpected error: {err}"
    );
    assert!(locals.wordpress().is_none());
    assert_eq!(locals, before);
}

#[tokio::test]
async fn custom_transform_marks_every_item() {
    let spec = ContentTypeSpec::Structured(ContentTypeDescriptor {
        name: Some("review".into()),
        category: Some("review".into()),
        transform: Transform::custom(|mut post| {
            post.insert("foo".into(), json!("bar"));
            Ok(Value::Object(post))
        }),
        ..Default::default()
    });
    let pipeline = Pipeline::configure(
        options().with_content_types([spec, ContentTypeSpec::shorthand("interview")]),
        source_by_category(),
    )
    .unwrap();

    let mapping = pipeline.run(&mut SharedLocals::new()).await.unwrap();

    let reviews = mapping.get("review").unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().all(|p| p["foo"] == json!("bar")));
    // the custom transform sees the raw post
    assert!(reviews.iter().all(|p| p.get("site_ID").is_some()));
    assert!(mapping.get("interview").unwrap()[0].get("foo").is_none());
}

#[tokio::test]
async fn identity_transform_stores_raw_posts() {
    let spec = ContentTypeSpec::Structured(ContentTypeDescriptor {
        name: Some("raw".into()),
        transform: Transform::Identity,
        ..Default::default()
    });
    let pipeline =
        Pipeline::configure(options().with_content_types([spec]), source_by_category()).unwrap();

    let mapping = pipeline.run(&mut SharedLocals::new()).await.unwrap();

    assert_eq!(mapping.get("raw").unwrap()[0], hosted_post(1, "first", "news"));
}

#[tokio::test]
async fn failing_custom_transform_aborts_run() {
    let spec = ContentTypeSpec::Structured(ContentTypeDescriptor {
        category: Some("review".into()),
        transform: Transform::custom(|post| {
            if post.get("ID") == Some(&json!(21)) {
                Err("cannot handle post 21".into())
            } else {
                Ok(Value::Object(post))
            }
        }),
        ..Default::default()
    });
    let pipeline =
        Pipeline::configure(options().with_content_types([spec]), source_by_category()).unwrap();
    let mut locals = SharedLocals::new();

    let err = pipeline.run(&mut locals).await.unwrap_err();

    assert!(matches!(err, PipelineError::Transform { index: 1, .. }), "{err}");
    assert!(locals.wordpress().is_none());
}

#[tokio::test]
async fn hook_merge_never_overwrites_existing_locals() {
    let options = options()
        .with_content_types(["review"])
        .with_post_transform(|mut mapping: ResultMapping, locals: &SharedLocals| {
            assert_eq!(locals.get("foo"), Some(&json!("original")));
            let count = mapping.get("review").map(Vec::len).unwrap_or(0);
            mapping.insert_value("review_count", json!(count));
            let mut extra = Map::new();
            extra.insert("foo".into(), json!("x"));
            extra.insert("generated_by_hook".into(), json!(true));
            Ok((mapping, extra))
        });
    let pipeline = Pipeline::configure(options, source_by_category()).unwrap();
    let mut locals = SharedLocals::new();
    locals.insert("foo", json!("original"));

    let mapping = pipeline.run(&mut locals).await.unwrap();

    assert_eq!(locals.get("foo"), Some(&json!("original")));
    assert_eq!(locals.get("generated_by_hook"), Some(&json!(true)));
    assert_eq!(mapping.get_value("review_count"), Some(&json!(2)));
    assert_eq!(locals.wordpress().unwrap()["review_count"], json!(2));
}

#[tokio::test]
async fn hook_runs_once_per_run_over_the_whole_mapping() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let options = options()
        .with_content_types(["posts", "review", "interview"])
        .with_post_transform(move |mapping: ResultMapping, _: &SharedLocals| {
            counted.fetch_add(1, Ordering::SeqCst);
            assert_eq!(mapping.keys().collect::<Vec<_>>(), ["posts", "review", "interview"]);
            assert_eq!(mapping.get("posts").map(Vec::len), Some(3));
            assert_eq!(mapping.get("review").map(Vec::len), Some(2));
            Ok((mapping, Map::new()))
        });
    let pipeline = Pipeline::configure(options, source_by_category()).unwrap();

    pipeline.run(&mut SharedLocals::new()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    pipeline.run(&mut SharedLocals::new()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failing_hook_publishes_nothing() {
    let options = options()
        .with_content_types(["review"])
        .with_post_transform(|_, _| Err("hook exploded".into()));
    let pipeline = Pipeline::configure(options, source_by_category()).unwrap();
    let mut locals = SharedLocals::new();

    let err = pipeline.run(&mut locals).await.unwrap_err();

    assert!(matches!(err, PipelineError::Hook(_)));
    assert!(locals.as_map().is_empty());
}

#[tokio::test]
async fn templated_content_type_gets_url() {
    let spec = ContentTypeSpec::Structured(ContentTypeDescriptor {
        category: Some("review".into()),
        template: Some(TemplateSpec {
            path: "views/review.html".into(),
            output: OutputPath::Pattern("reviews/{slug}.html".into()),
        }),
        ..Default::default()
    });
    let pipeline = Pipeline::configure(
        options().with_content_types([spec, ContentTypeSpec::shorthand("interview")]),
        source_by_category(),
    )
    .unwrap();

    let mapping = pipeline.run(&mut SharedLocals::new()).await.unwrap();

    let reviews = mapping.get("review").unwrap();
    assert_eq!(reviews[0]["_url"], json!("/reviews/review-one.html"));
    assert_eq!(reviews[1]["_url"], json!("/reviews/review-two.html"));
    assert!(mapping.get("interview").unwrap()[0].get("_url").is_none());
}

#[tokio::test]
async fn configuration_errors_happen_before_any_fetch() {
    let mut source = MockContentSource::new();
    source.expect_fetch().times(0);
    let specs = vec![
        ContentTypeSpec::shorthand("review"),
        ContentTypeSpec::Structured(ContentTypeDescriptor {
            search: Some("nameless".into()),
            ..Default::default()
        }),
    ];

    let err = Pipeline::configure(options().with_content_types(specs), source).err();

    assert!(matches!(err, Some(ConfigurationError::MissingName { index: 1 })));
}

#[tokio::test]
async fn runs_are_independent() {
    let pipeline =
        Pipeline::configure(options().with_content_types(["review"]), source_by_category())
            .unwrap();
    let mut first = SharedLocals::new();
    let mut second = SharedLocals::new();

    let a = pipeline.run(&mut first).await.unwrap();
    let b = pipeline.run(&mut second).await.unwrap();

    assert_eq!(a, b);
    assert_eq!(first, second);
}
