//! Integration Tests: Post Lifecycle
//!
//! Coverage:
//! - published_at is set on first publish and never moves afterwards
//! - total_posts counts the first publish only
//! - validation on draft and publish
//! - draft visibility and read accounting on fetch

mod common;

use common::{draft, published, resave, TestApp};
use publishing_service::services::GetPostOptions;
use publishing_service::AppError;

#[tokio::test]
async fn published_at_is_set_exactly_once() {
    let app = TestApp::new();
    let author = app.author("ada").await;

    let post = app
        .state
        .posts
        .create_or_update_post(author.id, published("Engines", &["tech"]))
        .await
        .unwrap();
    let first = post.published_at.expect("published post has published_at");

    for _ in 0..3 {
        app.state
            .posts
            .create_or_update_post(author.id, resave(published("Engines v2", &["tech"]), &post.slug))
            .await
            .unwrap();
    }

    let stored = app.reload_post(&post.slug).await;
    assert_eq!(stored.title, "Engines v2");
    assert!(!stored.is_draft());
    assert_eq!(stored.published_at, Some(first));
}

#[tokio::test]
async fn total_posts_counts_only_the_first_publish() {
    let app = TestApp::new();
    let author = app.author("grace").await;
    let posts = &app.state.posts;

    let post = posts
        .create_or_update_post(author.id, draft("Compilers"))
        .await
        .unwrap();
    for _ in 0..4 {
        posts
            .create_or_update_post(author.id, resave(draft("Compilers"), &post.slug))
            .await
            .unwrap();
    }
    assert_eq!(app.reload_author(author.id).await.account_info.total_posts, 0);

    posts
        .create_or_update_post(author.id, resave(published("Compilers", &["tech"]), &post.slug))
        .await
        .unwrap();
    assert_eq!(app.reload_author(author.id).await.account_info.total_posts, 1);

    // Back to draft and published again: still the same post.
    posts
        .create_or_update_post(author.id, resave(draft("Compilers"), &post.slug))
        .await
        .unwrap();
    posts
        .create_or_update_post(author.id, resave(published("Compilers", &["tech"]), &post.slug))
        .await
        .unwrap();
    assert_eq!(app.reload_author(author.id).await.account_info.total_posts, 1);

    posts
        .create_or_update_post(author.id, published("Linkers", &["tech"]))
        .await
        .unwrap();
    assert_eq!(app.reload_author(author.id).await.account_info.total_posts, 2);
}

#[tokio::test]
async fn slug_is_derived_from_the_title() {
    let app = TestApp::new();
    let author = app.author("ken").await;

    let post = app
        .state
        .posts
        .create_or_update_post(author.id, published("Hello, World!", &["tech"]))
        .await
        .unwrap();

    let suffix = post.slug.strip_prefix("hello-world").expect("readable prefix");
    assert!(!suffix.is_empty());
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
}

#[tokio::test]
async fn publish_without_banner_is_rejected_and_nothing_is_stored() {
    let app = TestApp::new();
    let author = app.author("barbara").await;

    let mut payload = published("No banner", &["tech"]);
    payload.banner.clear();
    let err = app
        .state
        .posts
        .create_or_update_post(author.id, payload)
        .await
        .unwrap_err();

    match err {
        AppError::ValidationError(msg) => assert!(msg.starts_with("banner")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(app.reload_author(author.id).await.account_info.total_posts, 0);
    assert_eq!(
        app.state
            .posts
            .count_posts(&Default::default())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn untitled_draft_is_rejected() {
    let app = TestApp::new();
    let author = app.author("edsger").await;

    let err = app
        .state
        .posts
        .create_or_update_post(author.id, draft("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn reading_a_draft_is_forbidden_not_empty() {
    let app = TestApp::new();
    let author = app.author("alan").await;
    let post = app
        .state
        .posts
        .create_or_update_post(author.id, draft("Machines"))
        .await
        .unwrap();

    let err = app
        .state
        .posts
        .get_post(&post.slug, GetPostOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .state
        .posts
        .get_post("no-such-post", GetPostOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn reads_are_counted_outside_edit_mode() {
    let app = TestApp::new();
    let author = app.author("donald").await;
    let post = app
        .state
        .posts
        .create_or_update_post(author.id, published("Algorithms", &["tech"]))
        .await
        .unwrap();

    let edit = GetPostOptions {
        edit_mode: true,
        viewer: Some(author.id),
        ..Default::default()
    };
    app.state.posts.get_post(&post.slug, edit).await.unwrap();

    // Anonymous readers count too.
    app.state
        .posts
        .get_post(&post.slug, GetPostOptions::default())
        .await
        .unwrap();

    let stored = app.wait_for_reads(&post.slug, 1).await;
    assert_eq!(stored.activity.total_reads, 1);
    assert_eq!(app.reload_author(author.id).await.account_info.total_reads, 1);
}
