//! Post Tests
//!
//! Covers post creation, editing and deletion, including the admin override
//! and cascading removal of likes and comments.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use socialstack::app::posts::PostService;

// ===========================================================================
// Creation
// ===========================================================================

#[tokio::test]
async fn create_post_valid() {
    let app = app().await;
    let user = app.create_user("post_create").await;

    let resp = app
        .post_json(
            "/posts",
            json!({ "desc": "  My first post!  ", "imageUrl": "https://img.example.com/a.png" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["message"], "Post created successfully");
    assert!(body["post"]["id"].is_i64());
    assert_eq!(body["post"]["post_desc"], "My first post!");
    assert_eq!(body["post"]["imageurl"], "https://img.example.com/a.png");
    assert!(body["post"]["created_at"].is_string());
}

#[tokio::test]
async fn create_post_without_image() {
    let app = app().await;
    let user = app.create_user("post_noimage").await;

    let resp = app
        .post_json("/posts", json!({ "desc": "text only" }), Some(&user.access_token))
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert!(resp.json()["post"]["imageurl"].is_null());
}

#[tokio::test]
async fn create_post_requires_description() {
    let app = app().await;
    let user = app.create_user("post_blank").await;

    let resp = app
        .post_json("/posts", json!({ "desc": "   " }), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_fields(), vec!["desc".to_string()]);

    let resp = app
        .post_json("/posts", json!({}), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_post_unauthenticated() {
    let app = app().await;
    let resp = app.post_json("/posts", json!({ "desc": "hi" }), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ===========================================================================
// Editing
// ===========================================================================

#[tokio::test]
async fn edit_own_post_marks_it_edited() {
    let app = app().await;
    let user = app.create_user("post_edit").await;
    let post_id = app.create_post(user.id, "original").await;

    let resp = app
        .patch_json(
            "/posts",
            json!({ "postId": post_id, "editedComment": " updated text " }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["post"]["id"], post_id);
    assert_eq!(body["post"]["post_desc"], "updated text");
    assert_eq!(body["post"]["editedPost"], true);

    let edited: bool = sqlx::query_scalar("SELECT edited FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert!(edited);
}

#[tokio::test]
async fn edit_someone_elses_post_is_not_found() {
    let app = app().await;
    let owner = app.create_user("post_edit_owner").await;
    let other = app.create_user("post_edit_other").await;
    let post_id = app.create_post(owner.id, "original").await;

    let resp = app
        .patch_json(
            "/posts",
            json!({ "postId": post_id, "editedComment": "hijacked" }),
            Some(&other.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let body: String = sqlx::query_scalar("SELECT body FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(body, "original");
}

#[tokio::test]
async fn edit_rejects_blank_body_and_missing_id() {
    let app = app().await;
    let user = app.create_user("post_edit_blank").await;
    let post_id = app.create_post(user.id, "original").await;

    let resp = app
        .patch_json(
            "/posts",
            json!({ "postId": post_id, "editedComment": "   " }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_fields(), vec!["editedComment".to_string()]);

    let resp = app
        .patch_json("/posts", json!({ "editedComment": "text" }), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_fields(), vec!["postId".to_string()]);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let user = app.create_user("post_badjson").await;

    let auth = format!("Bearer {}", user.access_token);
    let resp = app
        .request(
            axum::http::Method::POST,
            "/posts",
            Some(json!("just a string")),
            &[("Authorization", auth.as_str())],
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.error_message().starts_with("invalid request body"));
}

// ===========================================================================
// Deletion
// ===========================================================================

#[tokio::test]
async fn owner_can_delete_post_and_cascade_engagement() {
    let app = app().await;
    let owner = app.create_user("post_del_owner").await;
    let fan = app.create_user("post_del_fan").await;
    let post_id = app.create_post(owner.id, "delmarker").await;
    app.like(fan.id, post_id).await;
    app.comment_at(fan.id, post_id, "nice", 0).await;

    let resp = app
        .delete_json("/posts", json!({ "postId": post_id }), Some(&owner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["message"], "Post deleted successfully");

    let likes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!((likes, comments), (0, 0));

    // The post is gone for every later operation.
    let post = PostService::new(app.state.db.clone())
        .get_post(post_id)
        .await
        .unwrap();
    assert!(post.is_none());
    let resp = app.post(&format!("/like/{}", post_id), Some(&fan.access_token)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let resp = app
        .get("/posts?search=delmarker", Some(&fan.access_token))
        .await;
    assert_eq!(resp.json()["count"], 0);
}

#[tokio::test]
async fn non_owner_cannot_delete_post() {
    let app = app().await;
    let owner = app.create_user("post_del2_owner").await;
    let other = app.create_user("post_del2_other").await;
    let post_id = app.create_post(owner.id, "keep me").await;

    let resp = app
        .delete_json("/posts", json!({ "postId": post_id }), Some(&other.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
        .bind(post_id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert!(exists);
}

#[tokio::test]
async fn admin_can_delete_any_post() {
    let app = app().await;
    let owner = app.create_user("post_del3_owner").await;
    let admin = app.create_admin("post_del3_admin").await;
    let post_id = app.create_post(owner.id, "moderated").await;

    let resp = app
        .delete_json("/posts", json!({ "postId": post_id }), Some(&admin.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .delete_json("/posts", json!({ "postId": post_id }), Some(&admin.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_post_id() {
    let app = app().await;
    let user = app.create_user("post_del_noid").await;

    let resp = app
        .delete_json("/posts", json!({}), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "postId is required");
}
