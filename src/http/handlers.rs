use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{StatusCode, Uri},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::app::accounts::{AccountService, ProfileUpdate};
use crate::app::auth::{AuthService, NewAccount};
use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::pagination::PageRequest;
use crate::app::posts::PostService;
use crate::app::search::SearchService;
use crate::domain::account::{Account, Role};
use crate::domain::engagement::LikeState;
use crate::domain::feed::{DashboardInfo, FeedComment, FeedResults, FeedScope};
use crate::http::error::FieldErrors;
use crate::http::pagination::{PageLinks, Paginated};
use crate::http::{AppError, AuthUser};
use crate::AppState;

const MAX_USERNAME_CHARS: usize = 150;
const MAX_FIRST_NAME_CHARS: usize = 30;
const MAX_LAST_NAME_CHARS: usize = 150;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 128;
const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// Accounts

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let Json(payload) = payload?;
    let mut errors = FieldErrors::new();

    let username = errors.require("username", payload.username.as_deref());
    errors.max_chars("username", &username, MAX_USERNAME_CHARS);

    let first_name = errors.require("first_name", payload.first_name.as_deref());
    errors.max_chars("first_name", &first_name, MAX_FIRST_NAME_CHARS);

    let last_name = payload.last_name.as_deref().unwrap_or("").trim().to_string();
    errors.max_chars("last_name", &last_name, MAX_LAST_NAME_CHARS);

    let email = errors.require("email", payload.email.as_deref());
    if !email.is_empty() {
        check_email(&mut errors, &email);
    }

    let password = payload.password.unwrap_or_default();
    let password_chars = password.chars().count();
    if password.trim().is_empty() {
        errors.add("password", "This field is required.");
    } else if password_chars < MIN_PASSWORD_CHARS {
        errors.add(
            "password",
            format!("Ensure this field has at least {} characters.", MIN_PASSWORD_CHARS),
        );
    } else if password_chars > MAX_PASSWORD_CHARS {
        errors.max_chars("password", &password, MAX_PASSWORD_CHARS);
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.access_ttl_minutes,
    );
    if !username.is_empty() {
        let taken = service.username_exists(&username).await.map_err(|err| {
            tracing::error!(error = ?err, "failed to check username");
            AppError::internal("failed to create account")
        })?;
        if taken {
            errors.add("username", "A user with that username already exists.");
        }
    }
    errors.into_result()?;

    let account = service
        .register(
            NewAccount {
                username,
                email,
                first_name,
                last_name,
                password,
            },
            Role::default(),
        )
        .await
        .map_err(|err| {
            if let Some(field) = unique_violation_field(&err) {
                let mut errors = FieldErrors::new();
                errors.add(field, format!("A user with that {} already exists.", field));
                return errors.into_error();
            }
            tracing::error!(error = ?err, "failed to create account");
            AppError::internal("failed to create account")
        })?;

    tracing::info!(account_id = account.id, "account registered");
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

fn profile_response(state: &AppState, account: Account) -> ProfileResponse {
    let image_url = state.images.profile_image(account.profile_image.as_deref());
    ProfileResponse {
        username: account.username,
        first_name: account.first_name,
        last_name: account.last_name,
        email: account.email,
        role: account.role,
        image_url,
    }
}

pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let service = AccountService::new(state.db.clone());
    let account = service.get_account(auth.account_id).await.map_err(|err| {
        tracing::error!(error = ?err, account_id = auth.account_id, "failed to fetch profile");
        AppError::internal("failed to fetch profile")
    })?;

    match account {
        Some(account) => Ok(Json(profile_response(&state, account))),
        None => Err(AppError::not_found("account not found")),
    }
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(payload) = payload?;
    let update = ProfileUpdate {
        first_name: non_blank(payload.first_name),
        last_name: non_blank(payload.last_name),
        email: non_blank(payload.email),
        profile_image: non_blank(payload.profile_image),
    };

    let mut errors = FieldErrors::new();
    if let Some(first_name) = &update.first_name {
        errors.max_chars("first_name", first_name, MAX_FIRST_NAME_CHARS);
    }
    if let Some(last_name) = &update.last_name {
        errors.max_chars("last_name", last_name, MAX_LAST_NAME_CHARS);
    }
    if let Some(email) = &update.email {
        check_email(&mut errors, email);
    }
    errors.into_result()?;

    let service = AccountService::new(state.db.clone());
    let account = service
        .update_profile(auth.account_id, update)
        .await
        .map_err(|err| {
            if let Some(field) = unique_violation_field(&err) {
                let mut errors = FieldErrors::new();
                errors.add(field, format!("A user with that {} already exists.", field));
                return errors.into_error();
            }
            tracing::error!(error = ?err, account_id = auth.account_id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?;

    match account {
        Some(account) => Ok(Json(profile_response(&state, account))),
        None => Err(AppError::not_found("account not found")),
    }
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum HeaderResponse {
    Viewer(DashboardInfo),
    Anonymous {},
}

pub async fn header(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<HeaderResponse>, AppError> {
    let Some(auth) = auth else {
        return Ok(Json(HeaderResponse::Anonymous {}));
    };

    let service = FeedService::new(state.db.clone(), state.images.clone());
    let info = service
        .dashboard_information(auth.account_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = auth.account_id, "failed to fetch header");
            AppError::internal("failed to fetch header")
        })?;

    Ok(Json(match info {
        Some(info) => HeaderResponse::Viewer(info),
        None => HeaderResponse::Anonymous {},
    }))
}

// Feed

#[derive(Deserialize, Default)]
pub struct FeedQuery {
    pub search: Option<String>,
    pub search_text: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl FeedQuery {
    fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .or(self.search_text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    fn page_request(&self, default_size: u32, max_size: u32) -> PageRequest {
        PageRequest::parse(
            self.page.as_deref(),
            self.page_size.as_deref(),
            default_size,
            max_size,
        )
    }
}

pub async fn list_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Paginated<FeedResults>>, AppError> {
    let search = query.search_text();
    let page = query.page_request(state.posts_per_page, state.max_posts_per_page);

    let service = FeedService::new(state.db.clone(), state.images.clone());
    let (window, results) = service
        .fetch_page(auth.actor(), FeedScope::AllPublic, search, page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, viewer_id = auth.account_id, "failed to fetch feed");
            AppError::internal("failed to fetch feed")
        })?;

    let links = PageLinks::new(&state.public_base_url, uri.path(), search);
    Ok(Json(links.envelope(window, results)))
}

pub async fn dashboard(
    Path(account_id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Paginated<FeedResults>>, AppError> {
    let page = query.page_request(state.dashboard_posts_per_page, state.max_posts_per_page);
    let service = FeedService::new(state.db.clone(), state.images.clone());

    let info = service
        .dashboard_information(account_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = account_id, "failed to fetch dashboard owner");
            AppError::internal("failed to fetch dashboard")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let (window, mut results) = service
        .fetch_page(auth.actor(), FeedScope::SingleUser(account_id), None, page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = account_id, "failed to fetch dashboard");
            AppError::internal("failed to fetch dashboard")
        })?;
    results.dashboard = Some(info);

    let links = PageLinks::new(&state.public_base_url, uri.path(), None);
    Ok(Json(links.envelope(window, results)))
}

#[derive(Serialize)]
pub struct AccountMatch {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub profile_image: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub users: Vec<AccountMatch>,
    pub posts: Paginated<FeedResults>,
}

pub async fn search(
    Path(text): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<FeedQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let page = query.page_request(state.dashboard_posts_per_page, state.max_posts_per_page);
    let feed = FeedService::new(state.db.clone(), state.images.clone());
    let service = SearchService::new(state.db.clone(), feed);

    let results = service
        .search(auth.actor(), &text, page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, viewer_id = auth.account_id, "failed to search");
            AppError::internal("failed to search")
        })?;

    let users = results
        .accounts
        .into_iter()
        .map(|account| AccountMatch {
            profile_image: state.images.profile_image(account.profile_image.as_deref()),
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            username: account.username,
        })
        .collect();

    let links = PageLinks::new(&state.public_base_url, uri.path(), None);
    Ok(Json(SearchResponse {
        users,
        posts: links.envelope(results.window, results.posts),
    }))
}

// Posts

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub desc: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedPost {
    pub id: i64,
    pub post_desc: String,
    pub imageurl: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Serialize)]
pub struct CreatePostResponse {
    pub message: &'static str,
    pub post: CreatedPost,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePostResponse>), AppError> {
    let Json(payload) = payload?;
    let mut errors = FieldErrors::new();
    let body = errors.require("desc", payload.desc.as_deref());
    errors.into_result()?;

    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(auth.account_id, body, non_blank(payload.image_url))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = auth.account_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post created successfully",
            post: CreatedPost {
                id: post.id,
                imageurl: state.images.resolve(post.image.as_deref()),
                post_desc: post.body,
                created_at: post.created_at,
            },
        }),
    ))
}

#[derive(Deserialize)]
pub struct EditPostRequest {
    #[serde(rename = "postId")]
    pub post_id: Option<i64>,
    #[serde(rename = "editedComment")]
    pub edited_comment: Option<String>,
}

#[derive(Serialize)]
pub struct EditedPost {
    pub id: i64,
    pub post_desc: String,
    #[serde(rename = "editedPost")]
    pub edited: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Serialize)]
pub struct EditPostResponse {
    pub message: &'static str,
    pub post: EditedPost,
}

pub async fn edit_post(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<EditPostRequest>, JsonRejection>,
) -> Result<Json<EditPostResponse>, AppError> {
    let Json(payload) = payload?;
    let mut errors = FieldErrors::new();
    if payload.post_id.is_none() {
        errors.add("postId", "This field is required.");
    }
    let body = errors.require("editedComment", payload.edited_comment.as_deref());
    errors.into_result()?;
    let post_id = payload.post_id.unwrap_or_default();

    let service = PostService::new(state.db.clone());
    let post = service
        .update_body(post_id, auth.account_id, body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post_id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    match post {
        Some(post) => Ok(Json(EditPostResponse {
            message: "Post updated successfully",
            post: EditedPost {
                id: post.id,
                post_desc: post.body,
                edited: post.edited,
                updated_at: post.updated_at,
            },
        })),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
pub struct DeletePostRequest {
    #[serde(rename = "postId")]
    pub post_id: Option<i64>,
}

pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<DeletePostRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    let post_id = payload
        .post_id
        .ok_or_else(|| AppError::bad_request("postId is required"))?;

    let service = PostService::new(state.db.clone());
    let deleted = service
        .delete_post(post_id, auth.actor())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post_id, "failed to delete post");
            AppError::internal("failed to delete post")
        })?;

    if deleted {
        Ok(Json(MessageResponse {
            message: "Post deleted successfully",
        }))
    } else {
        Err(AppError::not_found("post not found"))
    }
}

// Likes and comments

#[derive(Deserialize)]
pub struct LikeRequest {
    pub liked: bool,
}

pub async fn like_post(
    Path(post_id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LikeState>, AppError> {
    // An empty body toggles; anything else must be a valid `{"liked": bool}`.
    let requested = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let Json(request) = Json::<LikeRequest>::from_bytes(&body)?;
        Some(request.liked)
    };

    let service = EngagementService::new(state.db.clone());
    let like = match requested {
        Some(liked) => service.set_like(auth.account_id, post_id, liked).await,
        None => service.toggle_like(auth.account_id, post_id).await,
    }
    .map_err(|err| {
        tracing::error!(error = ?err, account_id = auth.account_id, post_id = post_id, "failed to like post");
        AppError::internal("failed to like post")
    })?;

    match like {
        Some(like) => Ok(Json(like)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub message: &'static str,
    pub data: FeedComment,
}

pub async fn comment_post(
    Path(post_id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    let Json(payload) = payload?;
    let mut errors = FieldErrors::new();
    let body = errors.require("comment", payload.comment.as_deref());
    errors.max_chars("comment", &body, MAX_COMMENT_CHARS);
    errors.into_result()?;

    let service = EngagementService::new(state.db.clone());
    let comment = service
        .comment_post(auth.account_id, post_id, body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = auth.account_id, post_id = post_id, "failed to comment on post");
            AppError::internal("failed to comment on post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    let author = AccountService::new(state.db.clone())
        .get_account(auth.account_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = auth.account_id, "failed to load comment author");
            AppError::internal("failed to comment on post")
        })?
        .ok_or_else(|| AppError::not_found("account not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: "Comment posted successfully.",
            data: FeedComment {
                id: comment.id,
                author_name: author.full_name(),
                user_image: state.images.profile_image(author.profile_image.as_deref()),
                username: author.username,
                post_id: comment.post_id,
                body: comment.body,
                created_at: comment.created_at,
            },
        }),
    ))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .unwrap_or(false);
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Maps a unique-constraint violation on `accounts` to the offending field.
fn unique_violation_field(err: &anyhow::Error) -> Option<&'static str> {
    let db_err = err.downcast_ref::<sqlx::Error>()?.as_database_error()?;
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    let constraint = db_err.constraint().unwrap_or_default();
    if constraint.contains("username") {
        Some("username")
    } else if constraint.contains("email") {
        Some("email")
    } else {
        None
    }
}
