use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::domain::account::Role;

/// Which posts a feed page is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    AllPublic,
    SingleUser(i64),
}

impl FeedScope {
    /// Dashboard pages never offer deletion, even to admins or the owner.
    pub fn permits_delete(&self, role: Role) -> bool {
        match self {
            FeedScope::AllPublic => role.is_admin(),
            FeedScope::SingleUser(_) => false,
        }
    }

    pub fn account_id(&self) -> Option<i64> {
        match self {
            FeedScope::AllPublic => None,
            FeedScope::SingleUser(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedComment {
    pub id: i64,
    #[serde(rename = "user")]
    pub author_name: String,
    pub username: String,
    pub user_image: String,
    pub post_id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    pub id: i64,
    #[serde(rename = "imageurl")]
    pub image_url: Option<String>,
    pub user_id: i64,
    pub username: String,
    pub user_profile_image: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "post_desc")]
    pub body: String,
    #[serde(rename = "editedPost")]
    pub edited: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "likes_count")]
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(rename = "same_user")]
    pub is_owned_by_viewer: bool,
    #[serde(rename = "is_liked")]
    pub is_liked_by_viewer: bool,
    pub comments: Vec<FeedComment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardInfo {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub username: String,
    pub user_image: String,
}

/// The `results` object of a feed envelope.
#[derive(Debug, Clone, Serialize)]
pub struct FeedResults {
    #[serde(rename = "socialPosts")]
    pub posts: Vec<FeedPost>,
    #[serde(rename = "userLikedPosts")]
    pub liked_post_ids: Vec<i64>,
    #[serde(rename = "userComments")]
    pub comments_by_post: BTreeMap<i64, Vec<FeedComment>>,
    #[serde(rename = "permissionToDelete")]
    pub can_delete: bool,
    #[serde(
        rename = "userDashboardInformation",
        skip_serializing_if = "Option::is_none"
    )]
    pub dashboard: Option<DashboardInfo>,
}

impl FeedResults {
    pub fn empty(can_delete: bool) -> Self {
        Self {
            posts: Vec::new(),
            liked_post_ids: Vec::new(),
            comments_by_post: BTreeMap::new(),
            can_delete,
            dashboard: None,
        }
    }
}
