use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub account_id: i64,
    #[serde(rename = "post_desc")]
    pub body: String,
    #[serde(rename = "imageurl")]
    pub image: Option<String>,
    #[serde(rename = "editedPost")]
    pub edited: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
