pub mod account;
pub mod engagement;
pub mod feed;
pub mod post;
