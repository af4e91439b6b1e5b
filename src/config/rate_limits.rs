use crate::domain::account::Role;

/// Per-role quotas for write-heavy and search actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub posts_per_hour: u32,
    pub posts_per_day: u32,
    pub likes_per_hour: u32,
    pub comments_per_hour: u32,
    pub searches_per_hour: u32,
}

impl RateLimits {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::User => RateLimits {
                posts_per_hour: 20,
                posts_per_day: 100,
                likes_per_hour: 500,
                comments_per_hour: 100,
                searches_per_hour: 300,
            },
            Role::Admin => RateLimits {
                posts_per_hour: 200,
                posts_per_day: 1000,
                likes_per_hour: 5000,
                comments_per_hour: 1000,
                searches_per_hour: 3000,
            },
        }
    }

    /// Every (limit, window) pair that applies to an action.
    pub fn windows_for(&self, action: RateAction) -> Vec<(u32, RateWindow)> {
        match action {
            RateAction::Post => vec![
                (self.posts_per_hour, RateWindow::Hour),
                (self.posts_per_day, RateWindow::Day),
            ],
            RateAction::Like => vec![(self.likes_per_hour, RateWindow::Hour)],
            RateAction::Comment => vec![(self.comments_per_hour, RateWindow::Hour)],
            RateAction::Search => vec![(self.searches_per_hour, RateWindow::Hour)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAction {
    Post,
    Like,
    Comment,
    Search,
}

impl RateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateAction::Post => "post",
            RateAction::Like => "like",
            RateAction::Comment => "comment",
            RateAction::Search => "search",
        }
    }
}

/// Time window for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Hour,
    Day,
}

impl RateWindow {
    pub fn seconds(&self) -> u64 {
        match self {
            RateWindow::Hour => 3600,
            RateWindow::Day => 86400,
        }
    }
}

/// Calculate current window timestamp for rate limiting
pub fn current_window(window_seconds: u64) -> u64 {
    let now = time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
    now / window_seconds
}
