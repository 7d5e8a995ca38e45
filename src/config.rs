pub const POSTS_PER_PAGE: usize = 10;
pub const INDEX_CACHE_SECONDS: i64 = 20;

pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_GROUP_TITLE_LENGTH: usize = 200;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_URL: &str = "/auth/login/";

pub const USERS_LIST_KEY: &str = "users_list";
pub const GROUPS_LIST_KEY: &str = "groups_list";
pub const FEED_KEY: &str = "feed";
pub const TOKENS_LIST_KEY: &str = "tokens_list";
pub const CACHE_KEYS_KEY: &str = "cache_keys";
pub const SEEDED_KEY: &str = "seeded";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn group_key(id: &str) -> String {
    format!("group:{}", id)
}

pub fn comment_key(id: &str) -> String {
    format!("comment:{}", id)
}

pub fn comments_key(post_id: &str) -> String {
    format!("comments:{}", post_id)
}

pub fn followings_key(user_id: &str) -> String {
    format!("followings:{}", user_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn media_key(path: &str) -> String {
    format!("media:{}", path)
}

pub fn media_data_key(path: &str) -> String {
    format!("media-data:{}", path)
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("YATUBE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

/// Usernames allowed to manage groups and clear the page cache.
pub fn admin_usernames() -> Vec<String> {
    std::env::var("YATUBE_ADMINS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn seed_demo_data() -> bool {
    std::env::var("YATUBE_SEED_DATA")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

pub fn bind_address() -> String {
    std::env::var("YATUBE_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string())
}
