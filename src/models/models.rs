use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Group {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    pub text: String,
    /// Media path such as `posts/cat.gif`.
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

/// Metadata of a stored upload. The bytes live under their own key.
#[derive(Serialize, Deserialize)]
pub struct Media {
    pub content_type: String,
    pub size: usize,
}

/// A post joined with its author and group, ready to render.
#[derive(Clone, Debug)]
pub struct PostView {
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub comment: Comment,
    pub author: User,
}

pub type Followings = Vec<String>;
