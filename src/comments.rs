use uuid::Uuid;
use crate::config::*;
use crate::core::helpers::now_iso;
use crate::core::store::Store;
use crate::models::models::{Comment, CommentView};
use crate::users::get_user;

pub fn create_comment(
    store: &Store,
    post_id: &str,
    user_id: &str,
    text: &str,
) -> anyhow::Result<Comment> {
    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        user_id: user_id.to_string(),
        text: text.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&comment_key(&comment.id), &comment)?;

    let mut ids = store.get_list(&comments_key(post_id))?;
    ids.push(comment.id.clone());
    store.set_json(&comments_key(post_id), &ids)?;

    Ok(comment)
}

/// Comments on a post, oldest first, with their authors.
pub fn comments_for_post(store: &Store, post_id: &str) -> anyhow::Result<Vec<CommentView>> {
    let mut comments = Vec::new();
    for id in store.get_list(&comments_key(post_id))? {
        let Some(comment) = store.get_json::<Comment>(&comment_key(&id))? else {
            continue;
        };
        if let Some(author) = get_user(store, &comment.user_id)? {
            comments.push(CommentView { comment, author });
        }
    }
    Ok(comments)
}

pub fn count_comments(store: &Store, post_id: &str) -> anyhow::Result<usize> {
    Ok(store.get_list(&comments_key(post_id))?.len())
}
