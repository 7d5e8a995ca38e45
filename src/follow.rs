use spin_sdk::http::Request;
use http::StatusCode;
use crate::models::models::Followings;
use crate::core::errors::{ApiError, ViewResult};
use crate::core::helpers::{html_response, login_redirect, redirect};
use crate::core::store::Store;
use crate::auth::current_user;
use crate::posts::{paginate_views, posts_by_authors, requested_page};
use crate::templates::{self, profile_url};
use crate::users::find_user_by_username;
use crate::config::*;

/// Adds the edge `follower -> following`. Following yourself is a no-op, as
/// is following someone twice. Returns whether an edge was created.
pub fn follow_user(store: &Store, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    if follower_id == following_id {
        return Ok(false);
    }

    let followings_key = followings_key(follower_id);
    let mut followings: Followings = store.get_list(&followings_key)?;

    if followings.iter().any(|id| id == following_id) {
        return Ok(false);
    }
    followings.push(following_id.to_string());
    store.set_json(&followings_key, &followings)?;
    Ok(true)
}

/// Removes the edge. Returns `false` when there was nothing to remove.
pub fn unfollow_user(store: &Store, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    let followings_key = followings_key(follower_id);
    let mut followings: Followings = store.get_list(&followings_key)?;

    let before = followings.len();
    followings.retain(|id| id != following_id);
    if followings.len() == before {
        return Ok(false);
    }
    store.set_json(&followings_key, &followings)?;
    Ok(true)
}

pub fn is_following(store: &Store, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    Ok(get_followings(store, follower_id)?
        .iter()
        .any(|id| id == following_id))
}

pub fn get_followings(store: &Store, user_id: &str) -> anyhow::Result<Followings> {
    store.get_list(&followings_key(user_id))
}

pub fn get_followers(store: &Store, user_id: &str) -> anyhow::Result<Vec<String>> {
    let mut followers = Vec::new();
    for id in store.get_list(USERS_LIST_KEY)? {
        if get_followings(store, &id)?.iter().any(|f| f == user_id) {
            followers.push(id);
        }
    }
    Ok(followers)
}

pub fn count_followers(store: &Store, user_id: &str) -> anyhow::Result<usize> {
    Ok(get_followers(store, user_id)?.len())
}

/// Total number of follow edges.
pub fn count_follows(store: &Store) -> anyhow::Result<usize> {
    let mut total = 0;
    for id in store.get_list(USERS_LIST_KEY)? {
        total += get_followings(store, &id)?.len();
    }
    Ok(total)
}

// === HTTP Handlers ===

/// `GET /follow/`: posts by everyone the viewer follows.
pub fn follow_index(store: &Store, req: &Request) -> ViewResult {
    let user = match current_user(store, req) {
        Some(u) => u,
        None => return Ok(login_redirect(req.path())),
    };

    let followings = get_followings(store, &user.id)?;
    let page = paginate_views(store, posts_by_authors(store, &followings)?, requested_page(req))?;

    Ok(html_response(
        StatusCode::OK,
        templates::follow_page(Some(&user), &page),
    ))
}

/// `GET|POST /profile/{username}/follow/`
pub fn profile_follow(store: &Store, req: &Request, username: &str) -> ViewResult {
    let user = match current_user(store, req) {
        Some(u) => u,
        None => return Ok(login_redirect(req.path())),
    };

    let author = find_user_by_username(store, username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if follow_user(store, &user.id, &author.id)? {
        tracing::info!(follower = %user.username, author = %author.username, "followed");
    }

    Ok(redirect(&profile_url(&author.username)))
}

/// `GET|POST /profile/{username}/unfollow/`
pub fn profile_unfollow(store: &Store, req: &Request, username: &str) -> ViewResult {
    let user = match current_user(store, req) {
        Some(u) => u,
        None => return Ok(login_redirect(req.path())),
    };

    let author = find_user_by_username(store, username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !unfollow_user(store, &user.id, &author.id)? {
        tracing::warn!(follower = %user.username, author = %author.username, "unfollow without follow");
        return Err(ApiError::NotFound("You are not following this author".to_string()));
    }
    tracing::info!(follower = %user.username, author = %author.username, "unfollowed");

    Ok(redirect(&profile_url(&author.username)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::create_user;

    #[test]
    fn follow_is_idempotent_and_skips_self() {
        let store = Store::default();
        let ann = create_user(&store, "ann", "pw", None).unwrap();
        let bob = create_user(&store, "bob", "pw", None).unwrap();

        assert!(follow_user(&store, &ann.id, &bob.id).unwrap());
        assert!(!follow_user(&store, &ann.id, &bob.id).unwrap());
        assert!(!follow_user(&store, &ann.id, &ann.id).unwrap());

        assert_eq!(get_followings(&store, &ann.id).unwrap(), vec![bob.id.clone()]);
        assert_eq!(get_followers(&store, &bob.id).unwrap(), vec![ann.id.clone()]);
        assert_eq!(count_follows(&store).unwrap(), 1);
        assert!(is_following(&store, &ann.id, &bob.id).unwrap());
        assert!(!is_following(&store, &bob.id, &ann.id).unwrap());
    }

    #[test]
    fn unfollow_restores_edge_count() {
        let store = Store::default();
        let ann = create_user(&store, "ann", "pw", None).unwrap();
        let bob = create_user(&store, "bob", "pw", None).unwrap();
        let before = count_follows(&store).unwrap();

        follow_user(&store, &ann.id, &bob.id).unwrap();
        assert!(unfollow_user(&store, &ann.id, &bob.id).unwrap());
        assert_eq!(count_follows(&store).unwrap(), before);

        assert!(!unfollow_user(&store, &ann.id, &bob.id).unwrap());
    }
}
