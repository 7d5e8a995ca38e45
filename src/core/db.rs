use crate::config::*;
use crate::core::store::Store;
use crate::follow::follow_user;
use crate::groups::{create_group, find_group_by_slug};
use crate::posts::create_post;
use crate::users::{create_user, find_user_by_username};
use crate::models::models::User;

fn ensure_user(store: &Store, username: &str, password: &str) -> anyhow::Result<(User, bool)> {
    if let Some(u) = find_user_by_username(store, username)? {
        return Ok((u, false));
    }
    let user = create_user(store, username, password, None)?;
    Ok((user, true))
}

/// Seeds demo accounts, groups and posts. Runs once per store.
pub fn init_test_data(store: &Store) -> anyhow::Result<()> {
    if store.exists(SEEDED_KEY)? {
        return Ok(()); // Already initialized
    }

    let cats = match find_group_by_slug(store, "cats")? {
        Some(g) => g,
        None => create_group(store, "Cats", "cats", "Everything about cats")?,
    };
    if find_group_by_slug(store, "travel")?.is_none() {
        create_group(store, "Travel", "travel", "Trips, routes and photos")?;
    }

    let (test, new_test) = ensure_user(store, "test", "test")?;
    if new_test {
        create_post(store, &test.id, "This is my first post on Yatube!", None, None)?;
    }

    let (alice, new_alice) = ensure_user(store, "alice", "alice")?;
    if new_alice {
        create_post(
            store,
            &alice.id,
            "Welcome to my blog! Excited to share thoughts here.",
            None,
            None,
        )?;
        create_post(
            store,
            &alice.id,
            "My cat learned to open the fridge today.",
            Some(&cats.id),
            None,
        )?;
    }

    let (bob, new_bob) = ensure_user(store, "bob", "bob")?;
    if new_bob {
        create_post(
            store,
            &bob.id,
            "Hey everyone! Just joined, looking forward to reading you all.",
            None,
            None,
        )?;
    }

    // "test" follows "bob"
    follow_user(store, &test.id, &bob.id)?;

    store.set(SEEDED_KEY, b"1")?;
    tracing::info!("demo data seeded");
    Ok(())
}

/// Wipes every entity and index the application writes.
pub fn reset_db_data(store: &Store) -> anyhow::Result<()> {
    let users = store.get_list(USERS_LIST_KEY)?;
    for id in &users {
        store.delete(&user_key(id))?;
        store.delete(&followings_key(id))?;
    }

    for id in store.get_list(FEED_KEY)? {
        if let Some(post) = store.get_json::<crate::models::models::Post>(&post_key(&id))? {
            if let Some(image) = &post.image {
                crate::media::delete_media(store, image)?;
            }
        }
        for comment_id in store.get_list(&comments_key(&id))? {
            store.delete(&comment_key(&comment_id))?;
        }
        store.delete(&comments_key(&id))?;
        store.delete(&post_key(&id))?;
    }

    for id in store.get_list(GROUPS_LIST_KEY)? {
        store.delete(&group_key(&id))?;
    }

    for token in store.get_list(TOKENS_LIST_KEY)? {
        store.delete(&token_key(&token))?;
    }

    crate::core::cache::clear(store)?;

    // Delete metadata
    for key in [USERS_LIST_KEY, FEED_KEY, GROUPS_LIST_KEY, TOKENS_LIST_KEY, SEEDED_KEY] {
        store.delete(key)?;
    }

    Ok(())
}
