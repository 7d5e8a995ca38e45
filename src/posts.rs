use spin_sdk::http::Request;
use http::StatusCode;
use uuid::Uuid;
use validator::ValidationErrors;
use crate::models::models::{Post, PostView, User};
use crate::core::cache;
use crate::core::helpers::{now_iso, validate_uuid, html_response, redirect, login_redirect};
use crate::core::errors::{ApiError, ViewResult};
use crate::core::pagination::{paginate, Page};
use crate::core::query_params::{get_int, parse_query_params};
use crate::core::store::Store;
use crate::auth::current_user;
use crate::comments::{comments_for_post, create_comment};
use crate::forms::{CommentForm, FormData, PostForm};
use crate::groups::{find_group_by_slug, get_group, list_groups};
use crate::media::save_upload;
use crate::templates::{self, post_url, profile_url, ProfileStats};
use crate::users::{find_user_by_username, get_user};
use crate::follow::{count_followers, get_followings, is_following};
use crate::config::*;

pub fn get_post(store: &Store, post_id: &str) -> anyhow::Result<Option<Post>> {
    if !validate_uuid(post_id) {
        return Ok(None);
    }
    store.get_json::<Post>(&post_key(post_id))
}

/// Every post, newest first.
pub fn all_posts(store: &Store) -> anyhow::Result<Vec<Post>> {
    let mut posts = Vec::new();
    for id in store.get_list(FEED_KEY)? {
        if let Some(p) = store.get_json::<Post>(&post_key(&id))? {
            posts.push(p);
        }
    }
    Ok(posts)
}

pub fn count_posts(store: &Store) -> anyhow::Result<usize> {
    Ok(store.get_list(FEED_KEY)?.len())
}

pub fn posts_by_author(store: &Store, user_id: &str) -> anyhow::Result<Vec<Post>> {
    Ok(all_posts(store)?
        .into_iter()
        .filter(|p| p.user_id == user_id)
        .collect())
}

pub fn posts_by_group(store: &Store, group_id: &str) -> anyhow::Result<Vec<Post>> {
    Ok(all_posts(store)?
        .into_iter()
        .filter(|p| p.group_id.as_deref() == Some(group_id))
        .collect())
}

pub fn posts_by_authors(store: &Store, user_ids: &[String]) -> anyhow::Result<Vec<Post>> {
    Ok(all_posts(store)?
        .into_iter()
        .filter(|p| user_ids.contains(&p.user_id))
        .collect())
}

pub fn create_post(
    store: &Store,
    user_id: &str,
    text: &str,
    group_id: Option<&str>,
    image: Option<String>,
) -> anyhow::Result<Post> {
    let post = Post {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        group_id: group_id.map(str::to_string),
        text: text.to_string(),
        image,
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(&post.id), &post)?;

    let mut feed = store.get_list(FEED_KEY)?;
    feed.insert(0, post.id.clone()); // prepend newest
    store.set_json(FEED_KEY, &feed)?;

    Ok(post)
}

/// Joins posts with their authors and groups. Posts whose author is gone are
/// skipped.
pub fn load_views(store: &Store, posts: Vec<Post>) -> anyhow::Result<Vec<PostView>> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let Some(author) = get_user(store, &post.user_id)? else {
            continue;
        };
        let group = match &post.group_id {
            Some(id) => get_group(store, id)?,
            None => None,
        };
        views.push(PostView { post, author, group });
    }
    Ok(views)
}

pub(crate) fn requested_page(req: &Request) -> usize {
    get_int(&parse_query_params(req.uri()), "page", 1)
}

pub(crate) fn paginate_views(
    store: &Store,
    posts: Vec<Post>,
    page_number: usize,
) -> anyhow::Result<Page<PostView>> {
    let page = paginate(posts, page_number, POSTS_PER_PAGE);
    let views = load_views(store, page.items)?;
    Ok(Page {
        items: views,
        number: page.number,
        per_page: page.per_page,
        total_count: page.total_count,
    })
}

/// `GET /`, cached per viewer and page for `INDEX_CACHE_SECONDS`. Only
/// pages that exist are cached.
pub fn index(store: &Store, req: &Request) -> ViewResult {
    let viewer = current_user(store, req);
    let page_number = requested_page(req);
    let key = cache::index_cache_key(viewer.as_ref().map(|u| u.id.as_str()), page_number);
    let now = chrono::Utc::now();

    if let Some(body) = cache::get(store, &key, now)? {
        return Ok(html_response(StatusCode::OK, body));
    }

    let page = paginate_views(store, all_posts(store)?, page_number)?;
    let body = templates::index_page(viewer.as_ref(), &page);
    if page.number <= page.num_pages() {
        cache::set(store, &key, &body, INDEX_CACHE_SECONDS, now)?;
    }

    Ok(html_response(StatusCode::OK, body))
}

/// `GET /group/{slug}/`
pub fn group_posts(store: &Store, req: &Request, slug: &str) -> ViewResult {
    let group = find_group_by_slug(store, slug)?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;
    let viewer = current_user(store, req);

    let page = paginate_views(store, posts_by_group(store, &group.id)?, requested_page(req))?;
    Ok(html_response(
        StatusCode::OK,
        templates::group_page(viewer.as_ref(), &group, &page),
    ))
}

/// `GET /profile/{username}/`
pub fn profile(store: &Store, req: &Request, username: &str) -> ViewResult {
    let author = find_user_by_username(store, username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let viewer = current_user(store, req);

    let posts = posts_by_author(store, &author.id)?;
    let stats = ProfileStats {
        posts: posts.len(),
        followers: count_followers(store, &author.id)?,
        following: get_followings(store, &author.id)?.len(),
        is_following: match &viewer {
            Some(v) => is_following(store, &v.id, &author.id)?,
            None => false,
        },
    };

    let page = paginate_views(store, posts, requested_page(req))?;
    Ok(html_response(
        StatusCode::OK,
        templates::profile_page(viewer.as_ref(), &author, &stats, &page),
    ))
}

fn load_post_view(store: &Store, post_id: &str) -> Result<PostView, ApiError> {
    let post = get_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    load_views(store, vec![post])?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

fn render_detail(
    store: &Store,
    viewer: Option<&User>,
    view: &PostView,
    form: &CommentForm,
    errors: &ValidationErrors,
) -> ViewResult {
    let author_posts = posts_by_author(store, &view.author.id)?.len();
    let comments = comments_for_post(store, &view.post.id)?;
    Ok(html_response(
        StatusCode::OK,
        templates::post_detail_page(viewer, view, author_posts, &comments, form, errors),
    ))
}

/// `GET /posts/{id}/`
pub fn post_detail(store: &Store, req: &Request, post_id: &str) -> ViewResult {
    let view = load_post_view(store, post_id)?;
    let viewer = current_user(store, req);
    render_detail(
        store,
        viewer.as_ref(),
        &view,
        &CommentForm::default(),
        &ValidationErrors::new(),
    )
}

/// `GET|POST /create/`
pub fn post_create(store: &Store, req: &Request, method: &str) -> ViewResult {
    let user = match current_user(store, req) {
        Some(u) => u,
        None => return Ok(login_redirect(req.path())),
    };

    if method == "GET" {
        let page = templates::post_form_page(
            Some(&user),
            &PostForm::default(),
            &ValidationErrors::new(),
            &list_groups(store)?,
            None,
        );
        return Ok(html_response(StatusCode::OK, page));
    }

    let form = PostForm::from_data(&FormData::from_request(req)?);
    if let Err(errors) = form.clean(store)? {
        let page = templates::post_form_page(
            Some(&user),
            &form,
            &errors,
            &list_groups(store)?,
            None,
        );
        return Ok(html_response(StatusCode::OK, page));
    }

    let image = match &form.image {
        Some(upload) => Some(save_upload(store, upload)?),
        None => None,
    };
    let post = create_post(store, &user.id, &form.text, form.group.as_deref(), image)?;
    tracing::info!(post_id = %post.id, author = %user.username, "post created");

    Ok(redirect(&profile_url(&user.username)))
}

/// `GET|POST /posts/{id}/edit/`
pub fn post_edit(store: &Store, req: &Request, method: &str, post_id: &str) -> ViewResult {
    let user = match current_user(store, req) {
        Some(u) => u,
        None => return Ok(login_redirect(req.path())),
    };

    let mut post = get_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    // Only the author may edit; everyone else lands on the read-only page.
    if post.user_id != user.id {
        return Ok(redirect(&post_url(&post.id)));
    }

    if method == "GET" {
        let page = templates::post_form_page(
            Some(&user),
            &PostForm::from_post(&post),
            &ValidationErrors::new(),
            &list_groups(store)?,
            Some(&post),
        );
        return Ok(html_response(StatusCode::OK, page));
    }

    let form = PostForm::from_data(&FormData::from_request(req)?);
    if let Err(errors) = form.clean(store)? {
        let page = templates::post_form_page(
            Some(&user),
            &form,
            &errors,
            &list_groups(store)?,
            Some(&post),
        );
        return Ok(html_response(StatusCode::OK, page));
    }

    if let Some(upload) = &form.image {
        post.image = Some(save_upload(store, upload)?);
    }
    post.text = form.text.clone();
    post.group_id = form.group.clone();
    post.updated_at = Some(now_iso());
    store.set_json(&post_key(&post.id), &post)?;
    tracing::info!(post_id = %post.id, "post updated");

    Ok(redirect(&post_url(&post.id)))
}

/// `GET|POST /posts/{id}/comment/`
pub fn add_comment(store: &Store, req: &Request, method: &str, post_id: &str) -> ViewResult {
    let user = match current_user(store, req) {
        Some(u) => u,
        None => return Ok(login_redirect(req.path())),
    };

    let view = load_post_view(store, post_id)?;
    if method == "GET" {
        return Ok(redirect(&post_url(&view.post.id)));
    }

    let form = CommentForm::from_data(&FormData::from_request(req)?);
    if let Err(errors) = validator::Validate::validate(&form) {
        return render_detail(store, Some(&user), &view, &form, &errors);
    }

    create_comment(store, &view.post.id, &user.id, &form.text)?;
    tracing::info!(post_id = %view.post.id, author = %user.username, "comment added");

    Ok(redirect(&post_url(&view.post.id)))
}
