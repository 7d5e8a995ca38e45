use std::sync::OnceLock;

use ammonia::Builder;
use html_escape::{encode_double_quoted_attribute, encode_text};
use http::StatusCode;
use regex::Regex;
use rust_embed::RustEmbed;
use validator::ValidationErrors;

use crate::core::pagination::Page;
use crate::forms::{first_error, CommentForm, GroupForm, PostForm, SignupForm};
use crate::media::media_url;
use crate::models::models::{CommentView, Group, Post, PostView, User};

#[derive(RustEmbed)]
#[folder = "templates"]
struct Templates;

const FALLBACK_LAYOUT: &str =
    "<!DOCTYPE html><html><head><title>PAGE_TITLE</title></head><body><nav>PAGE_NAV</nav><main>PAGE_CONTENT</main></body></html>";

pub struct ProfileStats {
    pub posts: usize,
    pub followers: usize,
    pub following: usize,
    pub is_following: bool,
}

fn template(name: &str) -> Option<String> {
    Templates::get(name).and_then(|file| String::from_utf8(file.data.to_vec()).ok())
}

/// Substitutes placeholders in one pass, so inserted text is never scanned
/// for further placeholders.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|(token, value)| rest.find(token).map(|idx| (idx, *token, *value)))
            .min_by_key(|(idx, _, _)| *idx);

        match next {
            Some((idx, token, value)) => {
                out.push_str(&rest[..idx]);
                out.push_str(value);
                rest = &rest[idx + token.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

fn nav(viewer: Option<&User>) -> String {
    match viewer {
        Some(user) => format!(
            r#"<a href="/follow/">Subscriptions</a><a href="/create/">New post</a><a href="{}">{}</a><a href="/auth/logout/">Log out</a>"#,
            profile_url(&user.username),
            encode_text(&user.username)
        ),
        None => r#"<a href="/auth/login/">Log in</a><a href="/auth/signup/">Sign up</a>"#.to_string(),
    }
}

fn layout(title: &str, viewer: Option<&User>, content: &str) -> String {
    let base = template("base.html").unwrap_or_else(|| FALLBACK_LAYOUT.to_string());
    let title = encode_text(title);
    let nav = nav(viewer);
    fill(
        &base,
        &[
            ("PAGE_TITLE", title.as_ref()),
            ("PAGE_NAV", nav.as_str()),
            ("PAGE_CONTENT", content),
        ],
    )
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_url(post_id: &str) -> String {
    format!("/posts/{}/", post_id)
}

pub fn group_url(slug: &str) -> String {
    format!("/group/{}/", urlencoding::encode(slug))
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"https?://[^\s<]+").expect("Regex should compile")
    })
}

/// Escapes user text, turns URLs into links and keeps line breaks.
pub fn render_text(text: &str) -> String {
    let escaped = encode_text(text);
    let linked = url_regex().replace_all(&escaped, |caps: &regex::Captures| {
        let url = &caps[0];
        format!(r#"<a href="{}">{}</a>"#, url, url)
    });
    let with_breaks = linked.replace('\n', "<br>");

    Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(&with_breaks)
        .to_string()
}

fn format_date(iso: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(iso)
        .map(|d| d.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

fn image_html(post: &Post) -> String {
    post.image
        .as_ref()
        .map(|path| {
            format!(
                r#"<img src="{}" alt="">"#,
                encode_double_quoted_attribute(&media_url(path))
            )
        })
        .unwrap_or_default()
}

fn post_card(view: &PostView, show_group_link: bool) -> String {
    let group_link = match (&view.group, show_group_link) {
        (Some(group), true) => format!(
            r#"<a class="group-link" href="{}">#{}</a>"#,
            group_url(&group.slug),
            encode_text(&group.title)
        ),
        _ => String::new(),
    };

    format!(
        r#"<article class="post">
  <ul class="meta">
    <li>Author: <a href="{author_url}">{author}</a></li>
    <li>Date: {date}</li>
  </ul>
  {image}
  <div class="text">{text}</div>
  <a href="{detail_url}">details</a>
  {group_link}
</article>
"#,
        author_url = profile_url(&view.author.username),
        author = encode_text(&view.author.username),
        date = format_date(&view.post.created_at),
        image = image_html(&view.post),
        text = render_text(&view.post.text),
        detail_url = post_url(&view.post.id),
        group_link = group_link,
    )
}

fn post_list(page: &Page<PostView>, show_group_link: bool) -> String {
    if page.is_empty() {
        return r#"<p class="empty">No posts yet.</p>"#.to_string();
    }
    let mut html = String::new();
    for view in &page.items {
        html.push_str(&post_card(view, show_group_link));
    }
    html.push_str(&paginator(page));
    html
}

fn paginator<T>(page: &Page<T>) -> String {
    if page.num_pages() <= 1 && page.number <= 1 {
        return String::new();
    }

    let mut html = String::from(r#"<nav class="pagination">"#);
    if page.has_previous() {
        html.push_str(r#"<a href="?page=1">first</a>"#);
        html.push_str(&format!(r#"<a href="?page={}">previous</a>"#, page.number - 1));
    }
    for n in 1..=page.num_pages() {
        if n == page.number {
            html.push_str(&format!(r#"<span class="current">{}</span>"#, n));
        } else {
            html.push_str(&format!(r#"<a href="?page={}">{}</a>"#, n, n));
        }
    }
    if page.has_next() {
        html.push_str(&format!(r#"<a href="?page={}">next</a>"#, page.number + 1));
        html.push_str(&format!(r#"<a href="?page={}">last</a>"#, page.num_pages()));
    }
    html.push_str("</nav>");
    html
}

fn field_error(errors: &ValidationErrors, field: &str) -> String {
    first_error(errors, field)
        .map(|msg| format!(r#"<p class="error">{}</p>"#, encode_text(&msg)))
        .unwrap_or_default()
}

pub fn index_page(viewer: Option<&User>, page: &Page<PostView>) -> String {
    let content = format!(
        "<h1>Latest updates</h1>\n{}",
        post_list(page, true)
    );
    layout("Latest updates", viewer, &content)
}

pub fn group_page(viewer: Option<&User>, group: &Group, page: &Page<PostView>) -> String {
    let content = format!(
        r#"<h1>{}</h1>
<p class="group-description">{}</p>
{}"#,
        encode_text(&group.title),
        render_text(&group.description),
        post_list(page, false)
    );
    layout(&group.title, viewer, &content)
}

pub fn profile_page(
    viewer: Option<&User>,
    author: &User,
    stats: &ProfileStats,
    page: &Page<PostView>,
) -> String {
    let profile = template("profile.html").unwrap_or_else(|| {
        "<h1>PROFILE_USERNAME</h1><ul>PROFILE_STATS</ul>PROFILE_ACTIONS PROFILE_POSTS".to_string()
    });

    let stats_html = format!(
        "    <li>Posts: {}</li>\n    <li>Followers: {}</li>\n    <li>Following: {}</li>",
        stats.posts, stats.followers, stats.following
    );

    let actions = match viewer {
        Some(v) if v.id != author.id => {
            if stats.is_following {
                format!(
                    r#"<a class="button" href="{}unfollow/">Unfollow</a>"#,
                    profile_url(&author.username)
                )
            } else {
                format!(
                    r#"<a class="button" href="{}follow/">Follow</a>"#,
                    profile_url(&author.username)
                )
            }
        }
        _ => String::new(),
    };

    let username = encode_text(&author.username);
    let posts = post_list(page, true);
    let content = fill(
        &profile,
        &[
            ("PROFILE_USERNAME", username.as_ref()),
            ("PROFILE_STATS", stats_html.as_str()),
            ("PROFILE_ACTIONS", actions.as_str()),
            ("PROFILE_POSTS", posts.as_str()),
        ],
    );
    layout(&format!("Profile of {}", author.username), viewer, &content)
}

pub fn follow_page(viewer: Option<&User>, page: &Page<PostView>) -> String {
    let content = format!(
        "<h1>Posts from authors you follow</h1>\n{}",
        post_list(page, true)
    );
    layout("Subscriptions", viewer, &content)
}

pub fn post_detail_page(
    viewer: Option<&User>,
    view: &PostView,
    author_posts: usize,
    comments: &[CommentView],
    form: &CommentForm,
    errors: &ValidationErrors,
) -> String {
    let group = view
        .group
        .as_ref()
        .map(|g| {
            format!(
                r#"<li>Group: <a href="{}">{}</a></li>"#,
                group_url(&g.slug),
                encode_text(&g.title)
            )
        })
        .unwrap_or_default();

    let edit_link = match viewer {
        Some(v) if v.id == view.author.id => {
            format!(r#"<a class="button" href="{}edit/">Edit post</a>"#, post_url(&view.post.id))
        }
        _ => String::new(),
    };

    let mut comments_html = String::new();
    for c in comments {
        comments_html.push_str(&format!(
            r#"<div class="comment">
  <h5><a href="{}">{}</a> <small>{}</small></h5>
  <p>{}</p>
</div>
"#,
            profile_url(&c.author.username),
            encode_text(&c.author.username),
            format_date(&c.comment.created_at),
            render_text(&c.comment.text)
        ));
    }

    let comment_form = if viewer.is_some() {
        format!(
            r#"<form method="post" action="{}comment/">
  <label for="id_text">Add a comment</label>
  {}
  <textarea name="text" id="id_text" cols="30" rows="5">{}</textarea>
  <button type="submit">Send</button>
</form>"#,
            post_url(&view.post.id),
            field_error(errors, "text"),
            encode_text(&form.text)
        )
    } else {
        String::new()
    };

    let content = format!(
        r#"<article class="post post-detail">
  <ul class="meta">
    <li>Date: {date}</li>
    {group}
    <li>Author: <a href="{author_url}">{author}</a></li>
    <li>Author's posts: {author_posts}</li>
  </ul>
  {image}
  <div class="text">{text}</div>
  {edit_link}
</article>
<section class="comments">
{comments}
{comment_form}
</section>"#,
        date = format_date(&view.post.created_at),
        group = group,
        author_url = profile_url(&view.author.username),
        author = encode_text(&view.author.username),
        author_posts = author_posts,
        image = image_html(&view.post),
        text = render_text(&view.post.text),
        edit_link = edit_link,
        comments = comments_html,
        comment_form = comment_form,
    );

    let title: String = view.post.text.chars().take(30).collect();
    layout(&format!("Post {}", title), viewer, &content)
}

pub fn post_form_page(
    viewer: Option<&User>,
    form: &PostForm,
    errors: &ValidationErrors,
    groups: &[Group],
    editing: Option<&Post>,
) -> String {
    let mut options = String::from(r#"<option value="">---------</option>"#);
    for g in groups {
        let selected = if form.group.as_deref() == Some(g.id.as_str()) { " selected" } else { "" };
        options.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            encode_double_quoted_attribute(&g.id),
            selected,
            encode_text(&g.title)
        ));
    }

    let (heading, action, button, current_image) = match editing {
        Some(post) => (
            "Edit post",
            format!("{}edit/", post_url(&post.id)),
            "Save",
            image_html(post),
        ),
        None => ("New post", "/create/".to_string(), "Add", String::new()),
    };

    let content = format!(
        r#"<h1>{heading}</h1>
<form method="post" action="{action}" enctype="multipart/form-data">
  <label for="id_text">Post text</label>
  {text_error}
  <textarea name="text" id="id_text" cols="40" rows="10">{text}</textarea>
  <small>Enter the text of the post</small>
  <label for="id_group">Group</label>
  {group_error}
  <select name="group" id="id_group">{options}</select>
  <small>Group the post will belong to</small>
  <label for="id_image">Image</label>
  {current_image}
  {image_error}
  <input type="file" name="image" id="id_image" accept="image/*">
  <button type="submit">{button}</button>
</form>"#,
        heading = heading,
        action = action,
        text_error = field_error(errors, "text"),
        text = encode_text(&form.text),
        group_error = field_error(errors, "group"),
        options = options,
        current_image = current_image,
        image_error = field_error(errors, "image"),
        button = button,
    );
    layout(heading, viewer, &content)
}

pub fn login_page(username: &str, next: Option<&str>, error: Option<&str>) -> String {
    let error = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, encode_text(msg)))
        .unwrap_or_default();
    let next = next
        .map(|n| {
            format!(
                r#"<input type="hidden" name="next" value="{}">"#,
                encode_double_quoted_attribute(n)
            )
        })
        .unwrap_or_default();

    let content = format!(
        r#"<h1>Log in</h1>
{error}
<form method="post" action="/auth/login/">
  {next}
  <label for="id_username">Username</label>
  <input type="text" name="username" id="id_username" value="{username}">
  <label for="id_password">Password</label>
  <input type="password" name="password" id="id_password">
  <button type="submit">Log in</button>
</form>"#,
        error = error,
        next = next,
        username = encode_double_quoted_attribute(username),
    );
    layout("Log in", None, &content)
}

pub fn signup_page(form: &SignupForm, errors: &ValidationErrors) -> String {
    let content = format!(
        r#"<h1>Sign up</h1>
{all_error}
<form method="post" action="/auth/signup/">
  <label for="id_username">Username</label>
  {username_error}
  <input type="text" name="username" id="id_username" value="{username}">
  <label for="id_email">Email (optional)</label>
  {email_error}
  <input type="email" name="email" id="id_email" value="{email}">
  <label for="id_password">Password</label>
  {password_error}
  <input type="password" name="password" id="id_password">
  <label for="id_password_confirmation">Repeat password</label>
  <input type="password" name="password_confirmation" id="id_password_confirmation">
  <button type="submit">Sign up</button>
</form>"#,
        all_error = field_error(errors, "__all__"),
        username_error = field_error(errors, "username"),
        username = encode_double_quoted_attribute(&form.username),
        email_error = field_error(errors, "email"),
        email = encode_double_quoted_attribute(form.email.as_deref().unwrap_or_default()),
        password_error = field_error(errors, "password"),
    );
    layout("Sign up", None, &content)
}

pub fn logged_out_page() -> String {
    let content = r#"<h1>You have logged out</h1>
<p><a href="/auth/login/">Log in again</a></p>"#;
    layout("Logged out", None, content)
}

pub fn group_form_page(viewer: Option<&User>, form: &GroupForm, errors: &ValidationErrors) -> String {
    let content = format!(
        r#"<h1>New group</h1>
<form method="post" action="/admin/groups/">
  <label for="id_title">Title</label>
  {title_error}
  <input type="text" name="title" id="id_title" value="{title}">
  <label for="id_slug">Slug</label>
  {slug_error}
  <input type="text" name="slug" id="id_slug" value="{slug}">
  <label for="id_description">Description</label>
  <textarea name="description" id="id_description">{description}</textarea>
  <button type="submit">Create</button>
</form>"#,
        title_error = field_error(errors, "title"),
        title = encode_double_quoted_attribute(&form.title),
        slug_error = field_error(errors, "slug"),
        slug = encode_double_quoted_attribute(&form.slug),
        description = encode_text(&form.description),
    );
    layout("New group", viewer, &content)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let content = format!(
        r#"<h1>{}</h1>
<p>{}</p>
<p><a href="/">Back to the home page</a></p>"#,
        status.as_u16(),
        encode_text(message)
    );
    layout(status.canonical_reason().unwrap_or("Error"), None, &content)
}
