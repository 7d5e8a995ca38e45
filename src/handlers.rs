//! Route table shared by the Spin component and the native server.

use spin_sdk::http::{Method, Request, Response};
use http::StatusCode;
use crate::core::errors::{ApiError, ViewResult};
use crate::core::static_server::serve_static;
use crate::core::store::Store;
use crate::{admin, auth, follow, media, posts, users};

#[derive(Debug, PartialEq)]
pub enum Route {
    Index,
    Group(String),
    Profile(String),
    ProfileFollow(String),
    ProfileUnfollow(String),
    PostDetail(String),
    PostCreate,
    PostEdit(String),
    AddComment(String),
    FollowIndex,
    Signup,
    Login,
    Logout,
    AdminGroups,
    AdminCacheClear,
    Media(String),
    Static(String),
}

impl Route {
    fn read_only(&self) -> bool {
        matches!(
            self,
            Route::Index
                | Route::Group(_)
                | Route::Profile(_)
                | Route::PostDetail(_)
                | Route::FollowIndex
                | Route::Media(_)
                | Route::Static(_)
        )
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Maps a request path onto a route. Page routes end with a slash.
pub fn resolve(path: &str) -> Option<Route> {
    if path.starts_with("/static/") {
        return Some(Route::Static(path.to_string()));
    }
    if path.starts_with("/media/") {
        return Some(Route::Media(path.to_string()));
    }
    if !path.ends_with('/') {
        return None;
    }

    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    let route = match segments.as_slice() {
        [] => Route::Index,
        ["group", slug] => Route::Group(slug.to_string()),
        ["profile", name] => Route::Profile(name.to_string()),
        ["profile", name, "follow"] => Route::ProfileFollow(name.to_string()),
        ["profile", name, "unfollow"] => Route::ProfileUnfollow(name.to_string()),
        ["posts", id] => Route::PostDetail(id.to_string()),
        ["posts", id, "edit"] => Route::PostEdit(id.to_string()),
        ["posts", id, "comment"] => Route::AddComment(id.to_string()),
        ["create"] => Route::PostCreate,
        ["follow"] => Route::FollowIndex,
        ["auth", "signup"] => Route::Signup,
        ["auth", "login"] => Route::Login,
        ["auth", "logout"] => Route::Logout,
        ["admin", "groups"] => Route::AdminGroups,
        ["admin", "cache", "clear"] => Route::AdminCacheClear,
        _ => return None,
    };
    Some(route)
}

fn method_name(req: &Request) -> Option<&'static str> {
    match req.method() {
        Method::Get | Method::Head => Some("GET"),
        Method::Post => Some("POST"),
        _ => None,
    }
}

fn handle(store: &Store, req: &Request, method: &str, route: Route) -> ViewResult {
    if route.read_only() && method != "GET" {
        return Err(ApiError::MethodNotAllowed);
    }

    match route {
        Route::Index => posts::index(store, req),
        Route::Group(slug) => posts::group_posts(store, req, &slug),
        Route::Profile(name) => posts::profile(store, req, &name),
        Route::ProfileFollow(name) => follow::profile_follow(store, req, &name),
        Route::ProfileUnfollow(name) => follow::profile_unfollow(store, req, &name),
        Route::PostDetail(id) => posts::post_detail(store, req, &id),
        Route::PostCreate => posts::post_create(store, req, method),
        Route::PostEdit(id) => posts::post_edit(store, req, method, &id),
        Route::AddComment(id) => posts::add_comment(store, req, method, &id),
        Route::FollowIndex => follow::follow_index(store, req),
        Route::Signup => users::signup(store, req, method),
        Route::Login => auth::login_user(store, req, method),
        Route::Logout => auth::logout_user(store, req),
        Route::AdminGroups => admin::groups(store, req, method),
        Route::AdminCacheClear => admin::clear_cache(store, req, method),
        Route::Media(path) => media::serve_media(store, &path),
        Route::Static(path) => serve_static(&path),
    }
}

/// Unknown paths that only miss their trailing slash are redirected to the
/// slashed form.
fn unmatched(req: &Request, path: &str) -> ViewResult {
    let slashed = format!("{}/", path);
    if !path.ends_with('/') && resolve(&slashed).is_some() {
        let query = req
            .uri()
            .find('?')
            .map(|idx| &req.uri()[idx..])
            .unwrap_or_default();
        return Ok(Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY.as_u16())
            .header("location", format!("{}{}", slashed, query))
            .build());
    }
    Err(ApiError::NotFound("Page not found".to_string()))
}

pub fn dispatch(store: &Store, req: Request) -> Response {
    let path = req.path().to_string();

    let result = match method_name(&req) {
        None => Err(ApiError::MethodNotAllowed),
        Some(method) => match resolve(&path) {
            Some(route) => handle(store, &req, method, route),
            None => unmatched(&req, &path),
        },
    };

    match result {
        Ok(resp) => resp,
        Err(err) => {
            match &err {
                ApiError::Internal(e) => tracing::error!(path = %path, error = ?e, "request failed"),
                other => tracing::debug!(path = %path, error = %other, "request rejected"),
            }
            err.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_page_routes() {
        assert_eq!(resolve("/"), Some(Route::Index));
        assert_eq!(resolve("/group/cats/"), Some(Route::Group("cats".to_string())));
        assert_eq!(resolve("/profile/ann/"), Some(Route::Profile("ann".to_string())));
        assert_eq!(
            resolve("/profile/ann/unfollow/"),
            Some(Route::ProfileUnfollow("ann".to_string()))
        );
        assert_eq!(resolve("/posts/42/edit/"), Some(Route::PostEdit("42".to_string())));
        assert_eq!(resolve("/create/"), Some(Route::PostCreate));
        assert_eq!(resolve("/admin/cache/clear/"), Some(Route::AdminCacheClear));
        assert_eq!(
            resolve("/static/css/style.css"),
            Some(Route::Static("/static/css/style.css".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_and_unslashed_paths() {
        assert_eq!(resolve("/notfound/"), None);
        assert_eq!(resolve("/create"), None);
        assert_eq!(resolve("/posts/1/delete/"), None);
    }

    #[test]
    fn decodes_usernames() {
        assert_eq!(
            resolve("/profile/%D0%BB%D0%B5%D0%B2/"),
            Some(Route::Profile("лев".to_string()))
        );
    }
}
