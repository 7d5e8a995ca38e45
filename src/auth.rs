use spin_sdk::http::{Request, Response};
use http::StatusCode;
use uuid::Uuid;
use validator::Validate;
use crate::models::models::{User, TokenData};
use crate::config::*;
use crate::core::errors::ViewResult;
use crate::core::helpers::{verify_password, now_iso, html_response, is_safe_redirect};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::store::Store;
use crate::forms::{FormData, LoginForm};
use crate::templates;
use crate::users::{find_user_by_username, get_user};

pub fn issue_token(store: &Store, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens = store.get_list(TOKENS_LIST_KEY)?;
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    Ok(token)
}

pub fn revoke_token(store: &Store, token: &str) -> anyhow::Result<()> {
    store.delete(&token_key(token))?;
    let mut tokens = store.get_list(TOKENS_LIST_KEY)?;
    tokens.retain(|t| t != token);
    store.set_json(TOKENS_LIST_KEY, &tokens)
}

/// Session token from the `Authorization: Bearer` header or the session
/// cookie.
pub fn request_token(req: &Request) -> Option<String> {
    let bearer = req
        .header("authorization")
        .and_then(|h| h.as_str())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    let cookies = req.header("cookie").and_then(|h| h.as_str())?;
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// User id behind the request's token. Expired tokens, and tokens whose
/// timestamp cannot be read, are revoked on sight.
pub fn validate_token(store: &Store, req: &Request) -> Option<String> {
    let token = request_token(req)?;
    let data = store.get_json::<TokenData>(&token_key(&token)).ok()??;

    if token_expired(&data, chrono::Utc::now()) {
        if let Err(e) = revoke_token(store, &token) {
            tracing::error!(error = ?e, "failed to revoke expired token");
        }
        return None;
    }
    Some(data.user_id)
}

fn token_expired(data: &TokenData, now: chrono::DateTime<chrono::Utc>) -> bool {
    match chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        Ok(created) => {
            let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
            age_hours > token_expiration_hours()
        }
        Err(_) => true,
    }
}

/// The logged-in user, if the session is valid and the account still exists.
pub fn current_user(store: &Store, req: &Request) -> Option<User> {
    let user_id = validate_token(store, req)?;
    get_user(store, &user_id).ok()?
}

pub fn is_admin(user: &User) -> bool {
    admin_usernames().iter().any(|name| *name == user.username)
}

fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// `GET|POST /auth/login/`
pub fn login_user(store: &Store, req: &Request, method: &str) -> ViewResult {
    if method == "GET" {
        let params = parse_query_params(req.uri());
        let next = get_string(&params, "next", None);
        let page = templates::login_page("", next.as_deref(), None);
        return Ok(html_response(StatusCode::OK, page));
    }

    let form = LoginForm::from_data(&FormData::from_request(req)?);
    let next = form.next.clone().filter(|n| is_safe_redirect(n));

    let user = if form.validate().is_ok() {
        find_user_by_username(store, &form.username)?
            .filter(|u| verify_password(&form.password, &u.password))
    } else {
        None
    };

    let user = match user {
        Some(u) => u,
        None => {
            tracing::warn!(username = %form.username, "failed login");
            let page = templates::login_page(
                &form.username,
                next.as_deref(),
                Some("Please enter a correct username and password."),
            );
            return Ok(html_response(StatusCode::OK, page));
        }
    };

    let token = issue_token(store, &user.id)?;
    tracing::info!(username = %user.username, "user logged in");

    Ok(Response::builder()
        .status(StatusCode::FOUND.as_u16())
        .header("location", next.as_deref().unwrap_or("/"))
        .header("set-cookie", session_cookie(&token))
        .build())
}

/// `GET|POST /auth/logout/`
pub fn logout_user(store: &Store, req: &Request) -> ViewResult {
    if let Some(token) = request_token(req) {
        revoke_token(store, &token)?;
    }

    Ok(Response::builder()
        .status(StatusCode::OK.as_u16())
        .header("content-type", "text/html; charset=utf-8")
        .header("set-cookie", expired_session_cookie())
        .body(templates::logged_out_page().into_bytes())
        .build())
}
