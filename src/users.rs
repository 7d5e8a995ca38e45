use spin_sdk::http::Request;
use http::StatusCode;
use uuid::Uuid;
use ammonia::Builder;
use validator::{Validate, ValidationError, ValidationErrors};
use crate::models::models::User;
use crate::core::helpers::{hash_password, html_response, redirect};
use crate::core::errors::{ApiError, ViewResult};
use crate::core::store::Store;
use crate::forms::{FormData, SignupForm};
use crate::templates;
use crate::config::*;

fn sanitize_text(text: &str) -> String {
    // Plain text only, every tag stripped
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

pub fn get_user(store: &Store, user_id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(user_id))
}

pub fn find_user_by_username(store: &Store, username: &str) -> anyhow::Result<Option<User>> {
    for id in store.get_list(USERS_LIST_KEY)? {
        if let Some(u) = get_user(store, &id)? {
            if u.username == username {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

pub fn create_user(
    store: &Store,
    username: &str,
    password: &str,
    email: Option<&str>,
) -> Result<User, ApiError> {
    let sanitized_username = sanitize_text(username);
    if sanitized_username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }

    if find_user_by_username(store, &sanitized_username)?.is_some() {
        return Err(ApiError::Conflict("A user with that username already exists".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: sanitized_username,
        password: hash_password(password)?,
        email: email.map(sanitize_text),
    };
    store.set_json(&user_key(&user.id), &user)?;

    let mut users = store.get_list(USERS_LIST_KEY)?;
    users.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    tracing::info!(username = %user.username, "user registered");
    Ok(user)
}

/// `GET|POST /auth/signup/`
pub fn signup(store: &Store, req: &Request, method: &str) -> ViewResult {
    if method == "GET" {
        let page = templates::signup_page(&SignupForm::default(), &ValidationErrors::new());
        return Ok(html_response(StatusCode::OK, page));
    }

    let form = SignupForm::from_data(&FormData::from_request(req)?);
    if let Err(errors) = form.validate() {
        return Ok(html_response(StatusCode::OK, templates::signup_page(&form, &errors)));
    }

    match create_user(store, &form.username, &form.password, form.email.as_deref()) {
        Ok(_) => Ok(redirect("/")),
        Err(ApiError::Conflict(msg)) | Err(ApiError::BadRequest(msg)) => {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("username_taken");
            err.message = Some(msg.into());
            errors.add("username", err);
            Ok(html_response(StatusCode::OK, templates::signup_page(&form, &errors)))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_unique() {
        let store = Store::default();
        let leo = create_user(&store, "leo", "pw1", None).unwrap();
        assert!(matches!(
            create_user(&store, "leo", "pw2", None),
            Err(ApiError::Conflict(_))
        ));
        let found = find_user_by_username(&store, "leo").unwrap().unwrap();
        assert_eq!(found.id, leo.id);
        assert_ne!(found.password, "pw1");
    }

    #[test]
    fn username_markup_is_stripped() {
        let store = Store::default();
        let user = create_user(&store, "<b>kim</b>", "pw", Some("kim@example.com")).unwrap();
        assert_eq!(user.username, "kim");
        assert_eq!(user.email.as_deref(), Some("kim@example.com"));
    }
}
