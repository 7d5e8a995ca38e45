use spin_sdk::http::Request;
use http::StatusCode;
use validator::{Validate, ValidationError, ValidationErrors};
use crate::auth::{current_user, is_admin};
use crate::core::cache;
use crate::core::errors::{ApiError, ViewResult};
use crate::core::helpers::{html_response, login_redirect, redirect};
use crate::core::store::Store;
use crate::forms::{FormData, GroupForm};
use crate::groups::create_group;
use crate::models::models::User;
use crate::templates::{self, group_url};

fn require_admin(store: &Store, req: &Request) -> Result<Option<User>, ApiError> {
    match current_user(store, req) {
        Some(user) if is_admin(&user) => Ok(Some(user)),
        Some(user) => {
            tracing::warn!(username = %user.username, path = %req.path(), "admin route refused");
            Err(ApiError::Forbidden)
        }
        None => Ok(None),
    }
}

/// `GET|POST /admin/groups/`
pub fn groups(store: &Store, req: &Request, method: &str) -> ViewResult {
    let Some(admin) = require_admin(store, req)? else {
        return Ok(login_redirect(req.path()));
    };

    if method == "GET" {
        let page = templates::group_form_page(Some(&admin), &GroupForm::default(), &ValidationErrors::new());
        return Ok(html_response(StatusCode::OK, page));
    }

    let form = GroupForm::from_data(&FormData::from_request(req)?);
    if let Err(errors) = form.validate() {
        let page = templates::group_form_page(Some(&admin), &form, &errors);
        return Ok(html_response(StatusCode::OK, page));
    }

    match create_group(store, &form.title, &form.slug, &form.description) {
        Ok(group) => Ok(redirect(&group_url(&group.slug))),
        Err(ApiError::Conflict(msg)) => {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("slug_taken");
            err.message = Some(msg.into());
            errors.add("slug", err);
            let page = templates::group_form_page(Some(&admin), &form, &errors);
            Ok(html_response(StatusCode::OK, page))
        }
        Err(e) => Err(e),
    }
}

/// `POST /admin/cache/clear/`
pub fn clear_cache(store: &Store, req: &Request, method: &str) -> ViewResult {
    if method != "POST" {
        return Err(ApiError::MethodNotAllowed);
    }
    let Some(admin) = require_admin(store, req)? else {
        return Ok(login_redirect(req.path()));
    };

    let cleared = cache::clear(store)?;
    tracing::info!(admin = %admin.username, cleared, "cache cleared by admin");
    Ok(redirect("/"))
}
