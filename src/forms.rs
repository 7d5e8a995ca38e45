//! Form binding and validation.
//!
//! Request bodies arrive either url-encoded or as `multipart/form-data` (post
//! forms carry an image). Both are bound into [`FormData`] and from there
//! into the typed forms below, which are checked with `validator`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use multipart::server::Multipart;
use spin_sdk::http::Request;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::query_params::parse_form_body;
use crate::core::store::Store;
use crate::groups::get_group;
use crate::media::detect_image;
use crate::models::models::Post;

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Upload>,
}

impl FormData {
    pub fn from_request(req: &Request) -> Result<Self, ApiError> {
        let content_type = req
            .header("content-type")
            .and_then(|h| h.as_str())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("multipart/form-data") {
            let boundary = multipart_boundary(&content_type)
                .ok_or_else(|| ApiError::BadRequest("Missing multipart boundary".to_string()))?;
            Self::from_multipart(req.body(), &boundary)
        } else {
            Ok(FormData {
                fields: parse_form_body(req.body()),
                files: HashMap::new(),
            })
        }
    }

    fn from_multipart(body: &[u8], boundary: &str) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        let mut multipart = Multipart::with_body(body, boundary);

        loop {
            let entry = multipart
                .read_entry()
                .map_err(|e| ApiError::BadRequest(format!("Malformed form data: {}", e)))?;
            let Some(mut field) = entry else { break };

            let name = field.headers.name.to_string();
            let filename = field.headers.filename.clone();
            let content_type = field.headers.content_type.as_ref().map(|m| m.to_string());

            let mut data = Vec::new();
            field
                .data
                .read_to_end(&mut data)
                .map_err(|e| ApiError::BadRequest(format!("Malformed form data: {}", e)))?;

            match filename {
                // Browsers send an empty file part when nothing was picked.
                Some(filename) if filename.is_empty() && data.is_empty() => {}
                Some(filename) => {
                    let content_type = content_type.unwrap_or_else(|| {
                        mime_guess::from_path(&filename).first_or_octet_stream().to_string()
                    });
                    form.files.insert(name, Upload { filename, content_type, data });
                }
                None => {
                    form.fields.insert(name, String::from_utf8_lossy(&data).into_owned());
                }
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// A field that is absent or blank reads as `None`.
    pub fn optional_field(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn multipart_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// First message recorded for `field`, for display next to the input.
pub fn first_error(errors: &ValidationErrors, field: &str) -> Option<String> {
    errors
        .field_errors()
        .get(field)
        .and_then(|errs| errs.first())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
}

pub fn validate_post_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(error("required", "Post text can't be empty"));
    }
    if text.chars().count() > MAX_POST_LENGTH {
        return Err(error("too_long", "Post text is limited to 5000 characters"));
    }
    Ok(())
}

pub fn validate_comment_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(error("required", "Comment can't be empty"));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(error("too_long", "Comment is limited to 2000 characters"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.contains(&['<', '>', '&', '@', '\'', '"', ' ', '\n', '\t'][..]) {
        Err(error(
            "username_illegal_char",
            "User name is not allowed to contain any of < > & @ ' \" or spaces",
        ))
    } else {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Validate)]
pub struct PostForm {
    #[validate(custom(function = "validate_post_text"))]
    pub text: String,
    pub group: Option<String>,
    pub image: Option<Upload>,
}

impl PostForm {
    pub fn from_data(data: &FormData) -> Self {
        PostForm {
            text: data.field("text").trim().to_string(),
            group: data.optional_field("group"),
            image: data.files.get("image").cloned(),
        }
    }

    /// Initial values for editing an existing post.
    pub fn from_post(post: &Post) -> Self {
        PostForm {
            text: post.text.clone(),
            group: post.group_id.clone(),
            image: None,
        }
    }

    /// Field validation plus the checks that need the store. The outer
    /// error is a storage failure, the inner one the form errors.
    pub fn clean(&self, store: &Store) -> anyhow::Result<Result<(), ValidationErrors>> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Some(group_id) = &self.group {
            if get_group(store, group_id)?.is_none() {
                errors.add(
                    "group",
                    error("invalid_choice", "Select a valid group."),
                );
            }
        }

        if let Some(image) = &self.image {
            if detect_image(&image.data).is_none() {
                errors.add(
                    "image",
                    error("invalid_image", "Upload a valid image."),
                );
            }
        }

        if errors.errors().is_empty() {
            Ok(Ok(()))
        } else {
            Ok(Err(errors))
        }
    }
}

#[derive(Debug, Default, Clone, Validate)]
pub struct CommentForm {
    #[validate(custom(function = "validate_comment_text"))]
    pub text: String,
}

impl CommentForm {
    pub fn from_data(data: &FormData) -> Self {
        CommentForm {
            text: data.field("text").trim().to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Validate)]
#[validate(schema(function = "passwords_match"))]
pub struct SignupForm {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3-50 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(min = 3, message = "Password must be at least 3 characters"))]
    pub password: String,
    pub password_confirmation: String,
}

pub fn passwords_match(form: &SignupForm) -> Result<(), ValidationError> {
    if form.password != form.password_confirmation {
        Err(error("password_match", "Passwords are not matching"))
    } else {
        Ok(())
    }
}

impl SignupForm {
    pub fn from_data(data: &FormData) -> Self {
        SignupForm {
            username: data.field("username").trim().to_string(),
            email: data.optional_field("email"),
            password: data.field("password"),
            password_confirmation: data.field("password_confirmation"),
        }
    }
}

#[derive(Debug, Default, Clone, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username can't be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password can't be empty"))]
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn from_data(data: &FormData) -> Self {
        LoginForm {
            username: data.field("username").trim().to_string(),
            password: data.field("password"),
            next: data.optional_field("next"),
        }
    }
}

#[derive(Debug, Default, Clone, Validate)]
pub struct GroupForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    pub description: String,
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(error(
            "invalid_slug",
            "Slug may only contain letters, numbers, hyphens and underscores",
        ))
    }
}

impl GroupForm {
    pub fn from_data(data: &FormData) -> Self {
        GroupForm {
            title: data.field("title").trim().to_string(),
            slug: data.field("slug").trim().to_string(),
            description: data.field("description").trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        FormData {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }

    #[test]
    fn post_form_rejects_blank_text() {
        let form = PostForm::from_data(&data(&[("text", "   "), ("group", "")]));
        let errors = form.clean(&Store::default()).unwrap().unwrap_err();
        assert_eq!(
            first_error(&errors, "text").as_deref(),
            Some("Post text can't be empty")
        );
        assert!(form.group.is_none());
    }

    #[test]
    fn post_form_rejects_overlong_text() {
        let form = PostForm {
            text: "a".repeat(MAX_POST_LENGTH + 1),
            ..PostForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(first_error(&errors, "text").is_some());
    }

    #[test]
    fn post_form_rejects_unknown_group() {
        let form = PostForm::from_data(&data(&[("text", "hello"), ("group", "missing")]));
        let errors = form.clean(&Store::default()).unwrap().unwrap_err();
        assert_eq!(
            first_error(&errors, "group").as_deref(),
            Some("Select a valid group.")
        );
        assert!(first_error(&errors, "text").is_none());
    }

    #[test]
    fn post_form_rejects_non_image_upload() {
        let form = PostForm {
            text: "hello".to_string(),
            group: None,
            image: Some(Upload {
                filename: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                data: b"hi".to_vec(),
            }),
        };
        let errors = form.clean(&Store::default()).unwrap().unwrap_err();
        assert!(first_error(&errors, "image").is_some());
    }

    #[test]
    fn post_form_checks_image_bytes_not_labels() {
        let with_image = |content_type: &str, data: &[u8]| PostForm {
            text: "hello".to_string(),
            group: None,
            image: Some(Upload {
                filename: "upload.png".to_string(),
                content_type: content_type.to_string(),
                data: data.to_vec(),
            }),
        };
        let store = Store::default();

        let svg = with_image(
            "image/svg+xml",
            b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>",
        );
        assert!(svg.clean(&store).unwrap().is_err());

        let fake_png = with_image("image/png", b"this is not a png");
        assert!(fake_png.clean(&store).unwrap().is_err());

        let real_gif = with_image("application/octet-stream", b"GIF89a\x01\x00\x01\x00");
        assert!(real_gif.clean(&store).unwrap().is_ok());
    }

    #[test]
    fn post_form_surfaces_storage_errors() {
        let store = Store::default();
        store.set(&group_key("broken"), b"{not json").unwrap();

        let form = PostForm::from_data(&data(&[("text", "hello"), ("group", "broken")]));
        assert!(form.clean(&store).is_err());
    }

    #[test]
    fn comment_form_requires_text() {
        assert!(CommentForm::from_data(&data(&[("text", "")])).validate().is_err());
        assert!(CommentForm::from_data(&data(&[("text", "nice")])).validate().is_ok());
    }

    #[test]
    fn signup_form_checks_passwords_and_username() {
        let ok = SignupForm::from_data(&data(&[
            ("username", "leo"),
            ("email", ""),
            ("password", "secret"),
            ("password_confirmation", "secret"),
        ]));
        assert!(ok.validate().is_ok());
        assert!(ok.email.is_none());

        let mismatch = SignupForm {
            password_confirmation: "other".to_string(),
            ..ok.clone()
        };
        assert!(mismatch.validate().is_err());

        let bad_name = SignupForm {
            username: "le o".to_string(),
            ..ok
        };
        let errors = bad_name.validate().unwrap_err();
        assert!(first_error(&errors, "username").is_some());
    }

    #[test]
    fn group_form_checks_slug() {
        let form = GroupForm::from_data(&data(&[("title", "Cats"), ("slug", "cats and dogs")]));
        let errors = form.validate().unwrap_err();
        assert!(first_error(&errors, "slug").is_some());
        assert!(validate_slug("cats-2").is_ok());
    }

    #[test]
    fn multipart_body_is_bound() {
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"text\"\r\n\r\n",
            "Hello\r\n",
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"small.gif\"\r\n",
            "Content-Type: image/gif\r\n\r\n",
            "GIF89a\r\n",
            "--XyZ--\r\n"
        );
        let form = FormData::from_multipart(body.as_bytes(), "XyZ").unwrap();
        assert_eq!(form.field("text"), "Hello");
        let image = form.files.get("image").unwrap();
        assert_eq!(image.filename, "small.gif");
        assert_eq!(image.content_type, "image/gif");
        assert_eq!(image.data, b"GIF89a");
    }

    #[test]
    fn boundary_is_read_from_content_type() {
        assert_eq!(
            multipart_boundary("multipart/form-data; boundary=\"abc\"").as_deref(),
            Some("abc")
        );
        assert_eq!(multipart_boundary("multipart/form-data"), None);
    }
}
