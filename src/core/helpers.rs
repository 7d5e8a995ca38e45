use spin_sdk::http::Response;
use http::StatusCode;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use argon2::password_hash::SaltString;
use rand::rngs::OsRng;
use uuid::Uuid;
use crate::config::LOGIN_URL;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

pub fn html_response(status: StatusCode, body: impl Into<Vec<u8>>) -> Response {
    Response::builder()
        .status(status.as_u16())
        .header("content-type", "text/html; charset=utf-8")
        .body(body.into())
        .build()
}

pub fn redirect(location: &str) -> Response {
    Response::builder()
        .status(StatusCode::FOUND.as_u16())
        .header("location", location)
        .build()
}

/// Redirects an anonymous visitor to the login page, remembering where they
/// were headed.
pub fn login_redirect(next: &str) -> Response {
    redirect(&login_url(next))
}

pub fn login_url(next: &str) -> String {
    let encoded = urlencoding::encode(next).replace("%2F", "/");
    format!("{}?next={}", LOGIN_URL, encoded)
}

/// Only same-site paths are followed after login.
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_keeps_slashes() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url("/profile/a b/follow/"),
            "/auth/login/?next=/profile/a%20b/follow/"
        );
    }

    #[test]
    fn rejects_offsite_redirects() {
        assert!(is_safe_redirect("/follow/"));
        assert!(!is_safe_redirect("//evil.example"));
        assert!(!is_safe_redirect("https://evil.example"));
        assert!(!is_safe_redirect(""));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("other", &hash));
        assert!(!verify_password("secret", "not-a-hash"));
    }
}
