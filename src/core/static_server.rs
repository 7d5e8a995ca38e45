use spin_sdk::http::Response;
use rust_embed::RustEmbed;
use mime_guess::from_path;
use crate::core::errors::{ApiError, ViewResult};

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

/// `GET /static/{path}`
pub fn serve_static(path: &str) -> ViewResult {
    let file_path = path.trim_start_matches("/static/");

    let file = Assets::get(file_path)
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let mime = from_path(file_path).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("content-type", mime.as_ref())
        .header("cache-control", "public, max-age=3600")
        .body(file.data.to_vec())
        .build())
}
