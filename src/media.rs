use spin_sdk::http::Response;
use image::ImageFormat;
use rand::{distributions::Alphanumeric, Rng};
use crate::config::{media_data_key, media_key};
use crate::core::errors::{ApiError, ViewResult};
use crate::core::store::Store;
use crate::forms::Upload;
use crate::models::models::Media;

const UPLOAD_DIR: &str = "posts";

/// Content type of a raster image, read from its leading bytes. Anything
/// else, SVG included, is `None`.
pub fn detect_image(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

fn clean_file_name(name: &str) -> String {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", name, suffix),
    }
}

/// Stores an uploaded image and returns its media path, e.g. `posts/cat.gif`.
/// A taken name gets a random suffix.
pub fn save_upload(store: &Store, upload: &Upload) -> anyhow::Result<String> {
    let content_type = detect_image(&upload.data)
        .ok_or_else(|| anyhow::anyhow!("upload {} is not a supported image", upload.filename))?;

    let name = clean_file_name(&upload.filename);
    let mut path = format!("{}/{}", UPLOAD_DIR, name);

    while store.exists(&media_key(&path))? {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(7)
            .map(char::from)
            .collect();
        path = format!("{}/{}", UPLOAD_DIR, with_suffix(&name, &suffix));
    }

    let media = Media {
        content_type: content_type.to_string(),
        size: upload.data.len(),
    };
    store.set(&media_data_key(&path), &upload.data)?;
    store.set_json(&media_key(&path), &media)?;
    tracing::debug!(path = %path, bytes = media.size, "image stored");
    Ok(path)
}

pub fn delete_media(store: &Store, path: &str) -> anyhow::Result<()> {
    store.delete(&media_data_key(path))?;
    store.delete(&media_key(path))
}

pub fn media_url(path: &str) -> String {
    format!("/media/{}", path)
}

/// `GET /media/{path}`
pub fn serve_media(store: &Store, path: &str) -> ViewResult {
    let path = path.trim_start_matches("/media/");
    let not_found = || ApiError::NotFound("File not found".to_string());

    let media = store.get_json::<Media>(&media_key(path))?.ok_or_else(not_found)?;
    let data = store.get(&media_data_key(path))?.ok_or_else(not_found)?;

    Ok(Response::builder()
        .status(200)
        .header("content-type", media.content_type)
        .header("x-content-type-options", "nosniff")
        .body(data)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gif(name: &str) -> Upload {
        Upload {
            filename: name.to_string(),
            content_type: "image/gif".to_string(),
            data: b"GIF89a".to_vec(),
        }
    }

    #[test]
    fn colliding_names_get_a_suffix() {
        let store = Store::default();
        let first = save_upload(&store, &gif("small.gif")).unwrap();
        let second = save_upload(&store, &gif("small.gif")).unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));
    }

    #[test]
    fn file_names_are_cleaned() {
        assert_eq!(clean_file_name("../../etc/passwd"), "passwd");
        assert_eq!(clean_file_name("my cat.png"), "my_cat.png");
        assert_eq!(clean_file_name(".."), "upload");
    }

    #[test]
    fn stored_image_is_served() {
        let store = Store::default();
        let path = save_upload(&store, &gif("a.gif")).unwrap();
        assert_eq!(
            store.get(&media_data_key(&path)).unwrap(),
            Some(b"GIF89a".to_vec())
        );

        let resp = serve_media(&store, &media_url(&path)).unwrap();
        assert_eq!(*resp.status(), 200);
        assert_eq!(resp.body(), b"GIF89a");
        assert_eq!(
            resp.header("x-content-type-options").and_then(|h| h.as_str()),
            Some("nosniff")
        );

        assert!(matches!(
            serve_media(&store, "/media/posts/missing.gif"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn only_raster_images_are_detected() {
        assert_eq!(detect_image(b"GIF89a\x01\x00"), Some("image/gif"));
        assert_eq!(detect_image(b"\x89PNG\r\n\x1a\n\0\0"), Some("image/png"));
        assert_eq!(detect_image(b"\xff\xd8\xff\xe0\0\x10JFIF"), Some("image/jpeg"));
        assert_eq!(detect_image(b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>"), None);
        assert_eq!(detect_image(b"this is not a png"), None);
        assert_eq!(detect_image(b""), None);
    }

    #[test]
    fn stored_type_comes_from_the_bytes() {
        let store = Store::default();
        let upload = Upload {
            content_type: "image/png".to_string(),
            ..gif("mislabelled.png")
        };
        let path = save_upload(&store, &upload).unwrap();

        let resp = serve_media(&store, &media_url(&path)).unwrap();
        assert_eq!(
            resp.header("content-type").and_then(|h| h.as_str()),
            Some("image/gif")
        );

        let text = Upload {
            data: b"plain text".to_vec(),
            ..gif("notes.gif")
        };
        assert!(save_upload(&store, &text).is_err());
    }

    #[test]
    fn deleted_media_is_gone() {
        let store = Store::default();
        let path = save_upload(&store, &gif("gone.gif")).unwrap();
        delete_media(&store, &path).unwrap();
        assert!(matches!(
            serve_media(&store, &media_url(&path)),
            Err(ApiError::NotFound(_))
        ));
    }
}
