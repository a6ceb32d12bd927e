use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;

/// Media files found directly inside one product folder, split by kind and
/// sorted by filename.
#[derive(Debug, Default)]
pub struct ProductMedia {
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum MediaKind {
    Image,
    Video,
}

/// List the media files directly inside a product directory. Nested
/// directories are not descended into; files matching neither extension set
/// are ignored.
pub fn collect_media(product_dir: &Path, config: &Config) -> Result<ProductMedia> {
    let mut media = ProductMedia::default();

    for entry_result in WalkDir::new(product_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry_result.with_context(|| {
            format!(
                "Failed to list product directory: {}",
                product_dir.display()
            )
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(filename) = entry.file_name().to_str() else {
            continue;
        };

        // macOS clutter: .DS_Store, AppleDouble ._* sidecars
        if filename.starts_with('.') {
            continue;
        }

        match classify(filename, config) {
            Some(MediaKind::Image) => media.images.push(filename.to_string()),
            Some(MediaKind::Video) => media.videos.push(filename.to_string()),
            None => {}
        }
    }

    Ok(media)
}

/// Case-insensitive extension match; a file belongs to at most one class.
fn classify(filename: &str, config: &Config) -> Option<MediaKind> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_lowercase();

    if config.image_extensions.iter().any(|e| *e == extension) {
        Some(MediaKind::Image)
    } else if config.video_extensions.iter().any(|e| *e == extension) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(root: &Path) -> Config {
        Config {
            root: root.to_path_buf(),
            api_key: "sk-test".to_string(),
            api_base: "http://localhost".to_string(),
            model: "gpt-4o".to_string(),
            max_images_per_product: 4,
            image_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
            video_extensions: vec!["mp4".to_string(), "mov".to_string(), "avi".to_string()],
            language: "español".to_string(),
            description_words_min: 40,
            description_words_max: 60,
            max_tokens: 500,
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn classifies_by_extension_case_insensitively() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "img1.jpg");
        touch(dir, "img2.PNG");
        touch(dir, "clip.mp4");
        touch(dir, "notes.txt");
        touch(dir, ".DS_Store");
        touch(dir, "._img1.jpg");

        let media = collect_media(dir, &test_config(dir)).unwrap();
        assert_eq!(media.images, ["img1.jpg", "img2.PNG"]);
        assert_eq!(media.videos, ["clip.mp4"]);
    }

    #[test]
    fn does_not_recurse_into_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "front.webp");
        let nested = dir.join("extra");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "hidden.jpg");

        let media = collect_media(dir, &test_config(dir)).unwrap();
        assert_eq!(media.images, ["front.webp"]);
        assert!(media.videos.is_empty());
    }

    #[test]
    fn empty_directory_yields_no_media() {
        let tmp = TempDir::new().unwrap();
        let media = collect_media(tmp.path(), &test_config(tmp.path())).unwrap();
        assert!(media.images.is_empty());
        assert!(media.videos.is_empty());
    }

    #[test]
    fn files_without_extension_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "README");
        touch(dir, "side.jpeg");

        let media = collect_media(dir, &test_config(dir)).unwrap();
        assert_eq!(media.images, ["side.jpeg"]);
    }
}
