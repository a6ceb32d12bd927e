use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Generate a metadata.txt for every product folder under ROOT.
///
/// ROOT is expected to contain one directory per category, each containing
/// one directory per product with that product's images and videos. Products
/// that already have a metadata.txt are left untouched.
#[derive(Debug, Parser)]
#[command(name = "generate_metadata", version)]
pub struct Args {
    /// Root directory containing the category folders
    pub root: PathBuf,

    /// API key for the completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the completion API
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    /// Vision-capable model to use
    #[arg(long, default_value = "gpt-4o")]
    pub model: String,

    /// Maximum number of images sent to the model per product
    #[arg(long, default_value_t = 4)]
    pub max_images: usize,

    /// Recognized image extensions (comma separated, no dots)
    #[arg(long, value_delimiter = ',', default_values_t = ["jpg", "jpeg", "png", "webp"].map(String::from))]
    pub image_extensions: Vec<String>,

    /// Recognized video extensions (comma separated, no dots)
    #[arg(long, value_delimiter = ',', default_values_t = ["mp4", "mov", "avi"].map(String::from))]
    pub video_extensions: Vec<String>,

    /// Language the generated metadata should be written in
    #[arg(long, default_value = "español")]
    pub language: String,

    /// Minimum word count requested for the description field
    #[arg(long, default_value_t = 40)]
    pub description_words_min: u32,

    /// Maximum word count requested for the description field
    #[arg(long, default_value_t = 60)]
    pub description_words_max: u32,

    /// Output-size cap for each completion, in tokens
    #[arg(long, default_value_t = 500)]
    pub max_tokens: u32,
}

impl Args {
    pub fn into_config(self) -> Config {
        Config {
            root: self.root,
            api_key: self.api_key,
            api_base: self.api_base,
            model: self.model,
            max_images_per_product: self.max_images,
            image_extensions: lowercase_all(self.image_extensions),
            video_extensions: lowercase_all(self.video_extensions),
            language: self.language,
            description_words_min: self.description_words_min,
            description_words_max: self.description_words_max,
            max_tokens: self.max_tokens,
        }
    }
}

fn lowercase_all(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_configuration() {
        let args =
            Args::try_parse_from(["generate_metadata", "/tmp/catalog", "--api-key", "sk-test"])
                .unwrap();

        assert_eq!(args.model, "gpt-4o");
        assert_eq!(args.max_images, 4);
        assert_eq!(args.language, "español");
        assert_eq!(args.description_words_min, 40);
        assert_eq!(args.description_words_max, 60);
        assert_eq!(args.max_tokens, 500);

        let config = args.into_config();
        assert_eq!(config.image_extensions, ["jpg", "jpeg", "png", "webp"]);
        assert_eq!(config.video_extensions, ["mp4", "mov", "avi"]);
    }

    #[test]
    fn extension_overrides_are_normalized() {
        let args = Args::try_parse_from([
            "generate_metadata",
            "/tmp/catalog",
            "--api-key",
            "sk-test",
            "--image-extensions",
            ".JPG,Png",
        ])
        .unwrap();

        let config = args.into_config();
        assert_eq!(config.image_extensions, ["jpg", "png"]);
    }
}
