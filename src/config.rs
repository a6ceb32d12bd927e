use std::path::PathBuf;

/// Every tunable for one run, resolved once at startup and passed into the
/// workflow explicitly rather than read from ambient state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding category folders, each holding product folders.
    pub root: PathBuf,
    /// Credential for the completion API.
    pub api_key: String,
    /// Base URL of the completion API, without a trailing path.
    pub api_base: String,
    /// Vision-capable model identifier.
    pub model: String,
    /// How many images of a product are sent to the model. Images beyond
    /// this count are still recorded, just not sent.
    pub max_images_per_product: usize,
    /// Recognized image extensions, lowercase, without dots.
    pub image_extensions: Vec<String>,
    /// Recognized video extensions, lowercase, without dots.
    pub video_extensions: Vec<String>,
    /// Language the generated text should be written in.
    pub language: String,
    /// Lower bound of the word count requested for the description field.
    pub description_words_min: u32,
    /// Upper bound of the word count requested for the description field.
    pub description_words_max: u32,
    /// Output-size cap for the completion, in tokens.
    pub max_tokens: u32,
}
