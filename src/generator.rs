use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// The three fields the model is asked to produce for a product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedFields {
    pub title: String,
    pub subtitle: String,
    pub description: String,
}

/// Failure of a single product's generation. These never abort the whole
/// run; the traversal reports them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to read image {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("completion request failed")]
    Request(#[from] reqwest::Error),
    #[error("completion API returned status {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode completion response envelope")]
    Decode(#[source] serde_json::Error),
    #[error("completion response contained no text")]
    EmptyResponse,
    #[error("completion response is not JSON, directly or inside a fenced block: {text}")]
    Parse { text: String },
}

/// Seam between the directory traversal and the completion API.
pub trait MetadataGenerator {
    /// Describe a product from the given image filenames, resolved against
    /// `product_dir`. The list is already truncated to the send limit.
    fn generate(
        &self,
        product_dir: &Path,
        images: &[String],
    ) -> Result<GeneratedFields, GenerateError>;
}

impl<G: MetadataGenerator + ?Sized> MetadataGenerator for &G {
    fn generate(
        &self,
        product_dir: &Path,
        images: &[String],
    ) -> Result<GeneratedFields, GenerateError> {
        (**self).generate(product_dir, images)
    }
}

/// Generator backed by an OpenAI-style chat-completions endpoint. One
/// blocking request per product; the traversal waits on it.
pub struct OpenAiGenerator {
    client: reqwest::blocking::Client,
    config: Config,
}

impl OpenAiGenerator {
    pub fn new(config: &Config) -> Self {
        OpenAiGenerator {
            client: reqwest::blocking::Client::new(),
            config: config.clone(),
        }
    }

    fn encode_image(
        &self,
        product_dir: &Path,
        filename: &str,
    ) -> Result<serde_json::Value, GenerateError> {
        let path = product_dir.join(filename);
        let bytes = fs::read(&path).map_err(|source| GenerateError::Read {
            path: path.clone(),
            source,
        })?;

        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        let data_url = format!(
            "data:{};base64,{}",
            media_type_for(&extension),
            STANDARD.encode(bytes)
        );

        Ok(json!({
            "type": "image_url",
            "image_url": { "url": data_url }
        }))
    }
}

impl MetadataGenerator for OpenAiGenerator {
    fn generate(
        &self,
        product_dir: &Path,
        images: &[String],
    ) -> Result<GeneratedFields, GenerateError> {
        let mut content = Vec::with_capacity(images.len() + 1);
        for filename in images {
            content.push(self.encode_image(product_dir, filename)?);
        }
        content.push(json!({
            "type": "text",
            "text": build_prompt(&self.config)
        }));

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let payload = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(GenerateError::Api { status, body });
        }

        let envelope: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(GenerateError::Decode)?;
        let text = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerateError::EmptyResponse)?;

        parse_fields(&text)
    }
}

fn build_prompt(config: &Config) -> String {
    format!(
        "Analyze these product images and generate metadata in {language}:\n\
         \n\
         - title: product name (2-4 words, e.g. \"Bolso Duffle\")\n\
         - subtitle: main feature (3-5 words, e.g. \"Cuero Para Viajar\")\n\
         - description: detailed description highlighting materials, craftsmanship and intended use ({min}-{max} words)\n\
         \n\
         Respond ONLY with a single valid JSON object:\n\
         {{\"title\": \"...\", \"subtitle\": \"...\", \"description\": \"...\"}}",
        language = config.language,
        min = config.description_words_min,
        max = config.description_words_max,
    )
}

/// "jpg" files are served as image/jpeg; every other supported extension
/// names its own subtype.
fn media_type_for(extension: &str) -> String {
    match extension {
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    }
}

/// Tolerant two-stage parse of the model's reply: the whole text as JSON
/// first, then the largest ```json fenced block inside it.
pub fn parse_fields(text: &str) -> Result<GeneratedFields, GenerateError> {
    if let Ok(fields) = serde_json::from_str::<GeneratedFields>(text.trim()) {
        return Ok(fields);
    }

    if let Some(inner) = largest_fenced_json(text) {
        if let Ok(fields) = serde_json::from_str::<GeneratedFields>(inner.trim()) {
            return Ok(fields);
        }
    }

    Err(GenerateError::Parse {
        text: text.to_string(),
    })
}

/// Payload of the longest ```json fenced block, if any.
fn largest_fenced_json(text: &str) -> Option<&str> {
    const FENCE_OPEN: &str = "```json";
    const FENCE_CLOSE: &str = "```";

    let mut largest: Option<&str> = None;
    let mut rest = text;
    while let Some(start) = rest.find(FENCE_OPEN) {
        let after_open = &rest[start + FENCE_OPEN.len()..];
        let Some(end) = after_open.find(FENCE_CLOSE) else {
            break;
        };
        let block = &after_open[..end];
        if largest.map_or(true, |current| block.len() > current.len()) {
            largest = Some(block);
        }
        rest = &after_open[end + FENCE_CLOSE.len()..];
    }

    largest
}

// Chat-completions response envelope; only the fields we consume.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN_JSON: &str =
        r#"{"title": "Bolso London", "subtitle": "Cuero Genuino", "description": "Bolso de mano."}"#;

    #[test]
    fn parses_bare_json_response() {
        let fields = parse_fields(PLAIN_JSON).unwrap();
        assert_eq!(fields.title, "Bolso London");
        assert_eq!(fields.subtitle, "Cuero Genuino");
        assert_eq!(fields.description, "Bolso de mano.");
    }

    #[test]
    fn parses_json_surrounded_by_whitespace() {
        let text = format!("\n  {PLAIN_JSON}\n\n");
        assert_eq!(parse_fields(&text).unwrap(), parse_fields(PLAIN_JSON).unwrap());
    }

    #[test]
    fn parses_fenced_json_identically_to_bare_json() {
        let fenced = format!("Here is the metadata:\n```json\n{PLAIN_JSON}\n```\nHope it helps!");
        assert_eq!(parse_fields(&fenced).unwrap(), parse_fields(PLAIN_JSON).unwrap());
    }

    #[test]
    fn picks_the_largest_fenced_block() {
        let text = format!("```json\n{{}}\n```\nsecond attempt:\n```json\n{PLAIN_JSON}\n```");
        assert_eq!(parse_fields(&text).unwrap().title, "Bolso London");
    }

    #[test]
    fn unparseable_response_is_a_parse_error() {
        let result = parse_fields("I could not identify the product, sorry.");
        assert!(matches!(result, Err(GenerateError::Parse { .. })));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let result = parse_fields(r#"{"title": "Bolso", "subtitle": "Cuero"}"#);
        assert!(matches!(result, Err(GenerateError::Parse { .. })));
    }

    #[test]
    fn unterminated_fence_is_a_parse_error() {
        let result = parse_fields("```json\n{\"title\": \"Bolso\"");
        assert!(matches!(result, Err(GenerateError::Parse { .. })));
    }

    #[test]
    fn jpg_maps_to_jpeg_media_type() {
        assert_eq!(media_type_for("jpg"), "image/jpeg");
        assert_eq!(media_type_for("jpeg"), "image/jpeg");
        assert_eq!(media_type_for("png"), "image/png");
        assert_eq!(media_type_for("webp"), "image/webp");
    }

    #[test]
    fn prompt_carries_language_and_word_bounds() {
        let config = Config {
            root: "/tmp".into(),
            api_key: "sk-test".to_string(),
            api_base: "http://localhost".to_string(),
            model: "gpt-4o".to_string(),
            max_images_per_product: 4,
            image_extensions: vec!["jpg".to_string()],
            video_extensions: vec!["mp4".to_string()],
            language: "français".to_string(),
            description_words_min: 30,
            description_words_max: 50,
            max_tokens: 500,
        };

        let prompt = build_prompt(&config);
        assert!(prompt.contains("français"));
        assert!(prompt.contains("30-50 words"));
        assert!(prompt.contains("\"title\""));
    }
}
