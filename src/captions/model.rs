use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ModelConfig;

/// Produces a natural-language caption for an image. Implementations are
/// constructed once at startup and shared read-only across requests.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: Bytes) -> anyhow::Result<String>;
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Captioner backed by a hosted inference endpoint serving the configured
/// encoder-decoder captioning model.
pub struct HostedCaptioner {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    max_caption_words: usize,
}

impl HostedCaptioner {
    pub fn new(cfg: &ModelConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("build inference http client")?;
        info!(model = %cfg.name, "caption model client ready");
        Ok(Self {
            client,
            endpoint: format!("{}/{}", cfg.api_url.trim_end_matches('/'), cfg.name),
            api_token: cfg.api_token.clone(),
            max_caption_words: cfg.max_caption_length,
        })
    }
}

#[async_trait]
impl Captioner for HostedCaptioner {
    async fn caption(&self, image: Bytes) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .context("caption request")?;

        let status = response.status();
        let body = response.text().await.context("caption response body")?;
        if !status.is_success() {
            anyhow::bail!("inference endpoint returned {}: {}", status, body);
        }

        let outputs: Vec<GeneratedText> =
            serde_json::from_str(&body).context("parse caption response")?;
        let caption = outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or_else(|| anyhow::anyhow!("inference endpoint returned no caption"))?;

        let caption = truncate_words(caption.trim(), self.max_caption_words);
        debug!(caption = %caption, "caption generated");
        Ok(caption)
    }
}

/// Caps a caption at `max_words` whitespace-separated words.
pub(crate) fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        text.to_string()
    } else {
        words[..max_words].join(" ")
    }
}

/// Constant-output captioner for tests.
#[derive(Clone, Default)]
pub struct FakeCaptioner;

#[async_trait]
impl Captioner for FakeCaptioner {
    async fn caption(&self, _image: Bytes) -> anyhow::Result<String> {
        Ok("a test caption".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn truncate_words_caps_long_captions() {
        assert_eq!(truncate_words("a dog on a beach", 3), "a dog on");
        assert_eq!(truncate_words("a dog", 3), "a dog");
        assert_eq!(truncate_words("", 3), "");
        assert_eq!(truncate_words("one two three", 0), "");
    }

    #[test]
    fn truncate_words_is_exact_at_the_cap() {
        assert_eq!(truncate_words("one two three", 3), "one two three");
    }

    #[tokio::test]
    async fn fake_captioner_through_trait_object() {
        let captioner: Arc<dyn Captioner> = Arc::new(FakeCaptioner);
        let caption = captioner
            .caption(Bytes::from_static(b"not really an image"))
            .await
            .expect("fake captioner never fails");
        assert!(!caption.is_empty());
    }

    #[test]
    fn parses_inference_response_shape() {
        let body = r#"[{"generated_text": "a cat sitting on a windowsill"}]"#;
        let outputs: Vec<GeneratedText> = serde_json::from_str(body).expect("parse");
        assert_eq!(outputs[0].generated_text, "a cat sitting on a windowsill");
    }
}
