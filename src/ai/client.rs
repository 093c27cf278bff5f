use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{AiEditError, AiEditJob, AiEditResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const MIME_IMAGE_PNG: &str = "image/png";

/// Performs one image edit and returns the encoded result image.
pub trait ImageEditClient: Send + Sync {
    fn edit_image(&self, job: &AiEditJob) -> AiEditResult<Vec<u8>>;
}

/// OpenAI-compatible `images/edits` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiImageEditClient {
    http: Client,
}

impl OpenAiImageEditClient {
    pub fn new() -> AiEditResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }

    fn form(job: &AiEditJob) -> AiEditResult<Form> {
        let image = Part::bytes(job.image_png.clone())
            .file_name("image.png")
            .mime_str(MIME_IMAGE_PNG)?;
        let mask = Part::bytes(job.mask_png.clone())
            .file_name("mask.png")
            .mime_str(MIME_IMAGE_PNG)?;
        Ok(Form::new()
            .text("model", job.model.clone())
            .text("prompt", job.prompt.clone())
            .part("image", image)
            .part("mask", mask))
    }
}

impl ImageEditClient for OpenAiImageEditClient {
    fn edit_image(&self, job: &AiEditJob) -> AiEditResult<Vec<u8>> {
        tracing::info!(
            endpoint = %job.endpoint,
            model = %job.model,
            image_bytes = job.image_png.len(),
            "sending image edit request"
        );
        let response = self
            .http
            .post(&job.endpoint)
            .bearer_auth(&job.api_key)
            .multipart(Self::form(job)?)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(AiEditError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        decode_edit_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    data: Vec<EditDatum>,
}

#[derive(Debug, Deserialize)]
struct EditDatum {
    b64_json: Option<String>,
}

/// Extracts the first base64 image from a `{ "data": [ { "b64_json": ... } ] }` body.
pub fn decode_edit_response(body: &str) -> AiEditResult<Vec<u8>> {
    let response: EditResponse = serde_json::from_str(body)?;
    let encoded = response
        .data
        .into_iter()
        .find_map(|datum| datum.b64_json)
        .filter(|encoded| !encoded.is_empty())
        .ok_or(AiEditError::MissingImage)?;
    Ok(STANDARD.decode(encoded.trim())?)
}

fn truncate_body(body: &str) -> String {
    const MAX_CHARS: usize = 300;
    if body.chars().count() <= MAX_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_CHARS).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_edit_response_returns_first_image_bytes() {
        let encoded = STANDARD.encode(b"png-bytes");
        let body = format!(r#"{{ "created": 1, "data": [ {{ "b64_json": "{encoded}" }} ] }}"#);
        let bytes = decode_edit_response(&body).expect("response should decode");
        assert_eq!(bytes, b"png-bytes");
    }

    #[test]
    fn decode_edit_response_distinguishes_failures() {
        assert!(matches!(
            decode_edit_response("not json"),
            Err(AiEditError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_edit_response(r#"{ "data": [] }"#),
            Err(AiEditError::MissingImage)
        ));
        assert!(matches!(
            decode_edit_response(r#"{ "data": [ { "url": "https://x" } ] }"#),
            Err(AiEditError::MissingImage)
        ));
        assert!(matches!(
            decode_edit_response(r#"{ "data": [ { "b64_json": "***" } ] }"#),
            Err(AiEditError::Base64(_))
        ));
    }

    #[test]
    fn truncate_body_limits_long_error_bodies() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_body(&long).chars().count(), 301);
        assert_eq!(truncate_body("short"), "short");
    }
}
