//! DashScope multimodal and text generation dialect
//!
//! Both calls share one request shape (`model`, `input.messages`,
//! `parameters`) and answer with `output.choices[0].message.content`.

use crate::error::{CoreError, CoreResult};
use crate::models::{normalize_image_size, ImageRequest, ImageResult, TextCompletionRequest};
use serde_json::{json, Value};

pub const IMAGE_MODEL: &str = "qwen-image-max-2025-12-30";
pub const TEXT_MODEL: &str = "qwen-plus";
pub const TEXT_TEMPERATURE: f64 = 0.7;
pub const TEXT_MAX_TOKENS: u32 = 2000;

const IMAGE_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";
const TEXT_PATH: &str = "/api/v1/services/aigc/text-generation/generation";

pub fn image_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url, IMAGE_PATH)
}

pub fn text_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url, TEXT_PATH)
}

pub fn build_image_payload(request: &ImageRequest) -> CoreResult<Value> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(CoreError::Validation("prompt is required".to_string()));
    }

    let mut parameters = json!({
        "size": normalize_image_size(request.size.as_deref()),
        "prompt_extend": request.prompt_extend.unwrap_or(true),
        "watermark": request.watermark.unwrap_or(false),
    });
    if let Some(negative) = request
        .negative_prompt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        parameters["negative_prompt"] = json!(negative);
    }

    Ok(json!({
        "model": IMAGE_MODEL,
        "input": {
            "messages": [
                { "role": "user", "content": [ { "text": prompt } ] }
            ]
        },
        "parameters": parameters,
    }))
}

pub fn build_text_payload(request: &TextCompletionRequest) -> CoreResult<Value> {
    if request.messages.is_empty() {
        return Err(CoreError::Validation("at least one message is required".to_string()));
    }
    let model = request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(TEXT_MODEL);

    Ok(json!({
        "model": model,
        "input": { "messages": request.messages },
        "parameters": {
            "temperature": TEXT_TEMPERATURE,
            "max_tokens": TEXT_MAX_TOKENS,
            "result_format": "message",
        },
    }))
}

/// 2xx bodies with a non-empty `code` are provider errors
fn reject_error_body(status: u16, body: &Value) -> CoreResult<()> {
    match body.get("code").and_then(Value::as_str) {
        Some(code) if !code.trim().is_empty() => Err(CoreError::UpstreamRejected {
            status,
            body: body.to_string(),
        }),
        _ => Ok(()),
    }
}

fn message_content<'a>(body: &'a Value) -> CoreResult<&'a Value> {
    let output = body
        .get("output")
        .ok_or_else(|| CoreError::UpstreamMalformed(format!("no output in response: {}", body)))?;
    let choice = output
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| CoreError::UpstreamMalformed(format!("no choices in output: {}", body)))?;
    choice
        .pointer("/message/content")
        .filter(|c| !c.is_null())
        .ok_or_else(|| CoreError::UpstreamMalformed(format!("no message content: {}", body)))
}

pub fn parse_image_response(status: u16, body: Value) -> CoreResult<ImageResult> {
    reject_error_body(status, &body)?;
    let image_url = message_content(&body)?
        .as_array()
        .and_then(|items| items.iter().find_map(|item| item.get("image")))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| CoreError::UpstreamMalformed(format!("no image URL in content: {}", body)))?
        .to_string();

    Ok(ImageResult {
        image_url,
        request_id: body
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        usage: body.get("usage").cloned(),
    })
}

pub fn parse_text_response(status: u16, body: Value) -> CoreResult<String> {
    reject_error_body(status, &body)?;
    let content = match message_content(&body)? {
        Value::String(text) => text.clone(),
        // Some models answer with a list of typed parts
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        other => {
            return Err(CoreError::UpstreamMalformed(format!(
                "unexpected content shape: {}",
                other
            )))
        }
    };
    if content.trim().is_empty() {
        return Err(CoreError::UpstreamMalformed(format!("empty content: {}", body)));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ChatMessage;

    #[test]
    fn test_image_payload_defaults() {
        let payload = build_image_payload(&ImageRequest {
            prompt: "  a child brushing teeth ".into(),
            size: Some("1024x768".into()),
            negative_prompt: Some("   ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(payload["model"], IMAGE_MODEL);
        assert_eq!(
            payload["input"]["messages"][0]["content"][0]["text"],
            "a child brushing teeth"
        );
        assert_eq!(payload["parameters"]["size"], "1664*928");
        assert_eq!(payload["parameters"]["prompt_extend"], true);
        assert_eq!(payload["parameters"]["watermark"], false);
        assert!(payload["parameters"].get("negative_prompt").is_none());
    }

    #[test]
    fn test_blank_image_prompt_rejected() {
        let err = build_image_payload(&ImageRequest::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_text_payload() {
        let payload =
            build_text_payload(&TextCompletionRequest::from_prompt("hello")).unwrap();
        assert_eq!(payload["model"], TEXT_MODEL);
        assert_eq!(payload["input"]["messages"][0]["role"], "user");
        assert_eq!(payload["parameters"]["max_tokens"], 2000);
        assert_eq!(payload["parameters"]["result_format"], "message");

        let payload = build_text_payload(&TextCompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            model: Some("qwen-max".into()),
        })
        .unwrap();
        assert_eq!(payload["model"], "qwen-max");
    }

    #[test]
    fn test_parse_image_response() {
        let result = parse_image_response(
            200,
            json!({
                "request_id": "req-1",
                "output": {
                    "choices": [{"message": {"content": [{"image": "https://oss/img.png"}]}}]
                },
                "usage": {"width": 1664, "height": 928}
            }),
        )
        .unwrap();
        assert_eq!(result.image_url, "https://oss/img.png");
        assert_eq!(result.request_id.as_deref(), Some("req-1"));
        assert_eq!(result.usage.unwrap()["width"], 1664);

        let err = parse_image_response(200, json!({"output": {"choices": []}})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamMalformed);
    }

    #[test]
    fn test_parse_text_response() {
        let text = parse_text_response(
            200,
            json!({
                "output": {"choices": [{"message": {"role": "assistant", "content": "la la"}}]}
            }),
        )
        .unwrap();
        assert_eq!(text, "la la");

        let err = parse_text_response(200, json!({"code": "Throttling", "message": "busy"}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamRejected);
    }
}
