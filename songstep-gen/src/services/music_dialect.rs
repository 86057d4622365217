//! Music provider dialects
//!
//! Each supported provider is a unit type implementing [`MusicDialectSpec`].
//! [`MusicDialect`] is the closed set of them, selected once from the
//! configured base URL; an unrecognized URL selects the default dialect.

use crate::error::{CoreError, CoreResult};
use crate::models::{MusicClip, MusicRequest, MusicSubmission, MusicTaskState, MusicTaskStatus};
use serde_json::{json, Map, Value};
use std::fmt;

pub const DEFAULT_MUSIC_MODEL: &str = "chirp-v4-5";

/// Placeholder for the callback field one provider insists on
pub const PLACEHOLDER_CALLBACK_URL: &str = "https://example.com/callback";

const GETGO_MARKER: &str = "getgoapi.com";
const DEFAPI_MARKER: &str = "defapi.org";

/// Wire contract of one music provider
pub trait MusicDialectSpec: Send + Sync {
    fn name(&self) -> &'static str;

    fn submit_path(&self) -> &'static str;

    fn fetch_path(&self) -> &'static str;

    /// Query parameter carrying the task id on status polls
    fn fetch_query_key(&self) -> &'static str;

    /// Submission body; absent optional fields are left out entirely
    fn build_submit_payload(
        &self,
        request: &MusicRequest,
        callback_fallback: Option<&str>,
    ) -> Value;

    fn submit_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.submit_path())
    }

    fn build_fetch_url(&self, base_url: &str, task_id: &str) -> CoreResult<String> {
        let mut url =
            reqwest::Url::parse(&format!("{}{}", base_url, self.fetch_path())).map_err(|e| {
                CoreError::NotConfigured(format!("music base URL {:?}: {}", base_url, e))
            })?;
        url.query_pairs_mut()
            .append_pair(self.fetch_query_key(), task_id);
        Ok(url.into())
    }

    fn classify_submit(&self, status: u16, body: Value) -> CoreResult<MusicSubmission> {
        reject_application_error(status, &body)?;
        let task_id = find_task_id(&body).ok_or_else(|| {
            CoreError::UpstreamMalformed(format!("no task id in submit response: {}", body))
        })?;
        Ok(MusicSubmission {
            task_id,
            dialect: self.name().to_string(),
        })
    }

    fn classify_status(
        &self,
        task_id: &str,
        status: u16,
        body: Value,
    ) -> CoreResult<MusicTaskStatus> {
        reject_application_error(status, &body)?;
        normalize_status(task_id, &body)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub struct GetGoDialect;

impl MusicDialectSpec for GetGoDialect {
    fn name(&self) -> &'static str {
        "getgo"
    }

    fn submit_path(&self) -> &'static str {
        "/api/v1/generate"
    }

    fn fetch_path(&self) -> &'static str {
        "/api/v1/fetch"
    }

    fn fetch_query_key(&self) -> &'static str {
        "id"
    }

    fn build_submit_payload(
        &self,
        request: &MusicRequest,
        callback_fallback: Option<&str>,
    ) -> Value {
        let custom_mode = request.custom_mode.unwrap_or(true);
        let callback = non_empty(&request.callback_url)
            .or(callback_fallback)
            .unwrap_or(PLACEHOLDER_CALLBACK_URL);

        let mut payload = Map::new();
        payload.insert("customMode".into(), json!(custom_mode));
        payload.insert("instrumental".into(), json!(request.instrumental.unwrap_or(false)));
        payload.insert(
            "model".into(),
            json!(non_empty(&request.model).unwrap_or(DEFAULT_MUSIC_MODEL)),
        );
        payload.insert("callBackUrl".into(), json!(callback));
        payload.insert("prompt".into(), json!(request.prompt.as_deref().unwrap_or("")));

        // This provider has no title/tags fields; both fold into "style"
        if custom_mode {
            let style = [non_empty(&request.title), non_empty(&request.tags)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ");
            if !style.is_empty() {
                payload.insert("style".into(), json!(style));
            }
        }
        Value::Object(payload)
    }
}

pub struct DefApiDialect;

impl MusicDialectSpec for DefApiDialect {
    fn name(&self) -> &'static str {
        "defapi"
    }

    fn submit_path(&self) -> &'static str {
        "/api/suno/generate"
    }

    fn fetch_path(&self) -> &'static str {
        "/api/task/query"
    }

    fn fetch_query_key(&self) -> &'static str {
        "task_id"
    }

    fn build_submit_payload(
        &self,
        request: &MusicRequest,
        callback_fallback: Option<&str>,
    ) -> Value {
        let mut payload = base_defapi_payload(request);
        payload.insert(
            "negative_tags".into(),
            json!(request.negative_tags.as_deref().unwrap_or("")),
        );
        if let Some(at) = request.continue_at {
            payload.insert("continue_at".into(), json!(at));
        }
        if let Some(id) = &request.continue_clip_id {
            payload.insert("continue_clip_id".into(), json!(id));
        }
        if let Some(id) = &request.cover_clip_id {
            payload.insert("cover_clip_id".into(), json!(id));
        }
        if let Some(callback) = non_empty(&request.callback_url).or(callback_fallback) {
            payload.insert("callback_url".into(), json!(callback));
        }
        Value::Object(payload)
    }
}

/// Fallback for unrecognized endpoints: DefApi paths, reduced field set
pub struct DefaultDialect;

impl MusicDialectSpec for DefaultDialect {
    fn name(&self) -> &'static str {
        "default"
    }

    fn submit_path(&self) -> &'static str {
        DefApiDialect.submit_path()
    }

    fn fetch_path(&self) -> &'static str {
        DefApiDialect.fetch_path()
    }

    fn fetch_query_key(&self) -> &'static str {
        DefApiDialect.fetch_query_key()
    }

    fn build_submit_payload(
        &self,
        request: &MusicRequest,
        _callback_fallback: Option<&str>,
    ) -> Value {
        Value::Object(base_defapi_payload(request))
    }
}

fn base_defapi_payload(request: &MusicRequest) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        "mv".into(),
        json!(non_empty(&request.model).unwrap_or(DEFAULT_MUSIC_MODEL)),
    );
    payload.insert("custom_mode".into(), json!(request.custom_mode.unwrap_or(true)));
    payload.insert(
        "make_instrumental".into(),
        json!(request.instrumental.unwrap_or(false)),
    );
    payload.insert("prompt".into(), json!(request.prompt.as_deref().unwrap_or("")));
    payload.insert("title".into(), json!(request.title.as_deref().unwrap_or("")));
    payload.insert("tags".into(), json!(request.tags.as_deref().unwrap_or("")));
    payload
}

/// Closed set of recognized music dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicDialect {
    GetGo,
    DefApi,
    Default,
}

impl MusicDialect {
    /// Pick a dialect by marker substring in the base URL
    pub fn detect(base_url: &str) -> Self {
        let base = base_url.to_ascii_lowercase();
        if base.contains(GETGO_MARKER) {
            MusicDialect::GetGo
        } else if base.contains(DEFAPI_MARKER) {
            MusicDialect::DefApi
        } else {
            MusicDialect::Default
        }
    }

    pub fn spec(&self) -> &'static dyn MusicDialectSpec {
        match self {
            MusicDialect::GetGo => &GetGoDialect,
            MusicDialect::DefApi => &DefApiDialect,
            MusicDialect::Default => &DefaultDialect,
        }
    }
}

impl fmt::Display for MusicDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name())
    }
}

/// A 2xx body can still carry an application error
fn reject_application_error(status: u16, body: &Value) -> CoreResult<()> {
    let code_ok = match body.get("code") {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => matches!(n.as_i64(), Some(0) | Some(200)),
        Some(Value::String(s)) => matches!(s.trim(), "0" | "200"),
        Some(_) => false,
    };
    let success_ok = body.get("success").and_then(Value::as_bool) != Some(false);

    if code_ok && success_ok {
        Ok(())
    } else {
        Err(CoreError::UpstreamRejected {
            status,
            body: body.to_string(),
        })
    }
}

fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn find_task_id(body: &Value) -> Option<String> {
    ["/data/task_id", "/data/taskId", "/task_id", "/taskId", "/id"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(as_id))
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn map_state(raw: &str) -> MusicTaskState {
    let status = raw.trim().to_ascii_lowercase();
    match status.as_str() {
        "success" | "succeeded" | "complete" | "completed" | "done" | "finished" => {
            MusicTaskState::Ready
        }
        "" | "pending" | "queued" | "submitted" | "created" | "not_start" => {
            MusicTaskState::Submitted
        }
        s if s.contains("fail") || s.contains("error") || s.contains("cancel") => {
            MusicTaskState::Failed
        }
        _ => MusicTaskState::Polling,
    }
}

fn clip_array(body: &Value) -> Option<&Vec<Value>> {
    [
        "/data/result",
        "/data/clips",
        "/data/response/sunoData",
        "/data/response/data",
        "/data/data",
        "/data",
        "/clips",
        "/result",
    ]
    .iter()
    .find_map(|pointer| body.pointer(pointer).and_then(Value::as_array))
}

fn parse_clip(value: &Value) -> MusicClip {
    MusicClip {
        id: first_str(value, &["id", "clip_id", "clipId"]).map(str::to_string),
        title: first_str(value, &["title"]).map(str::to_string),
        audio_url: first_str(
            value,
            &["audio_url", "audioUrl", "stream_audio_url", "streamAudioUrl"],
        )
        .map(str::to_string),
        image_url: first_str(value, &["image_url", "imageUrl"]).map(str::to_string),
        duration: value.get("duration").and_then(Value::as_f64),
    }
}

fn normalize_status(task_id: &str, body: &Value) -> CoreResult<MusicTaskStatus> {
    let data = body.get("data").filter(|d| d.is_object()).unwrap_or(body);
    let raw_state = first_str(data, &["status", "state"])
        .or_else(|| first_str(body, &["status", "state"]))
        .unwrap_or("");
    let clips: Vec<MusicClip> = clip_array(body)
        .map(|items| items.iter().map(parse_clip).collect())
        .unwrap_or_default();

    let mut state = map_state(raw_state);
    if state == MusicTaskState::Ready && !clips.iter().any(|c| c.audio_url.is_some()) {
        return Err(CoreError::UpstreamMalformed(format!(
            "task {} reported {:?} without any audio URL",
            task_id, raw_state
        )));
    }
    // Untagged bodies: clips with audio mean the song is done
    if raw_state.is_empty() && clips.iter().any(|c| c.audio_url.is_some()) {
        state = MusicTaskState::Ready;
    }

    let error_message = match state {
        MusicTaskState::Failed => Some(
            first_str(data, &["error_message", "errorMessage", "fail_reason", "failReason"])
                .or_else(|| first_str(body, &["msg", "message"]))
                .unwrap_or(raw_state)
                .to_string(),
        ),
        _ => None,
    };

    Ok(MusicTaskStatus {
        task_id: find_task_id(body).unwrap_or_else(|| task_id.to_string()),
        state,
        clips,
        error_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request() -> MusicRequest {
        MusicRequest {
            prompt: Some("[Verse] wash wash".into()),
            title: Some("Clean Hands".into()),
            tags: Some("children song, upbeat".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_detect() {
        assert_eq!(MusicDialect::detect("https://cn.getgoapi.com"), MusicDialect::GetGo);
        assert_eq!(MusicDialect::detect("https://api.defapi.org"), MusicDialect::DefApi);
        assert_eq!(MusicDialect::detect("http://127.0.0.1:9999"), MusicDialect::Default);
    }

    #[test]
    fn test_getgo_payload_fills_mandatory_callback() {
        let payload = GetGoDialect.build_submit_payload(&request(), None);
        assert_eq!(payload["callBackUrl"], PLACEHOLDER_CALLBACK_URL);
        assert_eq!(payload["customMode"], true);
        assert_eq!(payload["instrumental"], false);
        assert_eq!(payload["model"], DEFAULT_MUSIC_MODEL);
        assert_eq!(payload["style"], "Clean Hands, children song, upbeat");
        assert!(payload.get("title").is_none());

        let payload = GetGoDialect.build_submit_payload(&request(), Some("https://me/cb"));
        assert_eq!(payload["callBackUrl"], "https://me/cb");
    }

    #[test]
    fn test_getgo_style_omitted_outside_custom_mode() {
        let mut req = request();
        req.custom_mode = Some(false);
        let payload = GetGoDialect.build_submit_payload(&req, None);
        assert!(payload.get("style").is_none());
    }

    #[test]
    fn test_defapi_payload_omits_absent_optionals() {
        let payload = DefApiDialect.build_submit_payload(&request(), None);
        let obj = payload.as_object().unwrap();
        assert_eq!(obj["mv"], DEFAULT_MUSIC_MODEL);
        assert_eq!(obj["negative_tags"], "");
        for key in ["continue_at", "continue_clip_id", "cover_clip_id", "callback_url"] {
            assert!(!obj.contains_key(key), "{} should be omitted", key);
        }

        let mut req = request();
        req.continue_at = Some(12.5);
        req.cover_clip_id = Some("clip-9".into());
        let payload = DefApiDialect.build_submit_payload(&req, None);
        assert_eq!(payload["continue_at"], 12.5);
        assert_eq!(payload["cover_clip_id"], "clip-9");
    }

    #[test]
    fn test_default_payload_is_reduced() {
        let payload = DefaultDialect.build_submit_payload(&request(), Some("https://me/cb"));
        let mut keys: Vec<_> = payload.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["custom_mode", "make_instrumental", "mv", "prompt", "tags", "title"]
        );
    }

    #[test]
    fn test_fetch_urls_encode_id() {
        let url = GetGoDialect.build_fetch_url("https://cn.getgoapi.com", "a b&c").unwrap();
        assert_eq!(url, "https://cn.getgoapi.com/api/v1/fetch?id=a+b%26c");
        let url = DefApiDialect.build_fetch_url("https://api.defapi.org", "t1").unwrap();
        assert_eq!(url, "https://api.defapi.org/api/task/query?task_id=t1");
    }

    #[test]
    fn test_submit_classification() {
        let ok = DefApiDialect
            .classify_submit(200, json!({"code": 0, "data": {"task_id": "abc"}}))
            .unwrap();
        assert_eq!(ok.task_id, "abc");
        assert_eq!(ok.dialect, "defapi");

        let ok = GetGoDialect
            .classify_submit(200, json!({"code": 200, "data": {"taskId": "xyz"}}))
            .unwrap();
        assert_eq!(ok.task_id, "xyz");

        let err = DefApiDialect
            .classify_submit(200, json!({"code": 40001, "msg": "insufficient credits"}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamRejected);

        let err = DefApiDialect
            .classify_submit(200, json!({"success": false}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamRejected);

        let err = DefApiDialect
            .classify_submit(200, json!({"code": 0, "data": {}}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamMalformed);
    }

    #[test]
    fn test_status_normalization() {
        let status = DefApiDialect
            .classify_status(
                "t1",
                200,
                json!({"code": 0, "data": {"task_id": "t1", "status": "processing"}}),
            )
            .unwrap();
        assert_eq!(status.state, MusicTaskState::Polling);

        let status = GetGoDialect
            .classify_status(
                "t2",
                200,
                json!({"code": 200, "data": {"taskId": "t2", "status": "SUCCESS",
                    "response": {"sunoData": [{"id": "c1", "audioUrl": "https://cdn/1.mp3",
                    "imageUrl": "https://cdn/1.jpg", "title": "Clean", "duration": 41.2}]}}}),
            )
            .unwrap();
        assert_eq!(status.state, MusicTaskState::Ready);
        assert_eq!(status.first_audio_url(), Some("https://cdn/1.mp3"));
        assert_eq!(status.clips[0].duration, Some(41.2));

        let status = DefApiDialect
            .classify_status(
                "t3",
                200,
                json!({"code": 0, "data": {"status": "failed", "fail_reason": "lyrics rejected"}}),
            )
            .unwrap();
        assert_eq!(status.state, MusicTaskState::Failed);
        assert_eq!(status.task_id, "t3");
        assert_eq!(status.error_message.as_deref(), Some("lyrics rejected"));
    }

    #[test]
    fn test_success_without_audio_is_malformed() {
        let err = DefApiDialect
            .classify_status("t4", 200, json!({"data": {"status": "success", "result": []}}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamMalformed);
    }
}
