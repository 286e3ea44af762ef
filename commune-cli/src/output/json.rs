//! JSON output formatting.

use std::collections::BTreeMap;

use anyhow::Result;
use commune_fetch::{Delivery, RequestCompleted, RequestError, ResponseBody, ResponseEnvelope};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a single request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutput {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsOutput>,
}

/// Response details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOutput {
    pub status: u16,
    pub status_message: String,
    pub url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Start time and duration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingOutput {
    pub started_at: String,
    pub duration_ms: u64,
}

/// Classifier verdicts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsOutput {
    pub has_callback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_error: Option<String>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a request result with its completed event.
    pub fn format_delivery(
        &self,
        delivery: &Delivery,
        event: Option<&RequestCompleted>,
    ) -> Result<String> {
        self.format(&self.to_output(delivery, event))
    }

    /// Converts a request result to output.
    pub fn to_output(&self, delivery: &Delivery, event: Option<&RequestCompleted>) -> RequestOutput {
        let (error, response) = match delivery {
            Ok(response) => (None, Some(response)),
            Err(failure) => (Some(failure.error.to_string()), failure.response.as_ref()),
        };

        RequestOutput {
            ok: delivery.is_ok(),
            request_id: event.map(|e| e.request_id),
            error,
            response: response.map(response_output),
            timing: event.map(|e| TimingOutput {
                started_at: e.started_at.to_rfc3339(),
                duration_ms: u64::try_from(e.duration.as_millis()).unwrap_or(u64::MAX),
            }),
            diagnostics: event.map(|e| {
                let verdicts = &e.diagnostics.verdicts;
                DiagnosticsOutput {
                    has_callback: e.diagnostics.has_callback,
                    http_error: verdicts.http_error.as_ref().map(RequestError::to_string),
                    community_error: verdicts.community_error.as_ref().map(RequestError::to_string),
                    trade_error: verdicts.trade_error.as_ref().map(RequestError::to_string),
                    json_error: verdicts.json_error.as_ref().map(RequestError::to_string),
                }
            }),
        }
    }
}

fn response_output(response: &ResponseEnvelope) -> ResponseOutput {
    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    ResponseOutput {
        status: response.status,
        status_message: response.status_message.clone(),
        url: response.url.to_string(),
        headers,
        body: body_value(&response.body),
    }
}

fn body_value(body: &ResponseBody) -> Value {
    match body {
        ResponseBody::Json(value) => value.clone().unwrap_or(Value::Null),
        ResponseBody::Text(text) => Value::String(text.clone()),
        ResponseBody::Bytes(bytes) => serde_json::json!({ "bytes": bytes.len() }),
    }
}
