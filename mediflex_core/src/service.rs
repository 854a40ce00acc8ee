//! Client for the remote recommendation service.
//!
//! The service wraps every answer in a JSON envelope:
//! - `require_login: true` asks the client to send the user to the login page
//!   (delivered with HTTP 401, so bodies are read regardless of status)
//! - `success: false` carries a human-readable `error`
//! - anything else is the payload itself
//!
//! [`Transport`] is the seam between envelope handling and HTTP; the
//! production implementation is [`HttpTransport`].

use crate::config::ServiceConfig;
use crate::{
    AllergyReport, DosageGuidance, EmergencyContacts, Error, InteractionReport, Prediction,
    Result, SeverityAssessment, UserProfile,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Delay before following a login redirect raised by the severity check
pub const SEVERITY_REDIRECT_DELAY: Duration = Duration::from_millis(1500);
/// Delay before following a login redirect raised by the prediction call
pub const PREDICT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
/// Delay used by every other endpoint
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

// ============================================================================
// Envelope
// ============================================================================

/// Interpreted service answer
#[derive(Clone, Debug, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    /// The service wants an authenticated session; not a failure
    LoginRequired { message: String },
    /// The service declined the request
    Failed { error: String },
}

impl<T> Reply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Ok(value) => Reply::Ok(f(value)),
            Reply::LoginRequired { message } => Reply::LoginRequired { message },
            Reply::Failed { error } => Reply::Failed { error },
        }
    }
}

/// Classify an envelope and decode its payload
pub fn interpret<T: DeserializeOwned>(body: Value) -> Result<Reply<T>> {
    if body.get("require_login").and_then(Value::as_bool) == Some(true) {
        let message = error_text(&body).unwrap_or_else(|| "Please login to continue".into());
        return Ok(Reply::LoginRequired { message });
    }

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let error = error_text(&body).unwrap_or_else(|| "An error occurred".into());
        return Ok(Reply::Failed { error });
    }

    serde_json::from_value(body)
        .map(Reply::Ok)
        .map_err(|e| Error::MalformedResponse(e.to_string()))
}

/// Like [`interpret`], but only an explicit `success: true` counts as a
/// payload; a body without the flag is a failure
pub fn interpret_confirmed<T: DeserializeOwned>(body: Value) -> Result<Reply<T>> {
    if body.get("require_login").and_then(Value::as_bool) != Some(true)
        && body.get("success").and_then(Value::as_bool) != Some(true)
    {
        let error = error_text(&body).unwrap_or_else(|| "An error occurred".into());
        return Ok(Reply::Failed { error });
    }
    interpret(body)
}

fn error_text(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Where to send the user when the service asks for a login
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginRedirect {
    pub message: String,
    /// Login page URL carrying the page to come back to
    pub target: String,
    pub delay: Duration,
}

impl LoginRedirect {
    pub fn new(message: impl Into<String>, login_path: &str, from: &str, delay: Duration) -> Self {
        Self {
            message: message.into(),
            target: format!("{}?redirect={}", login_path, encode_uri_component(from)),
            delay,
        }
    }
}

/// Percent-encode everything outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// ============================================================================
// Transport
// ============================================================================

/// Raw JSON request/response exchange with the service
pub trait Transport {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value>;
    fn post(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Blocking HTTP transport
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(cookie) = config.session_cookie.as_deref() {
            let value = reqwest::header::HeaderValue::from_str(cookie)
                .map_err(|e| Error::Config(format!("Invalid session_cookie: {}", e)))?;
            headers.insert(reqwest::header::COOKIE, value);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn decode(response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        let text = response.text()?;
        serde_json::from_str(&text).map_err(|e| {
            Error::MalformedResponse(format!("HTTP {} with non-JSON body: {}", status, e))
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).query(query).send()?;
        Self::decode(response)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send()?;
        Self::decode(response)
    }
}

// ============================================================================
// Typed client
// ============================================================================

#[derive(Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    profile: Option<UserProfile>,
}

#[derive(Deserialize)]
struct DosageEnvelope {
    dosage: DosageGuidance,
}

#[derive(Deserialize)]
struct SuggestionsEnvelope {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ContactsEnvelope {
    contacts: EmergencyContacts,
}

/// Typed operations of the recommendation service
pub struct ServiceClient<T> {
    transport: T,
}

impl<T: Transport> ServiceClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET /auth/get-user-profile`
    pub fn user_profile(&self) -> Result<Reply<Option<UserProfile>>> {
        let body = self.transport.get("/auth/get-user-profile", &[])?;
        Ok(interpret::<ProfileEnvelope>(body)?.map(|e| e.profile))
    }

    /// `POST /assess-severity`
    pub fn assess_severity(&self, symptoms: &str) -> Result<Reply<SeverityAssessment>> {
        let body = self
            .transport
            .post("/assess-severity", &json!({ "symptoms": symptoms }))?;
        interpret(body)
    }

    /// `POST /predict`
    pub fn predict(&self, symptoms: &str) -> Result<Reply<Prediction>> {
        let body = self
            .transport
            .post("/predict", &json!({ "symptoms": symptoms }))?;
        interpret_confirmed(body)
    }

    /// `POST /check-allergies`
    pub fn check_allergies(
        &self,
        medicines: &[String],
        allergies: &[String],
    ) -> Result<Reply<AllergyReport>> {
        let body = self.transport.post(
            "/check-allergies",
            &json!({ "medicines": medicines, "allergies": allergies }),
        )?;
        interpret(body)
    }

    /// `POST /check-interactions`
    pub fn check_interactions(&self, medicines: &[String]) -> Result<Reply<InteractionReport>> {
        let body = self
            .transport
            .post("/check-interactions", &json!({ "medicines": medicines }))?;
        interpret(body)
    }

    /// `POST /calculate-dosage`
    pub fn calculate_dosage(
        &self,
        medicine: &str,
        age: &str,
        weight: &str,
    ) -> Result<Reply<DosageGuidance>> {
        let body = self.transport.post(
            "/calculate-dosage",
            &json!({ "medicine": medicine, "age": age, "weight": weight }),
        )?;
        Ok(interpret::<DosageEnvelope>(body)?.map(|e| e.dosage))
    }

    /// `GET /symptom-suggestions?q=`
    pub fn symptom_suggestions(&self, query: &str) -> Result<Reply<Vec<String>>> {
        let body = self
            .transport
            .get("/symptom-suggestions", &[("q", query)])?;
        Ok(interpret::<SuggestionsEnvelope>(body)?.map(|e| e.suggestions))
    }

    /// `POST /medication-reminder`; the reply carries the confirmation text
    pub fn medication_reminder(
        &self,
        medicine: &str,
        time: &str,
        frequency: &str,
    ) -> Result<Reply<String>> {
        let body = self.transport.post(
            "/medication-reminder",
            &json!({ "medicine": medicine, "time": time, "frequency": frequency }),
        )?;
        Ok(interpret::<MessageEnvelope>(body)?.map(|e| e.message))
    }

    /// `GET /emergency-contacts`
    pub fn emergency_contacts(&self) -> Result<Reply<EmergencyContacts>> {
        let body = self.transport.get("/emergency-contacts", &[])?;
        Ok(interpret::<ContactsEnvelope>(body)?.map(|e| e.contacts))
    }
}

impl ServiceClient<HttpTransport> {
    /// HTTP client for the configured service
    pub fn http(config: &ServiceConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}


#[cfg(test)]
mod tests {
    use super::scripted::ScriptedTransport;
    use super::*;

    #[test]
    fn test_require_login_wins_over_success_flag() {
        let reply: Reply<Prediction> = interpret(json!({
            "success": false,
            "require_login": true,
            "error": "Please login to get medicine recommendations."
        }))
        .unwrap();
        assert_eq!(
            reply,
            Reply::LoginRequired {
                message: "Please login to get medicine recommendations.".into()
            }
        );
    }

    #[test]
    fn test_failure_without_message_gets_fallback() {
        let reply: Reply<Prediction> = interpret(json!({"success": false})).unwrap();
        assert_eq!(
            reply,
            Reply::Failed {
                error: "An error occurred".into()
            }
        );
    }

    #[test]
    fn test_prediction_without_success_flag_is_failure() {
        let reply: Reply<Prediction> =
            interpret_confirmed(json!({"medicines": [], "error": "Model not loaded"})).unwrap();
        assert_eq!(
            reply,
            Reply::Failed {
                error: "Model not loaded".into()
            }
        );

        let reply: Reply<Prediction> = interpret_confirmed(json!({"medicines": []})).unwrap();
        assert_eq!(
            reply,
            Reply::Failed {
                error: "An error occurred".into()
            }
        );

        let reply: Reply<Prediction> =
            interpret_confirmed(json!({"require_login": true})).unwrap();
        assert!(matches!(reply, Reply::LoginRequired { .. }));
    }

    #[test]
    fn test_payload_with_wrong_shape_is_malformed() {
        let result: Result<Reply<SeverityAssessment>> =
            interpret(json!({"success": true, "severity": 3}));
        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("/"), "%2F");
        assert_eq!(encode_uri_component("/history page"), "%2Fhistory%20page");
        assert_eq!(encode_uri_component("a-b_c.d!~*'()"), "a-b_c.d!~*'()");
        assert_eq!(encode_uri_component("é"), "%C3%A9");
    }

    #[test]
    fn test_login_redirect_target() {
        let redirect = LoginRedirect::new("Please login", "/auth/login", "/", PREDICT_REDIRECT_DELAY);
        assert_eq!(redirect.target, "/auth/login?redirect=%2F");
        assert_eq!(redirect.delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_client_unwraps_nested_payloads() {
        let transport = ScriptedTransport::new()
            .reply(
                "/calculate-dosage",
                json!({"success": true, "dosage": {
                    "medicine": "Paracetamol",
                    "recommendation": "80mg every 4-6 hours (max 4 doses/day)",
                    "suitable": true,
                    "age_group": "child"
                }}),
            )
            .reply("/symptom-suggestions", json!({"suggestions": ["fever", "headache"]}));
        let client = ServiceClient::new(transport);

        let dosage = client.calculate_dosage("paracetamol", "6", "8").unwrap();
        match dosage {
            Reply::Ok(guidance) => {
                assert_eq!(guidance.age_group.as_deref(), Some("child"));
                assert!(guidance.note.is_none());
            }
            other => panic!("unexpected reply: {:?}", other),
        }

        let suggestions = client.symptom_suggestions("fe").unwrap();
        assert_eq!(
            suggestions,
            Reply::Ok(vec!["fever".to_string(), "headache".to_string()])
        );
        assert_eq!(
            client.transport().body_sent_to("/symptom-suggestions"),
            Some(json!({"q": "fe"}))
        );
    }

    #[test]
    fn test_http_transport_trims_trailing_slash() {
        let config = ServiceConfig {
            base_url: "http://localhost:5000/".into(),
            ..ServiceConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url, "http://localhost:5000");
    }

    #[test]
    fn test_http_transport_connection_refused_is_error() {
        let config = ServiceConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..ServiceConfig::default()
        };
        let client = ServiceClient::http(&config).unwrap();
        assert!(matches!(client.predict("fever"), Err(Error::Http(_))));
    }
}
