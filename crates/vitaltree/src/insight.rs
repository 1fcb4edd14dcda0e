//! AI-generated natural-language summaries of a profile's vitals.
//!
//! The provider is an external collaborator: it receives a fully rendered
//! prompt and returns free text. [`InsightService`] adds the only local logic,
//! a single in-flight flag and the fixed fallback strings. There is no retry,
//! no cancellation and no streaming.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InsightsConfig;
use crate::error::{Error, Result};
use crate::health::{HealthProfile, VitalRecord};

/// Returned when the provider answers with no text.
pub const NO_INSIGHTS_MESSAGE: &str = "No insights could be generated at this time.";

/// Returned when the provider call fails for any reason.
pub const FAILED_INSIGHTS_MESSAGE: &str = "Failed to generate health insights using AI.";

/// A generative-text backend.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Produce free text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or rejects the request.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Render one reading as a prompt line.
#[must_use]
pub fn summary_line(record: &VitalRecord) -> String {
    let when = DateTime::from_timestamp_millis(record.timestamp).map_or_else(
        || record.timestamp.to_string(),
        |dt| {
            dt.with_timezone(&Local)
                .format("%b %d, %Y %H:%M")
                .to_string()
        },
    );
    format!(
        "Date: {when}, BP: {}/{} mmHg, HR: {} bpm, SpO2: {}%",
        record.systolic, record.diastolic, record.heart_rate, record.oxygen_saturation
    )
}

/// Build the analysis prompt for a profile and its readings.
#[must_use]
pub fn build_prompt(profile: &HealthProfile, records: &[VitalRecord]) -> String {
    let summary = records
        .iter()
        .map(summary_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following health data for a patient and provide brief, helpful insights or trends based on their history.

Patient Info:
- Name: {name}
- Gender: {gender}
- Date of Birth: {dob}
- Blood Type: {blood}
- Additional Notes: {notes}

Recent Vital Records:
{summary}

Please provide:
1. A short summary of the observed trends in the vitals.
2. Identification of any values that are outside typical healthy ranges (e.g., Blood Pressure > 140/90, SpO2 < 95%).
3. A concluding reminder to consult a healthcare professional for clinical advice.

Format the response as clear, concise paragraphs. Do not use Markdown headers, just simple formatting.",
        name = profile.name,
        gender = profile.gender,
        dob = profile.date_of_birth,
        blood = profile.blood_type.as_deref().unwrap_or("Unknown"),
        notes = profile.notes.as_deref().unwrap_or("None"),
    )
}

/// Result of an insight request as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightOutcome {
    /// Provider text, or the no-insights message when it was empty.
    Generated(String),
    /// The provider failed; carries the user-facing fallback message.
    Failed(String),
    /// Another request is still pending.
    Busy,
    /// The profile has no readings to analyze.
    NoRecords,
}

impl InsightOutcome {
    /// Text to show the user, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Generated(text) | Self::Failed(text) => Some(text),
            Self::Busy | Self::NoRecords => None,
        }
    }
}

/// Runs insight requests one at a time.
#[derive(Debug)]
pub struct InsightService<P> {
    provider: P,
    in_flight: AtomicBool,
}

struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: InsightProvider> InsightService<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a request is currently pending.
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ask the provider for a summary of `records`.
    pub async fn generate(
        &self,
        profile: &HealthProfile,
        records: &[VitalRecord],
    ) -> InsightOutcome {
        if records.is_empty() {
            return InsightOutcome::NoRecords;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Insight request ignored, one is already pending");
            return InsightOutcome::Busy;
        }
        let _pending = PendingGuard(&self.in_flight);

        let prompt = build_prompt(profile, records);
        match self.provider.generate(&prompt).await {
            Ok(text) if text.trim().is_empty() => {
                InsightOutcome::Generated(NO_INSIGHTS_MESSAGE.to_string())
            }
            Ok(text) => InsightOutcome::Generated(text),
            Err(err) => {
                warn!("Insight generation failed: {err}");
                InsightOutcome::Failed(FAILED_INSIGHTS_MESSAGE.to_string())
            }
        }
    }
}

/// Google generative-language API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate; empty when there is none.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no API key is available, or an insight
    /// error if the HTTP client cannot be built.
    pub fn from_config(config: &InsightsConfig) -> Result<Self> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| Error::ConfigValidation {
                message: "no insights API key configured (set insights.api_key or GEMINI_API_KEY)"
                    .to_string(),
            })?;
        Self::new(
            &config.endpoint,
            &config.model,
            api_key,
            config.request_timeout(),
        )
    }

    /// Build a client for an explicit endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns an insight error if the HTTP client cannot be built.
    pub fn new(endpoint: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl InsightProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        debug!("Requesting insights from {}", self.model);
        let response: GenerateResponse = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::health::Gender;

    fn profile() -> HealthProfile {
        HealthProfile {
            id: "p1".to_string(),
            name: "Grace".to_string(),
            gender: Gender::Female,
            date_of_birth: "1950-07-04".to_string(),
            blood_type: None,
            notes: Some("Hypertension".to_string()),
            owner_id: "u".to_string(),
            shared_with: Vec::new(),
        }
    }

    fn records() -> Vec<VitalRecord> {
        vec![VitalRecord {
            id: "r1".to_string(),
            patient_id: "p1".to_string(),
            timestamp: 1_700_000_000_000,
            systolic: 145,
            diastolic: 92,
            heart_rate: 77,
            oxygen_saturation: 96,
            notes: None,
        }]
    }

    struct Fixed(Result<String>);

    #[async_trait]
    impl InsightProvider for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(err) => Err(Error::insight(err.to_string())),
            }
        }
    }

    struct Gated {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl InsightProvider for Gated {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.gate.notified().await;
            Ok("steady".to_string())
        }
    }

    #[test]
    fn test_prompt_contains_profile_and_readings() {
        let prompt = build_prompt(&profile(), &records());

        assert!(prompt.contains("- Name: Grace"));
        assert!(prompt.contains("- Gender: female"));
        assert!(prompt.contains("- Date of Birth: 1950-07-04"));
        assert!(prompt.contains("- Blood Type: Unknown"));
        assert!(prompt.contains("- Additional Notes: Hypertension"));
        assert!(prompt.contains("BP: 145/92 mmHg, HR: 77 bpm, SpO2: 96%"));
    }

    #[test]
    fn test_summary_lines_are_newline_joined() {
        let mut rs = records();
        let mut second = rs[0].clone();
        second.systolic = 120;
        rs.push(second);

        let prompt = build_prompt(&profile(), &rs);
        let lines: Vec<&str> = prompt.lines().filter(|l| l.starts_with("Date: ")).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("BP: 120/92"));
    }

    #[tokio::test]
    async fn test_generated_text_passes_through() {
        let service = InsightService::new(Fixed(Ok("Trending down.".to_string())));
        let outcome = service.generate(&profile(), &records()).await;
        assert_eq!(outcome, InsightOutcome::Generated("Trending down.".to_string()));
        assert!(!service.is_pending());
    }

    #[tokio::test]
    async fn test_empty_text_uses_no_insights_message() {
        let service = InsightService::new(Fixed(Ok("   ".to_string())));
        let outcome = service.generate(&profile(), &records()).await;
        assert_eq!(outcome.message(), Some(NO_INSIGHTS_MESSAGE));
    }

    #[tokio::test]
    async fn test_failure_uses_fallback_message() {
        let service = InsightService::new(Fixed(Err(Error::insight("503"))));
        let outcome = service.generate(&profile(), &records()).await;
        assert_eq!(
            outcome,
            InsightOutcome::Failed(FAILED_INSIGHTS_MESSAGE.to_string())
        );
        assert!(!service.is_pending());
    }

    #[tokio::test]
    async fn test_no_records_skips_provider() {
        let service = InsightService::new(Fixed(Err(Error::insight("unreachable"))));
        let outcome = service.generate(&profile(), &[]).await;
        assert_eq!(outcome, InsightOutcome::NoRecords);
        assert_eq!(outcome.message(), None);
    }

    #[tokio::test]
    async fn test_second_request_while_pending_is_busy() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(InsightService::new(Gated { gate: gate.clone() }));

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.generate(&profile(), &records()).await })
        };
        while !service.is_pending() {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            service.generate(&profile(), &records()).await,
            InsightOutcome::Busy
        );

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert_eq!(outcome, InsightOutcome::Generated("steady".to_string()));
        assert!(!service.is_pending());
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "Hello there");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: "hi" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_client_url() {
        let client = GeminiClient::new(
            "https://example.test/v1beta/",
            "gemini-2.0-flash",
            "key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
