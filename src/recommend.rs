//! Client side of the recommendation text service.
//!
//! The service receives `{"data": <metrics record>}` and answers either
//! `{"recommendations": "..."}` or `{"error": "..."}`.  Callers treat every failure the same
//! way and fall back to [`DEFAULT_RECOMMENDATIONS`], so a single attempt is made and errors
//! carry a description only.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::records::MetricsRecord;

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Bullets used whenever the service cannot provide text.
pub const DEFAULT_RECOMMENDATIONS: [&str; 4] = [
    "**Optymalizacja budżetu:** Zwiększ budżet o 20% w weekendy, kiedy notujemy najwyższą konwersję. Skoncentruj wydatki na godzinach 18:00-21:00, gdy aktywność użytkowników jest najwyższa.",
    "**Targetowanie:** Rozszerz grupę docelową o kobiety 35-50 lat zainteresowane wellness. Dodaj remarketingowe kampanie dla osób, które odwiedziły stronę ale nie dokonały rezerwacji.",
    "**Kreacje reklamowe:** Testuj video ads pokazujące efekty przed/po. Reklamy z treścią video mają o 45% wyższy CTR. Dodaj social proof - opinie zadowolonych klientek.",
    "**Instagram Stories:** Uruchom równoległą kampanię w Instagram Stories z promocją -15% dla nowych klientek. Stories mają potencjał zwiększyć zasięg o dodatkowe 30%.",
];

/// The default bullets as one recommendation text, one bullet per line.
pub fn default_recommendations() -> String {
    DEFAULT_RECOMMENDATIONS.join("\n")
}

/// Anything able to write recommendation copy for a campaign.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Produces recommendation text for the given metrics.
    async fn recommend(&self, record: &MetricsRecord) -> Result<String>;
}

#[derive(Serialize)]
struct RecommendationRequest<'a> {
    data: &'a MetricsRecord,
}

#[derive(Deserialize)]
struct RecommendationReply {
    #[serde(default)]
    recommendations: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation of [`RecommendationSource`].
#[derive(Clone, Debug)]
pub struct HttpRecommendationClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRecommendationClient {
    /// Creates a client posting to `endpoint` with [`DEFAULT_TIMEOUT`].
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Recommendation(format!("cannot build HTTP client: {}", err)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    /// Sends the key both as a bearer token and as an `apikey` header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommendationClient {
    async fn recommend(&self, record: &MetricsRecord) -> Result<String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&RecommendationRequest { data: record });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key);
        }

        debug!("Requesting recommendations from {}", self.endpoint);
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Recommendation(format!(
                "service answered with status {}",
                status
            )));
        }

        let reply: RecommendationReply = serde_json::from_str(&body)
            .map_err(|err| Error::Recommendation(format!("malformed reply: {}", err)))?;
        parse_reply(reply)
    }
}

fn parse_reply(reply: RecommendationReply) -> Result<String> {
    if let Some(error) = reply.error {
        return Err(Error::Recommendation(error));
    }
    reply
        .recommendations
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| Error::Recommendation("reply contained no recommendations".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(json: &str) -> RecommendationReply {
        serde_json::from_str(json).expect("valid reply json")
    }

    #[test]
    fn text_replies_are_accepted() {
        let text = parse_reply(reply(r#"{"recommendations":"Zwiększ budżet"}"#)).expect("text");
        assert_eq!(text, "Zwiększ budżet");
    }

    #[test]
    fn error_replies_fail() {
        let err = parse_reply(reply(r#"{"error":"LOVABLE_API_KEY not configured"}"#)).unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn empty_replies_fail() {
        assert!(parse_reply(reply(r#"{"recommendations":"   "}"#)).is_err());
        assert!(parse_reply(reply("{}")).is_err());
    }

    #[test]
    fn defaults_have_one_bullet_per_line() {
        let text = default_recommendations();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("**Optymalizacja budżetu:**"));
    }

    #[test]
    fn request_wraps_record_in_data() {
        let record = MetricsRecord {
            client_name: "Salon Bella".into(),
            ..MetricsRecord::default()
        };
        let json = serde_json::to_value(RecommendationRequest { data: &record }).expect("json");
        assert_eq!(json["data"]["clientName"], "Salon Bella");
    }
}
