//! Summarization capability: provider abstraction over an OpenAI-compatible
//! chat-completions endpoint, with disabled and mock variants. The analyzer
//! asks `is_enabled()` at call time and falls back to the rule-based path
//! whenever the capability is off or a call comes back empty.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::model::{Impact, Sentiment};

/// Input handed to a summarizer.
#[derive(Debug, Clone)]
pub struct AiSummaryRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content: Option<&'a str>,
}

/// Structured payload a summarizer returns. Out-of-range sentiment/impact
/// strings are clamped to neutral/medium at conversion time.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AiSummaryPayload {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

impl AiSummaryPayload {
    pub fn sentiment(&self) -> Sentiment {
        Sentiment::parse(&self.sentiment).unwrap_or(Sentiment::Neutral)
    }

    pub fn impact(&self) -> Impact {
        Impact::parse(&self.impact).unwrap_or(Impact::Medium)
    }
}

/// Emerging/declining override produced by trend analysis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiTrendPayload {
    #[serde(default)]
    pub emerging_topics: Vec<String>,
    #[serde(default)]
    pub declining_topics: Vec<String>,
}

#[async_trait]
pub trait SummaryClient: Send + Sync {
    /// Summarize one article. `None` means the capability produced nothing
    /// usable and the caller should fall back.
    async fn summarize(&self, req: &AiSummaryRequest<'_>) -> Option<AiSummaryPayload>;

    /// Override the emerging/declining topic lists from a corpus digest.
    /// Default: no override.
    async fn analyze_trends(&self, _digest: &str) -> Option<AiTrendPayload> {
        None
    }

    /// Availability check consulted before every call so the fallback path
    /// can be chosen synchronously.
    fn is_enabled(&self) -> bool;

    fn provider_name(&self) -> &'static str;
}

pub type DynSummaryClient = Arc<dyn SummaryClient>;

/// Build a client from the environment.
///
/// * `AI_TEST_MODE=mock` → deterministic mock client.
/// * `DEEPSEEK_API_KEY` set → DeepSeek (OpenAI-compatible) provider.
/// * `OPENAI_API_KEY` set → OpenAI provider.
/// * otherwise → disabled client (rule-based analysis only).
pub fn build_client_from_env() -> DynSummaryClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::default());
    }

    if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
        if !key.is_empty() {
            tracing::info!("summarization capability: deepseek");
            return Arc::new(OpenAiCompatClient::new(
                key,
                "https://api.deepseek.com/v1",
                "deepseek-chat",
                "deepseek",
            ));
        }
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            tracing::info!("summarization capability: openai");
            return Arc::new(OpenAiCompatClient::new(
                key,
                "https://api.openai.com/v1",
                "gpt-3.5-turbo",
                "openai",
            ));
        }
    }

    tracing::warn!("no summarizer API key configured, rule-based analysis only");
    Arc::new(DisabledClient)
}

/// Returns `None` always; used when no capability is configured.
pub struct DisabledClient;

#[async_trait]
impl SummaryClient for DisabledClient {
    async fn summarize(&self, _req: &AiSummaryRequest<'_>) -> Option<AiSummaryPayload> {
        None
    }
    fn is_enabled(&self) -> bool {
        false
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic client for tests and local runs.
#[derive(Clone)]
pub struct MockClient {
    pub payload: AiSummaryPayload,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            payload: AiSummaryPayload {
                summary: "Mock summary.".into(),
                key_points: vec!["Mock key point".into()],
                sentiment: "neutral".into(),
                impact: "medium".into(),
                related_topics: vec!["mock".into()],
            },
        }
    }
}

#[async_trait]
impl SummaryClient for MockClient {
    async fn summarize(&self, _req: &AiSummaryRequest<'_>) -> Option<AiSummaryPayload> {
        Some(self.payload.clone())
    }
    fn is_enabled(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// OpenAI-compatible chat-completions provider (OpenAI or DeepSeek).
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    name: &'static str,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String, base_url: &str, model: &str, name: &'static str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-aggregator/0.1 (+github.com/lumlich/ai-news-aggregator)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            name,
        }
    }

    async fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Option<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.3,
            max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            tracing::warn!(provider = self.name, status = %resp.status(), "summarizer call failed");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        body.choices.into_iter().next().map(|c| c.message.content)
    }
}

#[async_trait]
impl SummaryClient for OpenAiCompatClient {
    async fn summarize(&self, req: &AiSummaryRequest<'_>) -> Option<AiSummaryPayload> {
        let system = "You are a professional AI-news analyst. Respond with JSON only: \
                      {\"summary\": \"...\", \"key_points\": [\"...\"], \
                      \"sentiment\": \"positive|negative|neutral\", \
                      \"impact\": \"high|medium|low\", \"related_topics\": [\"...\"]}";
        let user = format!(
            "Title: {}\nDescription: {}\nContent: {}",
            req.title,
            req.description,
            req.content.unwrap_or("")
        );
        let content = self.chat(system, &user, 1000).await?;
        extract_json::<AiSummaryPayload>(&content)
    }

    async fn analyze_trends(&self, digest: &str) -> Option<AiTrendPayload> {
        let system = "You are a professional AI-trend analyst. Respond with JSON only: \
                      {\"emerging_topics\": [\"...\"], \"declining_topics\": [\"...\"]}";
        let content = self.chat(system, digest, 1500).await?;
        extract_json::<AiTrendPayload>(&content)
    }

    fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// Pull the first JSON object out of a model response that may carry prose or
/// code fences around it.
fn extract_json<T: serde::de::DeserializeOwned>(content: &str) -> Option<T> {
    static RE_JSON: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_JSON.get_or_init(|| regex::Regex::new(r"(?s)\{.*\}").unwrap());
    let raw = re.find(content)?.as_str();
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "summarizer returned unparseable JSON");
            None
        }
    }
}
