//! Perplexity chat-completions client.
//!
//! [`PerplexityClient`] is the enrichment query collaborator: each query sends
//! the family's agent preamble and a field prompt as the system message, the
//! instrument name as the user message, and runs the memory tool-calling loop
//! until the model answers in text.

use async_trait::async_trait;
use autologue_enrichment::prelude::{EnrichmentClient, QueryOutcome, timestamp_now};
use autologue_memory::{BridgeClient, KnowledgeGraph, MemoryToolbox};
use rand::Rng;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{PerplexityError, Result};
use crate::types::{ChatRequest, ChatResponse, Message};

/// Environment variable holding the API key.
pub const API_KEY_ENV_VAR: &str = "PERPLEXITY_API_KEY";

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Default model.
pub const DEFAULT_MODEL: &str = "sonar-pro";

const MEMORY_HINT: &str = "\n## Utilise les outils de mémorisation de la section 'tools' pour \
enregistrer de manière persistante tes connaissances et ainsi améliorer ton expertise.";

#[allow(clippy::expect_used)]
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("filename pattern is valid"));

/// Settings of the Perplexity client.
#[derive(Debug, Clone)]
pub struct PerplexityConfig {
    /// Bearer token.
    pub api_key: String,
    /// API base URL; a trailing slash is ignored.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Completion budget per request.
    pub max_tokens: u32,
    /// Attempts made while the API answers 429.
    pub max_rate_limit_attempts: u32,
    /// Unit of the exponential backoff.
    pub backoff_base: Duration,
    /// Model turns allowed to request tools before giving up.
    pub max_tool_rounds: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl PerplexityConfig {
    /// Configuration with default settings and the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 300,
            max_rate_limit_attempts: 3,
            backoff_base: Duration::from_secs(1),
            max_tool_rounds: 5,
            timeout: Duration::from_secs(120),
        }
    }

    /// Reads the key from `PERPLEXITY_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `PerplexityError::Config` if the variable is unset or blank.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PerplexityError::Config(format!("{API_KEY_ENV_VAR} not set")))?;
        Ok(Self::new(key.trim()))
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the completion budget.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the number of attempts under rate limiting.
    #[must_use]
    pub const fn with_max_rate_limit_attempts(mut self, attempts: u32) -> Self {
        self.max_rate_limit_attempts = attempts;
        self
    }

    /// Set the backoff unit.
    #[must_use]
    pub const fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set the number of tool-calling rounds.
    #[must_use]
    pub const fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Research agent backed by the Perplexity API.
#[derive(Debug, Clone)]
pub struct PerplexityClient<G = BridgeClient> {
    http: Client,
    config: PerplexityConfig,
    memory: Option<MemoryToolbox<G>>,
    agent_prompt: String,
    answers_dir: Option<PathBuf>,
}

impl PerplexityClient {
    /// Builds a client without memory tools.
    ///
    /// # Errors
    ///
    /// Returns `PerplexityError::Config` if the HTTP client cannot be built.
    pub fn new(config: PerplexityConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PerplexityError::Config(e.to_string()))?;
        Ok(Self {
            http,
            config,
            memory: None,
            agent_prompt: String::new(),
            answers_dir: None,
        })
    }
}

impl<G: KnowledgeGraph> PerplexityClient<G> {
    /// Offers the memory tools of `toolbox` to the model.
    #[must_use]
    pub fn with_memory<H: KnowledgeGraph>(self, toolbox: MemoryToolbox<H>) -> PerplexityClient<H> {
        PerplexityClient {
            http: self.http,
            config: self.config,
            memory: Some(toolbox),
            agent_prompt: self.agent_prompt,
            answers_dir: self.answers_dir,
        }
    }

    /// Set the agent preamble placed first in the system message.
    #[must_use]
    pub fn with_agent_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.agent_prompt = prompt.into();
        self
    }

    /// Archive every answer under `dir`.
    #[must_use]
    pub fn with_answers_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.answers_dir = Some(dir.into());
        self
    }

    /// Client settings.
    #[must_use]
    pub const fn config(&self) -> &PerplexityConfig {
        &self.config
    }

    /// System message for a research task.
    #[must_use]
    pub fn system_prompt(&self, task: &str) -> String {
        let mut parts = vec![self.agent_prompt.as_str()];
        if self.memory.is_some() {
            parts.push(MEMORY_HINT);
        }
        let task_section = format!("\n## Tâche de recherche : \n{task}");
        if !task.is_empty() {
            parts.push(&task_section);
        }
        parts.join("\n")
    }

    /// Asks the model about `subject` and returns its text answer.
    ///
    /// Tool calls are executed and fed back until the model answers in text
    /// or `max_tool_rounds` is reached. Returns `Ok(None)` when the model
    /// gives no text.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` on HTTP 400, `RateLimited` when 429 persists, `Api`
    /// for other non-2xx statuses, `Network` and `Parse` for transport and
    /// decoding failures.
    pub async fn research(&self, task: &str, subject: &str) -> Result<Option<String>> {
        let mut messages = vec![
            Message::system(self.system_prompt(task)),
            Message::user(subject),
        ];
        let tools: Vec<Value> = if self.memory.is_some() {
            MemoryToolbox::<G>::definitions()
                .iter()
                .map(autologue_memory::ToolDefinition::to_openai_format)
                .collect()
        } else {
            Vec::new()
        };

        for round in 0..=self.config.max_tool_rounds {
            let reply = self.complete(&messages, &tools).await?;

            let Some(toolbox) = self.memory.as_ref().filter(|_| !reply.tool_calls.is_empty()) else {
                return Ok(reply.answer().map(ToString::to_string));
            };

            tracing::info!(round, calls = reply.tool_calls.len(), %subject, "Model requested memory tools");
            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                tracing::debug!(tool = %call.function.name, id = %call.id, "Executing tool call");
                let result = toolbox
                    .execute(&call.function.name, &call.function.arguments)
                    .await;
                messages.push(Message::tool(call.id, result));
            }
        }

        tracing::warn!(
            rounds = self.config.max_tool_rounds,
            %subject,
            "Model kept calling tools without answering"
        );
        Ok(None)
    }

    /// Posts one chat completion, retrying while rate limited.
    async fn complete(&self, messages: &[Message], tools: &[Value]) -> Result<Message> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            max_tokens: Some(self.config.max_tokens),
            tools: tools.to_vec(),
        };

        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| PerplexityError::Network(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| PerplexityError::Network(e.to_string()))?;

            match status {
                StatusCode::BAD_REQUEST => {
                    tracing::error!(%body, "Invalid search parameters");
                    return Err(PerplexityError::InvalidRequest(body));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    attempt += 1;
                    if attempt >= self.config.max_rate_limit_attempts {
                        tracing::error!(attempts = attempt, "Max retries reached due to rate limiting");
                        return Err(PerplexityError::RateLimited { attempts: attempt });
                    }
                    let delay = backoff_delay(self.config.backoff_base, attempt - 1);
                    tracing::warn!(delay_secs = delay.as_secs_f64(), "Rate limited, retrying");
                    tokio::time::sleep(delay).await;
                }
                status if !status.is_success() => {
                    return Err(PerplexityError::Api {
                        status: status.as_u16(),
                        body,
                    });
                }
                _ => {
                    let parsed: ChatResponse = serde_json::from_str(&body)
                        .map_err(|e| PerplexityError::Parse(e.to_string()))?;
                    if let Some(usage) = parsed.usage {
                        tracing::debug!(
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            "Completion usage"
                        );
                    }
                    return parsed
                        .choices
                        .into_iter()
                        .next()
                        .map(|choice| choice.message)
                        .ok_or_else(|| PerplexityError::Parse("no choices in response".to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl<G: KnowledgeGraph> EnrichmentClient for PerplexityClient<G> {
    async fn query(&self, prompt: &str, subject: &str) -> QueryOutcome {
        match self.research(prompt, subject).await {
            Ok(Some(answer)) => {
                if let Some(dir) = &self.answers_dir {
                    if let Err(e) = archive_answer(dir, subject, &answer) {
                        tracing::error!(error = %e, "Failed to archive answer");
                    }
                }
                QueryOutcome::from_reply(Some(answer))
            }
            Ok(None) => QueryOutcome::Absent,
            Err(e) if e.is_absent_answer() => {
                tracing::warn!(error = %e, %subject, "No answer");
                QueryOutcome::Absent
            }
            Err(e) => {
                tracing::error!(error = %e, %subject, "Perplexity query failed");
                QueryOutcome::Failed
            }
        }
    }
}

/// Delay before retry number `attempt` (0-based): `base * 2^attempt` plus up
/// to one `base` of jitter.
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = f64::from(2_u32.saturating_pow(attempt));
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    base.mul_f64(factor + jitter)
}

/// Turns an instrument name into a file-name stem.
#[must_use]
pub fn sanitize_subject(subject: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(subject, "")
        .replace(' ', "_")
        .trim_matches(|c| c == '.' || c == ' ')
        .to_string()
}

/// Writes `answer` to `<dir>/<subject>-answer-<timestamp>.md`.
///
/// # Errors
///
/// Returns `PerplexityError::Archive` if the directory or file cannot be written.
pub fn archive_answer(dir: &Path, subject: &str, answer: &str) -> Result<PathBuf> {
    let path = dir.join(format!(
        "{}-answer-{}.md",
        sanitize_subject(subject),
        timestamp_now()
    ));
    let to_archive_error = |e: std::io::Error| PerplexityError::Archive {
        path: path.clone(),
        message: e.to_string(),
    };
    std::fs::create_dir_all(dir).map_err(to_archive_error)?;
    std::fs::write(&path, answer).map_err(to_archive_error)?;
    tracing::debug!(path = %path.display(), "Archived answer");
    Ok(path)
}
