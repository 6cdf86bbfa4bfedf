use crate::error::AnswerError;
use crate::models::SearchResult;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_secs(30);

const PROMPT_CONTEXT_RESULTS: usize = 3;
const UNCONFIGURED_KEY: &str = "sk-or-v1-tu-api-key-aqui";

const SYSTEM_PROMPT: &str = "Eres un asistente especializado en documentos técnicos y estándares. Responde siempre en español de manera clara, concisa y profesional. Incluye referencias específicas a páginas de documentos cuando sea relevante. Limita tu respuesta a la información proporcionada en el contexto.";

pub const MISSING_KEY_FALLBACK: &str = "Disculpa, el servicio de IA no está disponible en este momento. Sin embargo, puedes navegar por los documentos usando los enlaces de búsqueda y el visor de documentos.";
pub const UNAVAILABLE_FALLBACK: &str = "El servicio de IA no está disponible temporalmente. Sin embargo, puedes usar la función de búsqueda para encontrar información específica en los documentos cargados y navegar directamente a las páginas relevantes.";
pub const TRANSPORT_FALLBACK: &str = "Ocurrió un error temporal con el servicio de IA. Mientras tanto, puedes usar la búsqueda avanzada y el visor de documentos para encontrar la información que necesitas. Los enlaces en los resultados de búsqueda te llevarán directamente a las páginas relevantes de los documentos.";
pub const INCOMPLETE_ANSWER: &str = "No se pudo generar una respuesta completa.";

static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static RE_EXCESS_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("valid regex"));

/// Text-in, text-out completion service used for synthesized answers.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Generated(String),
    Fallback(String),
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Generated(text) | Answer::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Answer::Fallback(_))
    }
}

pub struct OpenRouterClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl OpenRouterClient {
    /// `timeout` bounds the whole request, so a stalled service turns into
    /// the transport fallback instead of hanging the caller.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, AnswerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty() && key != UNCONFIGURED_KEY),
            timeout,
            client,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl AnswerService for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError> {
        let api_key = self.api_key.as_deref().ok_or(AnswerError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("X-Title", "Buscador de Estándares")
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
                "max_tokens": 500,
                "temperature": 0.3,
                "top_p": 0.9,
                "frequency_penalty": 0.5,
                "presence_penalty": 0.5,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnswerError::Status(response.status().as_u16()));
        }

        let body = response.json::<Value>().await?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|content| !content.trim().is_empty())
            .map(str::to_string)
            .ok_or(AnswerError::EmptyResponse)
    }
}

pub fn build_prompt(query: &str, results: &[SearchResult]) -> String {
    let context = results
        .iter()
        .take(PROMPT_CONTEXT_RESULTS)
        .map(|result| {
            format!(
                "📄 {} (página {}):\n{}",
                result.title.as_deref().unwrap_or(&result.file_name),
                result.page,
                result.contexts.first().map(String::as_str).unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Basado en los siguientes fragmentos de documentos, responde a la pregunta: \"{query}\"\n\nContexto:\n{context}\n\nPor favor, proporciona una respuesta concisa y estructurada, incluyendo referencias específicas a las páginas de los documentos cuando sea relevante."
    )
}

/// Asks the service for an answer grounded on `results`. Never fails: every
/// service error maps to a fixed fallback message.
pub async fn synthesize(
    service: &dyn AnswerService,
    query: &str,
    results: &[SearchResult],
) -> Answer {
    let prompt = build_prompt(query, results);

    match service.complete(&prompt).await {
        Ok(text) => {
            info!(chars = text.len(), "answer generated");
            Answer::Generated(tidy_response(&text))
        }
        Err(AnswerError::EmptyResponse) => Answer::Generated(INCOMPLETE_ANSWER.to_string()),
        Err(error) => {
            warn!(%error, "answer service unavailable, using fallback");
            Answer::Fallback(fallback_for(&error).to_string())
        }
    }
}

fn fallback_for(error: &AnswerError) -> &'static str {
    match error {
        AnswerError::MissingApiKey => MISSING_KEY_FALLBACK,
        AnswerError::Status(_) => UNAVAILABLE_FALLBACK,
        AnswerError::Http(_) | AnswerError::EmptyResponse => TRANSPORT_FALLBACK,
    }
}

pub fn tidy_response(text: &str) -> String {
    let collapsed = RE_EXCESS_NEWLINES.replace_all(text, "\n\n");
    RE_EXCESS_WHITESPACE
        .replace_all(&collapsed, " ")
        .trim()
        .to_string()
}
