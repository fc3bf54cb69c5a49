//! Plain-language rewrite of a company's business summary
//!
//! The rewrite is best effort: without a configured provider, or when the
//! provider fails, the original summary is returned unchanged.

use crate::config::ExplorerConfig;
use crate::domain::CompanyProfile;
use crate::error::{Result, StockError};
use crate::presentation::NOT_AVAILABLE;
use explorer_llm::{CompletionRequest, LLMProvider, Message, StopReason};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Shown when the provider has no business summary for the company
pub const DESCRIPTION_NOT_AVAILABLE: &str = "Description not available";

const SYSTEM_INSTRUCTION: &str =
    "You explain public companies to people who are new to investing. Reply with the rewritten description only.";

const PROMPT_TEMPLATE: &str = "\
Rewrite the following company description in {{ language }}. \
Use a professional, warm and easy to understand tone for people who are learning about investing.

Description:
{{ summary }}

Context:
- Sector: {{ sector }}
- Industry: {{ industry }}
- Country: {{ country }}";

const MAX_TOKENS: usize = 1024;
const TEMPERATURE: f32 = 0.4;

/// Target language for the rewritten description
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Spanish
    #[default]
    Spanish,
    /// English
    English,
}

impl Language {
    /// ISO 639-1 code
    pub fn code(self) -> &'static str {
        match self {
            Self::Spanish => "es",
            Self::English => "en",
        }
    }

    /// Name used inside the prompt
    pub fn name(self) -> &'static str {
        match self {
            Self::Spanish => "Spanish",
            Self::English => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = StockError;

    /// Accepts the ISO code or the English or native name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "es" | "spanish" | "español" | "espanol" => Ok(Self::Spanish),
            "en" | "english" => Ok(Self::English),
            other => Err(StockError::ConfigError(format!(
                "unsupported language '{other}', expected es or en"
            ))),
        }
    }
}

/// Text to rewrite plus the context the prompt mentions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub summary: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
}

impl NarrativeRequest {
    pub fn from_profile(profile: &CompanyProfile) -> Self {
        Self {
            summary: profile.summary.clone(),
            sector: profile.sector.clone(),
            industry: profile.industry.clone(),
            country: profile.country.clone(),
        }
    }
}

/// Description ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Narrative {
    pub text: String,
    /// `false` when `text` is the original summary or the not-available notice
    pub translated: bool,
}

impl Narrative {
    fn passthrough(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            translated: false,
        }
    }
}

/// Render the rewrite prompt for `request`
pub fn build_prompt(request: &NarrativeRequest, language: Language) -> Result<String> {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let env = Environment::new();
    let prompt = env.render_str(
        PROMPT_TEMPLATE,
        context! {
            language => language.name(),
            summary => field(&request.summary),
            sector => field(&request.sector),
            industry => field(&request.industry),
            country => field(&request.country),
        },
    )?;
    Ok(prompt)
}

/// Optional text-generation client with a passthrough fallback
pub struct NarrativeTranslator {
    provider: Option<Arc<dyn LLMProvider>>,
    model: String,
    language: Language,
}

impl NarrativeTranslator {
    /// A translator that always returns the original text
    pub fn disabled(language: Language) -> Self {
        Self {
            provider: None,
            model: String::new(),
            language,
        }
    }

    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, language: Language) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
            language,
        }
    }

    /// Build from configuration. A missing or unusable credential disables
    /// translation instead of failing.
    pub fn from_config(config: &ExplorerConfig) -> Self {
        let Some(settings) = &config.llm else {
            warn!("No text-generation credential configured, descriptions will not be translated");
            return Self::disabled(config.language);
        };

        match settings.build_provider() {
            Ok(provider) => {
                debug!("Translation enabled via {} ({})", provider.name(), settings.model);
                Self::new(provider, settings.model.clone(), config.language)
            }
            Err(e) => {
                warn!("Text-generation provider unavailable, translation disabled: {e}");
                Self::disabled(config.language)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Rewrite the summary. Never fails; see [`Narrative::translated`].
    #[instrument(skip_all, fields(language = %self.language))]
    pub async fn translate(&self, request: &NarrativeRequest) -> Narrative {
        let Some(summary) = request.summary.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Narrative::passthrough(DESCRIPTION_NOT_AVAILABLE);
        };

        let Some(provider) = &self.provider else {
            debug!("Translation disabled, using original description");
            return Narrative::passthrough(summary);
        };

        match self.rewrite(provider.as_ref(), request).await {
            Ok(text) => Narrative {
                text,
                translated: true,
            },
            Err(e) => {
                warn!("Translation failed, using original description: {e}");
                Narrative::passthrough(summary)
            }
        }
    }

    async fn rewrite(&self, provider: &dyn LLMProvider, request: &NarrativeRequest) -> Result<String> {
        let prompt = build_prompt(request, self.language)?;
        let completion = CompletionRequest::builder(&self.model)
            .system(SYSTEM_INSTRUCTION)
            .add_message(Message::user(prompt))
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE)
            .build();

        let response = provider.complete(completion).await?;
        if response.stop_reason == StopReason::ContentFilter {
            return Err(StockError::LlmError(explorer_llm::LLMError::Blocked(
                "content filter".to_string(),
            )));
        }

        response
            .message
            .text()
            .map(str::to_string)
            .ok_or_else(|| {
                StockError::LlmError(explorer_llm::LLMError::UnexpectedResponse(
                    "empty completion".to_string(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use explorer_llm::{CompletionResponse, LLMError};
    use std::sync::Mutex;

    /// Replies with a fixed result and records the prompts it saw
    struct StubProvider {
        reply: std::result::Result<String, String>,
        stop_reason: StopReason,
        prompts: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                stop_reason: StopReason::EndTurn,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                stop_reason: StopReason::EndTurn,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LLMProvider for StubProvider {
        async fn complete(&self, request: CompletionRequest) -> explorer_llm::Result<CompletionResponse> {
            self.prompts.lock().unwrap().push(request.prompt_text());
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    stop_reason: self.stop_reason,
                    usage: None,
                }),
                Err(message) => Err(LLMError::RequestFailed(message.clone())),
            }
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn request() -> NarrativeRequest {
        NarrativeRequest {
            summary: Some("Apple designs smartphones.".to_string()),
            sector: Some("Technology".to_string()),
            industry: None,
            country: Some("United States".to_string()),
        }
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("es".parse::<Language>().unwrap(), Language::Spanish);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!(" ESPAÑOL ".parse::<Language>().unwrap(), Language::Spanish);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(Language::default(), Language::Spanish);
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt(&request(), Language::Spanish).unwrap();
        assert!(prompt.contains("in Spanish"));
        assert!(prompt.contains("learning about investing"));
        assert!(prompt.contains("Apple designs smartphones."));
        assert!(prompt.contains("- Sector: Technology"));
        assert!(prompt.contains("- Industry: not available"));
        assert!(prompt.contains("- Country: United States"));
    }

    #[tokio::test]
    async fn test_translation_success() {
        let provider = StubProvider::replying("  Apple diseña teléfonos inteligentes.\n");
        let translator = NarrativeTranslator::new(provider.clone(), "gemini-1.5-pro", Language::Spanish);

        let narrative = translator.translate(&request()).await;
        assert!(narrative.translated);
        assert_eq!(narrative.text, "Apple diseña teléfonos inteligentes.");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_passes_through() {
        let translator = NarrativeTranslator::disabled(Language::Spanish);
        assert!(!translator.is_enabled());

        let narrative = translator.translate(&request()).await;
        assert!(!narrative.translated);
        assert_eq!(narrative.text, "Apple designs smartphones.");
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let provider = StubProvider::failing("connection reset");
        let translator = NarrativeTranslator::new(provider.clone(), "m", Language::English);

        let narrative = translator.translate(&request()).await;
        assert!(!narrative.translated);
        assert_eq!(narrative.text, "Apple designs smartphones.");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_reply_falls_back() {
        let provider = StubProvider::replying("   ");
        let translator = NarrativeTranslator::new(provider, "m", Language::Spanish);

        let narrative = translator.translate(&request()).await;
        assert!(!narrative.translated);
        assert_eq!(narrative.text, "Apple designs smartphones.");
    }

    #[tokio::test]
    async fn test_filtered_reply_falls_back() {
        let provider = Arc::new(StubProvider {
            reply: Ok("partial".to_string()),
            stop_reason: StopReason::ContentFilter,
            prompts: Mutex::new(Vec::new()),
        });
        let translator = NarrativeTranslator::new(provider, "m", Language::Spanish);

        let narrative = translator.translate(&request()).await;
        assert!(!narrative.translated);
    }

    #[tokio::test]
    async fn test_missing_summary_skips_provider() {
        let provider = StubProvider::replying("unused");
        let translator = NarrativeTranslator::new(provider.clone(), "m", Language::Spanish);

        let narrative = translator.translate(&NarrativeRequest::default()).await;
        assert_eq!(narrative, Narrative::passthrough(DESCRIPTION_NOT_AVAILABLE));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_from_config_without_credential() {
        let config = ExplorerConfig::default();
        let translator = NarrativeTranslator::from_config(&config);
        assert!(!translator.is_enabled());
        assert_eq!(translator.language(), Language::Spanish);
    }

    #[test]
    fn test_request_from_profile() {
        let profile = CompanyProfile {
            summary: Some("text".to_string()),
            sector: Some("Energy".to_string()),
            ..Default::default()
        };
        let request = NarrativeRequest::from_profile(&profile);
        assert_eq!(request.summary.as_deref(), Some("text"));
        assert_eq!(request.sector.as_deref(), Some("Energy"));
        assert_eq!(request.country, None);
    }
}
