//! Configuration for the explorer, built once at startup

use crate::error::{Result, StockError};
use crate::narrative::Language;
use crate::presentation::ChartOptions;
use explorer_llm::LLMProvider;
use explorer_llm::providers::{GeminiConfig, GeminiProvider, OpenAIConfig, OpenAIProvider};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default Gemini model, overridable with `GENAI_MODEL`
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
/// Default OpenAI model, overridable with `OPENAI_MODEL`
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const DEFAULT_CHART_WIDTH: usize = 72;
const DEFAULT_CHART_HEIGHT: usize = 14;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Text-generation service backing the narrative translator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Gemini,
    OpenAI,
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => f.write_str("gemini"),
            Self::OpenAI => f.write_str("openai"),
        }
    }
}

/// Credential and model for the text-generation provider
#[derive(Clone)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub api_key: String,
    pub model: String,
    pub api_base: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmSettings {
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            provider: LlmProviderKind::Gemini,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: None,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider: LlmProviderKind::OpenAI,
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_base: None,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Instantiate the configured provider
    pub fn build_provider(&self) -> Result<Arc<dyn LLMProvider>> {
        let timeout_secs = self.timeout.as_secs().max(1);

        let provider: Arc<dyn LLMProvider> = match self.provider {
            LlmProviderKind::Gemini => {
                let mut config = GeminiConfig::new(&self.api_key).with_timeout(timeout_secs);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base);
                }
                Arc::new(GeminiProvider::with_config(config)?)
            }
            LlmProviderKind::OpenAI => {
                let mut config = OpenAIConfig::new(&self.api_key).with_timeout(timeout_secs);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base);
                }
                Arc::new(OpenAIProvider::with_config(config)?)
            }
        };

        Ok(provider)
    }
}

/// Explorer configuration
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Text-generation settings; `None` disables translation
    pub llm: Option<LlmSettings>,

    /// Target language of the company description
    pub language: Language,

    /// Chart width in columns
    pub chart_width: usize,

    /// Chart height in rows
    pub chart_height: usize,

    /// Timeout for market data requests
    pub request_timeout: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            llm: None,
            language: Language::default(),
            chart_width: DEFAULT_CHART_WIDTH,
            chart_height: DEFAULT_CHART_HEIGHT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ExplorerConfig {
    /// Create a new configuration builder
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::default()
    }

    /// Read the process environment.
    ///
    /// Call `explorer_utils::load_env_file` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`.
    ///
    /// `TOKEN_GENAI` selects Gemini and takes precedence over
    /// `OPENAI_API_KEY`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm = if let Some(key) = var("TOKEN_GENAI") {
            let mut settings = LlmSettings::gemini(key);
            if let Some(model) = var("GENAI_MODEL") {
                settings = settings.with_model(model);
            }
            Some(settings)
        } else if let Some(key) = var("OPENAI_API_KEY") {
            let mut settings = LlmSettings::openai(key);
            if let Some(model) = var("OPENAI_MODEL") {
                settings = settings.with_model(model);
            }
            if let Some(base) = var("OPENAI_API_BASE") {
                settings = settings.with_api_base(base);
            }
            Some(settings)
        } else {
            None
        };

        let mut builder = Self::builder();
        if let Some(settings) = llm {
            builder = builder.llm(settings);
        }
        if let Some(language) = var("EXPLORER_LANGUAGE") {
            builder = builder.language(language.parse()?);
        }
        if let Some(secs) = var("EXPLORER_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                StockError::ConfigError(format!(
                    "EXPLORER_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(20..=400).contains(&self.chart_width) {
            return Err(StockError::ConfigError(format!(
                "chart width must be between 20 and 400 columns, got {}",
                self.chart_width
            )));
        }

        if !(5..=100).contains(&self.chart_height) {
            return Err(StockError::ConfigError(format!(
                "chart height must be between 5 and 100 rows, got {}",
                self.chart_height
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(StockError::ConfigError(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(llm) = &self.llm {
            if llm.api_key.trim().is_empty() {
                return Err(StockError::ConfigError(format!("{} API key must not be empty", llm.provider)));
            }
            if llm.model.trim().is_empty() {
                return Err(StockError::ConfigError(format!("{} model must not be empty", llm.provider)));
            }
        }

        Ok(())
    }

    /// Chart dimensions for the presentation layer
    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions::new(self.chart_width, self.chart_height)
    }
}

/// Builder for ExplorerConfig
#[derive(Debug, Default)]
pub struct ExplorerConfigBuilder {
    llm: Option<LlmSettings>,
    language: Option<Language>,
    chart_width: Option<usize>,
    chart_height: Option<usize>,
    request_timeout: Option<Duration>,
}

impl ExplorerConfigBuilder {
    /// Enable translation with these settings
    pub fn llm(mut self, settings: LlmSettings) -> Self {
        self.llm = Some(settings);
        self
    }

    /// Drop any text-generation settings
    pub fn without_llm(mut self) -> Self {
        self.llm = None;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn chart_width(mut self, width: usize) -> Self {
        self.chart_width = Some(width);
        self
    }

    pub fn chart_height(mut self, height: usize) -> Self {
        self.chart_height = Some(height);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ExplorerConfig> {
        let defaults = ExplorerConfig::default();

        let config = ExplorerConfig {
            llm: self.llm,
            language: self.language.unwrap_or(defaults.language),
            chart_width: self.chart_width.unwrap_or(defaults.chart_width),
            chart_height: self.chart_height.unwrap_or(defaults.chart_height),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}
