use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the chat backend
    #[arg(long, env = "CHAT_API_BASE")]
    pub api_base: Option<String>,

    /// File used as the widget's durable storage
    #[arg(long, env = "WIDGET_STORAGE_PATH")]
    pub storage_path: Option<String>,
}

/// A preconfigured button that submits a fixed message on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    /// Stable identifier used by hosts.
    pub key: String,
    /// Button caption.
    pub label: String,
    /// Text sent when the button is clicked.
    pub message_text: String,
}

impl QuickAction {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        message_text: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            message_text: message_text.into(),
        }
    }
}

/// Fixed bot texts shown instead of technical error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotMessages {
    /// Endpoint answered with a non-success status.
    pub request_failed: String,
    /// Request could not complete at all.
    pub network_error: String,
    /// Reply field missing or empty.
    pub empty_reply: String,
    /// Shown right after a redirect reply.
    pub redirect_confirmation: String,
    /// Shown once the external link has been opened.
    pub redirect_follow_up: String,
}

impl Default for BotMessages {
    fn default() -> Self {
        Self {
            request_failed: "Sorry, something went wrong on our side. Please try again.".into(),
            network_error: "Sorry, I'm having trouble connecting. Please try refreshing the page \
                            or contact support at +91 75068 55407."
                .into(),
            empty_reply: "Sorry, I couldn't process your request. Please try again.".into(),
            redirect_confirmation: "Great! Connecting you with our team on WhatsApp...".into(),
            redirect_follow_up: "If WhatsApp didn't open automatically, please allow pop-ups \
                                 or message us at +91 75068 55407."
                .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub welcome_delay_ms: u64,
    pub redirect_open_delay_ms: u64,
    pub redirect_follow_up_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            welcome_delay_ms: 500,
            redirect_open_delay_ms: 1000,
            redirect_follow_up_delay_ms: 2000,
            request_timeout_secs: 30,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn welcome_delay(&self) -> Duration {
        Duration::from_millis(self.welcome_delay_ms)
    }

    #[must_use]
    pub fn redirect_open_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_open_delay_ms)
    }

    #[must_use]
    pub fn redirect_follow_up_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_follow_up_delay_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub storage_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".into(),
            storage_path: "gfc-storage.json".into(),
        }
    }
}

/// Everything a widget instance needs at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub api_base: String,
    pub api_endpoint: String,
    pub title: String,
    pub subtitle: String,
    /// Storage key of the conversation id.
    pub storage_key: String,
    /// Storage key of the minimized flag.
    pub minimized_key: String,
    pub welcome_message: String,
    pub quick_actions: Vec<QuickAction>,
    pub messages: BotMessages,
    pub timing: TimingConfig,
    pub server: ServerConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: "https://gharfix-chatbot.onrender.com".into(),
            api_endpoint: "/chat".into(),
            title: "🏠 GharFix Assistant".into(),
            subtitle: "Always here to help".into(),
            storage_key: "gfc_conversation_id".into(),
            minimized_key: "gfc_minimized_state".into(),
            welcome_message: "Welcome to GharFix! I'm here 24/7 to help you with:\n\n\
                              🔧 Plumbing & Electrical\n\
                              🧹 Cleaning Services\n\
                              👗 Tailoring Services\n\
                              🍳 Chef Services\n\
                              💆 Massage & Wellness\n\
                              🏠 And much more!\n\n\
                              What service do you need today?"
                .into(),
            quick_actions: vec![
                QuickAction::new("services", "Our Services", "List all the services"),
                QuickAction::new("book-now", "Book Now", "Book Now"),
                QuickAction::new("pricing", "Pricing", "Pricing"),
                QuickAction::new("emergency", "Emergency Help", "Emergency Help"),
            ],
            messages: BotMessages::default(),
            timing: TimingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl WidgetConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        // 1. Built-in defaults
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        // 2. Config file: explicit path, else ./widget.{yaml,toml,json} if present
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("widget").required(false)),
        };

        // 3. Environment variables, e.g. GFC_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("GFC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags (and their env aliases) win
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(base) = cli.api_base {
            builder = builder.set_override("api_base", base)?;
        }
        if let Some(path) = cli.storage_path {
            builder = builder.set_override("server.storage_path", path)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Full URL the widget POSTs to.
    pub fn endpoint_url(&self) -> Result<Url, url::ParseError> {
        let base = self.api_base.trim_end_matches('/');
        Url::parse(&format!("{base}{}", self.api_endpoint))
    }

    /// Find a quick action by key, falling back to its label.
    #[must_use]
    pub fn quick_action(&self, key: &str) -> Option<&QuickAction> {
        self.quick_actions
            .iter()
            .find(|a| a.key == key)
            .or_else(|| self.quick_actions.iter().find(|a| a.label == key))
    }
}
