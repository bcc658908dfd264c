//! Courier Configuration Settings
//!
//! Configuration types for the courier, loaded from environment variables.
//! Lookups go through a closure so the parsing can be exercised without
//! touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

/// Model used when `INFERENCE_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "x1";

/// Bound on one generation call when `QUOTE_TIMEOUT_SECS` is unset.
pub const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on each SMTP command when `MAIL_SMTP_TIMEOUT_SECS` is unset.
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_OUTBOX_DIR: &str = "outbox";

const SCHEDULE_FORMAT: &str = "%H:%M";

/// Inference API credentials.
#[derive(Clone)]
pub struct Credentials {
    app_id: String,
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(app_id: String, api_key: String, api_secret: String) -> Self {
        Self {
            app_id,
            api_key,
            api_secret,
        }
    }

    /// Get the application id.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Inference endpoint settings.
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    /// API credentials.
    pub credentials: Credentials,
    /// Endpoint URL (`ws`, `wss`, `http` or `https`).
    pub endpoint_url: String,
    /// Model name sent as `parameter.chat.domain`.
    pub model: String,
    /// Bound on one generation call, connection opening included.
    pub timeout: Duration,
    /// Whether to offer the web search tool.
    pub web_search: bool,
}

impl InferenceSettings {
    /// Settings for `endpoint_url` with default model, timeout and tools.
    #[must_use]
    pub fn new(credentials: Credentials, endpoint_url: impl Into<String>) -> Self {
        Self {
            credentials,
            endpoint_url: endpoint_url.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_QUOTE_TIMEOUT,
            web_search: true,
        }
    }
}

/// Letter addressing and delivery route.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// How letters leave the process.
    pub delivery: MailDelivery,
}

/// Where letters are handed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailDelivery {
    /// Write `.eml` files into this directory.
    Outbox(PathBuf),
    /// Submit through an SMTP relay.
    Smtp(SmtpSettings),
}

impl std::fmt::Display for MailDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outbox(dir) => write!(f, "outbox:{}", dir.display()),
            Self::Smtp(smtp) => write!(f, "smtp://{}:{} ({})", smtp.host, smtp.port, smtp.security),
        }
    }
}

/// Connection security towards the SMTP relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS from the first byte (SMTPS).
    Tls,
    /// Plain connection upgraded with `STARTTLS`.
    StartTls,
    /// No encryption. Only for relays on localhost.
    Plain,
}

impl SmtpSecurity {
    /// Conventional submission port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => 465,
            Self::StartTls => 587,
            Self::Plain => 25,
        }
    }

    /// Lowercase name, as accepted in `MAIL_SMTP_SECURITY`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tls => "tls",
            Self::StartTls => "starttls",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SMTP login.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpAuth {
    username: String,
    password: String,
}

impl SmtpAuth {
    /// Create a login.
    #[must_use]
    pub const fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Get the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for SmtpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// Relay host name.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Connection security.
    pub security: SmtpSecurity,
    /// Login, if the relay requires one.
    pub auth: Option<SmtpAuth>,
    /// Bound on each SMTP command.
    pub timeout: Duration,
}

impl SmtpSettings {
    /// Settings for `host` with the conventional port of `security`.
    #[must_use]
    pub fn new(host: impl Into<String>, security: SmtpSecurity) -> Self {
        Self {
            host: host.into(),
            port: security.default_port(),
            security,
            auth: None,
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }
}

/// Local fire times of the two daily triggers. `None` disables a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Morning upbeat letter.
    pub upbeat_at: Option<NaiveTime>,
    /// Midnight somber letter.
    pub somber_at: Option<NaiveTime>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            upbeat_at: NaiveTime::from_hms_opt(8, 0, 0),
            somber_at: NaiveTime::from_hms_opt(0, 0, 0),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete courier configuration.
#[derive(Debug, Clone)]
pub struct CourierConfig {
    /// Inference endpoint settings.
    pub inference: InferenceSettings,
    /// Mail settings.
    pub mail: MailSettings,
    /// Daily trigger times.
    pub schedule: ScheduleSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl CourierConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or a
    /// schedule time does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`CourierConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::new(
            required(&lookup, "INFERENCE_APP_ID")?,
            required(&lookup, "INFERENCE_API_KEY")?,
            required(&lookup, "INFERENCE_API_SECRET")?,
        );

        let mut inference =
            InferenceSettings::new(credentials, required(&lookup, "INFERENCE_URL")?);
        if let Some(model) = lookup("INFERENCE_MODEL").filter(|m| !m.trim().is_empty()) {
            inference.model = model.trim().to_string();
        }
        inference.web_search = parse_bool(lookup("INFERENCE_WEB_SEARCH"), inference.web_search);
        inference.timeout =
            parse_duration_secs(lookup("QUOTE_TIMEOUT_SECS"), inference.timeout);

        let mail = MailSettings {
            from: required(&lookup, "MAIL_FROM")?,
            to: required(&lookup, "MAIL_TO")?,
            delivery: parse_delivery(&lookup)?,
        };

        let defaults = ScheduleSettings::default();
        let schedule = ScheduleSettings {
            upbeat_at: parse_schedule(&lookup, "SCHEDULE_UPBEAT_AT", defaults.upbeat_at)?,
            somber_at: parse_schedule(&lookup, "SCHEDULE_SOMBER_AT", defaults.somber_at)?,
        };

        let server = ServerSettings {
            health_port: parse_u16(
                lookup("COURIER_HEALTH_PORT"),
                ServerSettings::default().health_port,
            ),
        };

        Ok(Self {
            inference,
            mail,
            schedule,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value that does not parse.
    #[error("environment variable {key} has invalid value {value:?}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// What was expected.
        reason: String,
    },
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value.trim().to_string())
}

/// SMTP when `MAIL_SMTP_HOST` is set, the outbox otherwise.
fn parse_delivery<F>(lookup: &F) -> Result<MailDelivery, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(host) = lookup("MAIL_SMTP_HOST").filter(|h| !h.trim().is_empty()) else {
        let dir = lookup("MAIL_OUTBOX_DIR")
            .filter(|d| !d.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_OUTBOX_DIR), PathBuf::from);
        return Ok(MailDelivery::Outbox(dir));
    };

    let security = match lookup("MAIL_SMTP_SECURITY") {
        None => SmtpSecurity::Tls,
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" | "smtps" => SmtpSecurity::Tls,
            "starttls" => SmtpSecurity::StartTls,
            "plain" | "none" => SmtpSecurity::Plain,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "MAIL_SMTP_SECURITY".to_string(),
                    value: raw,
                    reason: "expected tls, starttls or plain".to_string(),
                });
            }
        },
    };

    let mut smtp = SmtpSettings::new(host.trim(), security);
    smtp.port = parse_u16(lookup("MAIL_SMTP_PORT"), smtp.port);
    smtp.timeout = parse_duration_secs(lookup("MAIL_SMTP_TIMEOUT_SECS"), smtp.timeout);

    if let Some(username) = lookup("MAIL_SMTP_USERNAME").filter(|u| !u.trim().is_empty()) {
        let password = required(lookup, "MAIL_SMTP_PASSWORD")?;
        smtp.auth = Some(SmtpAuth::new(username.trim().to_string(), password));
    }

    Ok(MailDelivery::Smtp(smtp))
}

fn parse_schedule<F>(
    lookup: &F,
    key: &str,
    default: Option<NaiveTime>,
) -> Result<Option<NaiveTime>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw.trim();
    if value.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, SCHEDULE_FORMAT)
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: format!("expected HH:MM or off ({e})"),
        })
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_u16(value: Option<String>, default: u16) -> u16 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_duration_secs(value: Option<String>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(default, Duration::from_secs)
}
