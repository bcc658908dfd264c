//! Configuration Module
//!
//! Configuration loading for the courier service.

mod settings;

pub use settings::{
    ConfigError, CourierConfig, Credentials, DEFAULT_MODEL, DEFAULT_QUOTE_TIMEOUT,
    DEFAULT_SMTP_TIMEOUT, InferenceSettings, MailDelivery, MailSettings, ScheduleSettings,
    ServerSettings, SmtpAuth, SmtpSecurity, SmtpSettings,
};
