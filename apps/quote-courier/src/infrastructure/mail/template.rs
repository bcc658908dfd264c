//! Letter Template
//!
//! Renders a generated quote into the HTML letter body with `minijinja`.
//! The template name ends in `.html`, which turns on HTML auto-escaping for
//! every interpolated value, quote text included.

use chrono::Local;
use minijinja::{Environment, context};

use crate::application::services::{LetterRenderer, RenderError};
use crate::domain::generation::GeneratedQuote;

const LETTER_TEMPLATE_NAME: &str = "letter.html";
const LETTER_TEMPLATE: &str = include_str!("templates/letter.html");

/// Template errors.
#[derive(Debug, thiserror::Error)]
#[error("letter template error: {0}")]
pub struct TemplateError(#[from] minijinja::Error);

impl From<TemplateError> for RenderError {
    fn from(err: TemplateError) -> Self {
        Self(err.to_string())
    }
}

/// The compiled letter template.
#[derive(Debug)]
pub struct LetterTemplate {
    env: Environment<'static>,
}

impl LetterTemplate {
    /// Compile the embedded letter template.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if the template does not parse.
    pub fn new() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.add_template(LETTER_TEMPLATE_NAME, LETTER_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Render `quote` into a complete HTML document.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if evaluation fails.
    pub fn render_quote(&self, quote: &GeneratedQuote) -> Result<String, TemplateError> {
        let template = self.env.get_template(LETTER_TEMPLATE_NAME)?;
        let html = template.render(context! {
            style => quote.style.as_str(),
            subject => quote.style.subject(),
            heading => quote.style.heading(),
            text => quote.text.as_str(),
            sent_on => Local::now().format("%A, %B %-d").to_string(),
        })?;
        Ok(html)
    }
}

impl LetterRenderer for LetterTemplate {
    fn render(&self, quote: &GeneratedQuote) -> Result<String, RenderError> {
        Ok(self.render_quote(quote)?)
    }
}
