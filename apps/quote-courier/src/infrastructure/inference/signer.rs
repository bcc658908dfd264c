//! Connection URL Signing
//!
//! The inference endpoint authenticates the WebSocket upgrade through query
//! parameters rather than headers. The server rejects a date outside its
//! freshness window, so a signed URL is good for one connection only.
//!
//! # Signing Flow
//!
//! 1. Format the current instant as an HTTP-date (`Sat, 17 Oct 2026 08:00:00 GMT`)
//! 2. Build `host: {host}\ndate: {date}\nGET {path} HTTP/1.1`
//! 3. HMAC-SHA256 it with the API secret, base64 the MAC
//! 4. Wrap key, algorithm, header list and MAC into an authorization string,
//!    base64 that again
//! 5. Append `authorization`, `date`, `host` as query parameters and switch
//!    the scheme to `ws`/`wss`

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tokio_tungstenite::tungstenite::http::Uri;

use crate::domain::generation::QuoteError;

type HmacSha256 = Hmac<Sha256>;

/// `strftime` pattern for RFC 7231 HTTP-dates.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Request method covered by the signature.
const SIGNED_METHOD: &str = "GET";

/// Protocol version covered by the signature.
const SIGNED_PROTOCOL: &str = "HTTP/1.1";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while signing an endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The endpoint is not a valid URI.
    #[error("invalid endpoint URL {url:?}: {reason}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The endpoint has no host component.
    #[error("endpoint URL {0:?} has no host")]
    MissingHost(String),

    /// The endpoint scheme has no streaming counterpart.
    #[error("unsupported scheme {0:?}: expected http, https, ws or wss")]
    UnsupportedScheme(String),

    /// The secret was rejected by the MAC implementation.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

impl From<SigningError> for QuoteError {
    fn from(err: SigningError) -> Self {
        Self::Signing(err.to_string())
    }
}

// =============================================================================
// Signed URL
// =============================================================================

/// A connection URL carrying a fresh authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestUrl {
    scheme: &'static str,
    authority: String,
    host: String,
    path: String,
    query: String,
    date: String,
}

impl SignedRequestUrl {
    /// Streaming scheme (`ws` or `wss`).
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        self.scheme
    }

    /// Host covered by the signature, without port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Request path covered by the signature.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Encoded query string (`authorization=..&date=..&host=..`).
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// HTTP-date embedded in the signature.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Full URL to connect to.
    #[must_use]
    pub fn as_url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SignedRequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}?{}",
            self.scheme, self.authority, self.path, self.query
        )
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Signs endpoint URLs with an API key and secret.
///
/// The `Debug` implementation redacts the secret for safe logging.
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    api_secret: String,
}

impl RequestSigner {
    /// Create a signer for the given key pair.
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Sign `endpoint` for the current instant.
    ///
    /// # Errors
    ///
    /// Returns `SigningError` if the endpoint is malformed, has no host, or
    /// uses a scheme other than http(s)/ws(s).
    pub fn sign(&self, endpoint: &str) -> Result<SignedRequestUrl, SigningError> {
        self.sign_at(endpoint, Utc::now())
    }

    /// Sign `endpoint` for an explicit instant.
    ///
    /// # Errors
    ///
    /// Same as [`RequestSigner::sign`].
    pub fn sign_at(
        &self,
        endpoint: &str,
        at: DateTime<Utc>,
    ) -> Result<SignedRequestUrl, SigningError> {
        let uri = endpoint
            .parse::<Uri>()
            .map_err(|e| SigningError::InvalidUrl {
                url: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SigningError::MissingHost(endpoint.to_string()))?
            .to_string();

        let scheme = streaming_scheme(uri.scheme_str().unwrap_or_default())?;

        let authority = uri
            .authority()
            .map_or_else(|| host.clone(), |a| a.as_str().to_string());

        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let date = at.format(HTTP_DATE_FORMAT).to_string();
        let signature = self.signature(&host, &date, &path)?;

        let authorization = format!(
            "api_key=\"{}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", signature=\"{}\"",
            self.api_key, signature
        );
        let authorization = BASE64_STANDARD.encode(authorization.as_bytes());

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("authorization", &authorization)
            .append_pair("date", &date)
            .append_pair("host", &host)
            .finish();

        Ok(SignedRequestUrl {
            scheme,
            authority,
            host,
            path,
            query,
            date,
        })
    }

    /// Base64 HMAC-SHA256 over the canonical signing string.
    fn signature(&self, host: &str, date: &str, path: &str) -> Result<String, SigningError> {
        let canonical =
            format!("host: {host}\ndate: {date}\n{SIGNED_METHOD} {path} {SIGNED_PROTOCOL}");

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        mac.update(canonical.as_bytes());

        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Map a configured scheme onto its streaming counterpart.
fn streaming_scheme(scheme: &str) -> Result<&'static str, SigningError> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => Ok("ws"),
        "https" | "wss" => Ok("wss"),
        other => Err(SigningError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const ENDPOINT: &str = "https://inference.example.com/v1/x1";

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()
    }

    fn query_param(url: &SignedRequestUrl, key: &str) -> String {
        form_urlencoded::parse(url.query().as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    fn decoded_authorization(url: &SignedRequestUrl) -> String {
        let raw = BASE64_STANDARD
            .decode(query_param(url, "authorization"))
            .unwrap();
        String::from_utf8(raw).unwrap()
    }

    #[test]
    fn formats_date_as_http_date() {
        let signer = RequestSigner::new("key", "secret");
        let url = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();
        assert_eq!(url.date(), "Sat, 17 Oct 2026 08:00:00 GMT");
        assert_eq!(query_param(&url, "date"), "Sat, 17 Oct 2026 08:00:00 GMT");
    }

    #[test]
    fn rewrites_scheme_to_streaming() {
        let signer = RequestSigner::new("key", "secret");

        let secure = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();
        assert!(secure.as_url().starts_with("wss://inference.example.com/v1/x1?"));

        let plain = signer
            .sign_at("http://127.0.0.1:9000/chat", fixed_instant())
            .unwrap();
        assert!(plain.as_url().starts_with("ws://127.0.0.1:9000/chat?"));
        assert_eq!(plain.host(), "127.0.0.1");
    }

    #[test]
    fn keeps_streaming_schemes() {
        let signer = RequestSigner::new("key", "secret");
        let url = signer
            .sign_at("wss://inference.example.com/v1/x1", fixed_instant())
            .unwrap();
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn query_carries_mandatory_parameters() {
        let signer = RequestSigner::new("key", "secret");
        let url = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();

        let keys: Vec<String> = form_urlencoded::parse(url.query().as_bytes())
            .map(|(k, _)| k.into_owned())
            .collect();
        assert_eq!(keys, ["authorization", "date", "host"]);
        assert_eq!(query_param(&url, "host"), "inference.example.com");
    }

    #[test]
    fn authorization_names_key_and_verifiable_signature() {
        let signer = RequestSigner::new("my-key", "my-secret");
        let url = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();
        let authorization = decoded_authorization(&url);

        assert!(authorization.starts_with("api_key=\"my-key\", algorithm=\"hmac-sha256\""));
        assert!(authorization.contains("headers=\"host date request-line\""));

        let canonical = "host: inference.example.com\ndate: Sat, 17 Oct 2026 08:00:00 GMT\nGET /v1/x1 HTTP/1.1";
        let mut mac = HmacSha256::new_from_slice(b"my-secret").unwrap();
        mac.update(canonical.as_bytes());
        let expected = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        assert!(authorization.ends_with(&format!("signature=\"{expected}\"")));
    }

    #[test]
    fn same_instant_gives_same_signature() {
        let signer = RequestSigner::new("key", "secret");
        let first = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();
        let second = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_instants_give_different_signatures() {
        let signer = RequestSigner::new("key", "secret");
        let first = signer.sign_at(ENDPOINT, fixed_instant()).unwrap();
        let later = signer
            .sign_at(ENDPOINT, fixed_instant() + chrono::Duration::seconds(1))
            .unwrap();
        assert_ne!(
            query_param(&first, "authorization"),
            query_param(&later, "authorization")
        );
    }

    #[test]
    fn different_secrets_give_different_signatures() {
        let a = RequestSigner::new("key", "secret-a")
            .sign_at(ENDPOINT, fixed_instant())
            .unwrap();
        let b = RequestSigner::new("key", "secret-b")
            .sign_at(ENDPOINT, fixed_instant())
            .unwrap();
        assert_ne!(a.query(), b.query());
    }

    #[test]
    fn empty_path_signs_root() {
        let signer = RequestSigner::new("key", "secret");
        let url = signer
            .sign_at("https://inference.example.com", fixed_instant())
            .unwrap();
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn missing_host_is_rejected() {
        let signer = RequestSigner::new("key", "secret");
        let err = signer.sign_at("/v1/x1", fixed_instant()).unwrap_err();
        assert!(matches!(err, SigningError::MissingHost(_)));
    }

    #[test]
    fn garbage_url_is_rejected() {
        let signer = RequestSigner::new("key", "secret");
        let err = signer.sign_at("not a url", fixed_instant()).unwrap_err();
        assert!(matches!(err, SigningError::InvalidUrl { .. }));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let signer = RequestSigner::new("key", "secret");
        let err = signer
            .sign_at("ftp://inference.example.com/v1", fixed_instant())
            .unwrap_err();
        assert_eq!(err, SigningError::UnsupportedScheme("ftp".to_string()));
    }

    #[test]
    fn signing_error_converts_to_quote_error() {
        let err: QuoteError = SigningError::MissingHost("/x".to_string()).into();
        assert!(matches!(err, QuoteError::Signing(_)));
    }

    #[test]
    fn debug_redacts_secret() {
        let signer = RequestSigner::new("my-key", "super-secret");
        let debug = format!("{signer:?}");
        assert!(debug.contains("my-key"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
