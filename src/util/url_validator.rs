use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host to connect to.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed source.
///
/// Accepts absolute `http` and `https` URLs with a host. Anything else
/// (`file://`, `data:`, relative paths) is rejected before a request is
/// ever built.
///
/// # Examples
///
/// ```
/// use sheetpress::util::validate_source_url;
///
/// let url = validate_source_url("https://docs.google.com/spreadsheets/d/e/x/pub?output=csv").unwrap();
/// assert_eq!(url.host_str(), Some("docs.google.com"));
///
/// assert!(validate_source_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_source_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}
