//! Inbound render requests

use crate::{Error, Result};
use serde::Deserialize;

/// Filename used when the caller does not supply one
pub const DEFAULT_FILENAME: &str = "estimate.pdf";

/// Body of `POST /api/generate-pdf`, sent as JSON or as a urlencoded form
///
/// Both fields are optional at the parsing level so a missing `html` can be
/// reported with the service's own error payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratePdfBody {
    pub html: Option<String>,
    pub filename: Option<String>,
}

/// A validated render request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub html: String,
    pub filename: String,
}

impl TryFrom<GeneratePdfBody> for RenderRequest {
    type Error = Error;

    fn try_from(body: GeneratePdfBody) -> Result<Self> {
        let html = match body.html {
            Some(html) if !html.is_empty() => html,
            _ => return Err(Error::InvalidInput("No HTML content provided".into())),
        };

        Ok(Self {
            html,
            filename: resolve_filename(body.filename.as_deref()),
        })
    }
}

/// Pick the attachment filename, falling back to [`DEFAULT_FILENAME`].
///
/// Quotes, backslashes and control characters are stripped so the name can
/// sit inside a quoted `Content-Disposition` parameter.
pub fn resolve_filename(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> GeneratePdfBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_missing_null_and_empty_html_are_rejected() {
        for json in [r#"{}"#, r#"{"html":null}"#, r#"{"html":""}"#, r#"{"filename":"a.pdf"}"#] {
            let err = RenderRequest::try_from(body(json)).unwrap_err();
            assert!(err.is_client_error(), "{} should be rejected", json);
        }
    }

    #[test]
    fn test_filename_defaults() {
        let req = RenderRequest::try_from(body(r#"{"html":"<p>x</p>"}"#)).unwrap();
        assert_eq!(req.filename, DEFAULT_FILENAME);

        let req = RenderRequest::try_from(body(r#"{"html":"<p>x</p>","filename":""}"#)).unwrap();
        assert_eq!(req.filename, DEFAULT_FILENAME);
    }

    #[test]
    fn test_filename_is_kept_verbatim() {
        let req =
            RenderRequest::try_from(body(r#"{"html":"<p>x</p>","filename":"quote123.pdf"}"#)).unwrap();
        assert_eq!(req.html, "<p>x</p>");
        assert_eq!(req.filename, "quote123.pdf");
    }

    #[test]
    fn test_filename_header_breaking_chars_are_removed() {
        assert_eq!(resolve_filename(Some("a\"b.pdf")), "ab.pdf");
        assert_eq!(resolve_filename(Some("x\r\nSet-Cookie: y.pdf")), "xSet-Cookie: y.pdf");
        assert_eq!(resolve_filename(Some("\"\"")), DEFAULT_FILENAME);
        assert_eq!(resolve_filename(None), DEFAULT_FILENAME);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let req = RenderRequest::try_from(body(r#"{"html":"<b>x</b>","extra":1}"#)).unwrap();
        assert_eq!(req.filename, DEFAULT_FILENAME);
    }
}
