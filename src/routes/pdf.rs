//! PDF generation route

use axum::{
    body::Body,
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Form, Json, Router,
};

use crate::routes::ApiError;
use crate::server::AppState;
use crate::{Error, GeneratePdfBody, RenderRequest};

/// Create the PDF router
pub fn router() -> Router<AppState> {
    Router::new().route("/api/generate-pdf", post(generate_pdf))
}

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Render the posted HTML and return it as a PDF attachment
///
/// Accepts a JSON body or a urlencoded form with the same fields.
async fn generate_pdf(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let body = if is_form(request.headers()) {
        Form::<GeneratePdfBody>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|rejection| body_error(rejection.status(), rejection.body_text()))?
    } else {
        Json::<GeneratePdfBody>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|rejection| body_error(rejection.status(), rejection.body_text()))?
    };

    let request = RenderRequest::try_from(body)?;
    tracing::info!(
        "Received PDF generation request: {} bytes of HTML, filename {}",
        request.html.len(),
        request.filename
    );

    let pdf = state.renderer().render(&request.html).await?;
    pdf_response(pdf, &request.filename)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().starts_with(FORM_CONTENT_TYPE))
        .unwrap_or(false)
}

fn body_error(status: StatusCode, text: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(text)
    } else {
        ApiError::InvalidBody(text)
    }
}

/// Build the attachment response; the body is exactly `pdf`.
pub fn pdf_response(pdf: Vec<u8>, filename: &str) -> Result<Response, ApiError> {
    let length = pdf.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .header(header::CONTENT_LENGTH, length)
        .body(Body::from(pdf))
        .map_err(|e| ApiError::Render(Error::Other(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_response_headers() {
        let resp = pdf_response(b"%PDF-1.4 body".to_vec(), "quote123.pdf").unwrap();
        let headers = resp.headers();

        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"quote123.pdf\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "13");
    }

    #[test]
    fn test_form_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_form(&headers));

        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(!is_form(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=UTF-8".parse().unwrap(),
        );
        assert!(is_form(&headers));
    }
}
