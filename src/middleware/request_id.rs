use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the request id in and out of the service
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for one request, minted here unless the caller sent one
#[derive(Clone, Copy, Debug)]
pub struct RequestId(Uuid);

impl RequestId {
    fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(RequestId)
            .unwrap_or_else(|| RequestId(Uuid::new_v4()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Attaches a request id to the request extensions and echoes it back on
/// the response, so one id ties client logs to ours
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(request.headers());
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Span for the trace layer; carries the id the middleware attached
pub fn make_request_span(request: &Request<Body>) -> tracing::Span {
    match request.extensions().get::<RequestId>() {
        Some(request_id) => tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        ),
        None => tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_id_sent_by_the_caller() {
        let sent = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(&sent.to_string()).unwrap(),
        );

        let request_id = RequestId::from_headers(&headers);
        assert_eq!(request_id.to_string(), sent.to_string());
    }

    #[test]
    fn test_mints_id_when_header_is_missing_or_garbled() {
        let empty = HeaderMap::new();
        let minted = RequestId::from_headers(&empty);
        assert!(Uuid::parse_str(&minted.to_string()).is_ok());

        let mut garbled = HeaderMap::new();
        garbled.insert(REQUEST_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let replaced = RequestId::from_headers(&garbled);
        assert!(Uuid::parse_str(&replaced.to_string()).is_ok());
    }
}
