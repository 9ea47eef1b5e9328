//! Middleware for logging requests and responses.

use axum::{extract::Request, http::header::CONTENT_TYPE, middleware::Next, response::Response};

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body_text) = extract_header_and_body_text_from_request(request).await;

    let is_json = headers
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        let display_text = redact_password(&body_text, "password");
        log_request(&headers, &display_text);
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, body_text.into());
    let response = next.run(request).await;

    let (headers, body_text) = extract_header_and_body_text_from_response(response).await;
    log_response(&headers, &body_text);

    Response::from_parts(headers, body_text.into())
}

/// Replace the string value of `field_name` in a JSON body with asterisks.
fn redact_password(body_text: &str, field_name: &str) -> String {
    let key = format!("\"{field_name}\"");
    let Some(key_start) = body_text.find(&key) else {
        return body_text.to_string();
    };

    let after_key = &body_text[key_start + key.len()..];
    let Some(value_offset) = after_key.find('"') else {
        return body_text.to_string();
    };
    let value_start = key_start + key.len() + value_offset + 1;

    let Some(value_length) = body_text[value_start..].find('"') else {
        return body_text.to_string();
    };

    format!(
        "{}********{}",
        &body_text[..value_start],
        &body_text[value_start + value_length..]
    )
}

async fn extract_header_and_body_text_from_request(
    request: Request,
) -> (axum::http::request::Parts, String) {
    let (headers, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> (axum::http::response::Parts, String) {
    let (headers, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (headers, String::from_utf8_lossy(&body_bytes).to_string())
}

const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Truncate `body` to at most `limit` bytes without splitting a multi-byte
/// character, e.g. an emoji category icon straddling the limit.
fn truncate_to_char_boundary(body: &str, limit: usize) -> &str {
    if body.len() <= limit {
        return body;
    }

    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            truncate_to_char_boundary(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            truncate_to_char_boundary(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod truncation_tests {
    use axum::extract::Request;

    use super::{LOG_BODY_LENGTH_LIMIT, log_request, truncate_to_char_boundary};

    #[test]
    fn short_bodies_are_untouched() {
        assert_eq!(truncate_to_char_boundary("hello", 64), "hello");
    }

    #[test]
    fn truncation_backs_up_to_a_char_boundary() {
        // 63 ASCII bytes followed by a four-byte emoji spanning bytes 63..67,
        // so a naive slice at 64 would split the character.
        let body = format!("{}🛒food", "x".repeat(63));
        assert!(!body.is_char_boundary(64));

        let truncated = truncate_to_char_boundary(&body, 64);

        assert_eq!(truncated, "x".repeat(63));
    }

    #[test]
    fn truncation_keeps_a_char_that_ends_on_the_limit() {
        let body = format!("{}🛒food", "x".repeat(60));

        let truncated = truncate_to_char_boundary(&body, 64);

        assert_eq!(truncated, format!("{}🛒", "x".repeat(60)));
    }

    #[test]
    fn logging_a_long_body_with_emoji_does_not_panic() {
        let (parts, _body) = Request::new(axum::body::Body::empty()).into_parts();
        let body = format!("{}🛒food", "x".repeat(LOG_BODY_LENGTH_LIMIT - 1));

        let subscriber = tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(subscriber, || log_request(&parts, &body));
    }
}
