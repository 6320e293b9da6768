//! Conversion of rejected responses into structured errors.

use reqwest::StatusCode;

use crate::error::{ApiErrorResponse, HlbError};

/// Backend envelope when the body carries one, otherwise a bare HTTP error.
pub fn error_from_response(status: StatusCode, body: &str) -> HlbError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(envelope) => HlbError::Backend {
            status: status.as_u16(),
            code: envelope.code,
            message: envelope.message,
        },
        Err(_) => HlbError::Http {
            status: status.as_u16(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_is_preserved() {
        let err = error_from_response(
            StatusCode::BAD_REQUEST,
            r#"{"code": 4001, "message": "subnet not found"}"#,
        );
        match err {
            HlbError::Backend {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, 4001);
                assert_eq!(message, "subnet not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_envelope_bodies_are_generic() {
        for body in ["", "<html>bad gateway</html>", r#"{"error": "nope"}"#, r#"{"code": "x", "message": "y"}"#] {
            let err = error_from_response(StatusCode::BAD_GATEWAY, body);
            assert!(matches!(err, HlbError::Http { status: 502 }), "body {:?}", body);
            assert_eq!(err.to_string(), "API request failed with HTTP 502");
        }
    }
}
