//! HTTP and WebSocket clients for the Parigo APIs.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest` and `tokio-tungstenite`.

mod stream;
mod user;

pub use stream::{EventStream, connect_user_stream};
pub use user::UserClient;

use reqwest::StatusCode;

use crate::optimistic::MutationError;

/// Errors produced by the SDK clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket-level failure.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Map a client error onto the optimistic-mutation taxonomy: 4xx responses
/// are business-rule rejections, everything else means the outcome was
/// never confirmed.
impl From<ClientError> for MutationError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, body } if status.is_client_error() => {
                MutationError::Rejected {
                    message: extract_error_message(&body),
                }
            }
            other => MutationError::Transport {
                message: other.to_string(),
            },
        }
    }
}

/// Pull the `error` field out of a JSON error body, falling back to the
/// raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_comes_from_error_body() {
        let err = ClientError::Api {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: r#"{"error":"insufficient balance"}"#.into(),
        };
        let mutation_err = MutationError::from(err);
        assert!(mutation_err.is_business_rule());
        assert_eq!(
            mutation_err,
            MutationError::Rejected {
                message: "insufficient balance".into()
            }
        );
    }

    #[test]
    fn server_errors_map_to_transport() {
        let err = ClientError::Api {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream died".into(),
        };
        assert!(!MutationError::from(err).is_business_rule());
    }
}
