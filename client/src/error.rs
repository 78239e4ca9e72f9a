//! Errors that end or prevent a session

use shared::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ClientEnvelope, ClientMessage};

    fn encode_for_send(envelope: &ClientEnvelope) -> Result<String, ClientError> {
        Ok(envelope.encode()?)
    }

    #[test]
    fn test_protocol_errors_convert() {
        let envelope = ClientEnvelope::new("p1", ClientMessage::StartGame {});
        assert!(encode_for_send(&envelope).is_ok());

        let err = ClientError::from(shared::decode("[]").unwrap_err());
        assert!(matches!(err, ClientError::Protocol(ProtocolError::NotAnObject)));
        assert_eq!(err.to_string(), ProtocolError::NotAnObject.to_string());
    }

    #[test]
    fn test_connection_lost_message() {
        let err = ClientError::ConnectionLost("closed by server".to_string());
        assert_eq!(err.to_string(), "connection lost: closed by server");
    }
}
