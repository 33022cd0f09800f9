//! Typed errors for the matchmaking and relay service.

use thiserror::Error;

/// Errors that can occur while handling a request.
///
/// These are never surfaced directly to a peer; HTTP handlers translate them into status
/// codes, and WebSocket handlers translate them into teardown (see the error handling design
/// in the specification this crate implements).
#[derive(Debug, Error)]
pub enum ServiceError {
   #[error("no user with id `{0}`")]
   UnknownUser(String),

   #[error("no room with code `{0}`")]
   UnknownRoom(String),

   #[error("client version `{client}` is incompatible with server version `{server}`")]
   VersionMismatch { client: String, server: String },

   #[error("missing required header or query parameter `{0}`")]
   MissingParameter(&'static str),

   #[error("exhausted retry attempts generating a unique identifier")]
   IdSpaceExhausted,

   #[error("the peer's channel was already closed")]
   PeerGone,

   #[error(transparent)]
   Ws(#[from] axum::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
   /// Maps this error to the HTTP status code an admin/matchmaking endpoint should respond
   /// with, per the error handling design in the specification this crate implements.
   pub fn status_code(&self) -> axum::http::StatusCode {
      use axum::http::StatusCode;
      match self {
         ServiceError::UnknownUser(_)
         | ServiceError::UnknownRoom(_)
         | ServiceError::VersionMismatch { .. }
         | ServiceError::MissingParameter(_) => StatusCode::BAD_REQUEST,
         ServiceError::IdSpaceExhausted | ServiceError::PeerGone | ServiceError::Ws(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
         }
      }
   }
}
