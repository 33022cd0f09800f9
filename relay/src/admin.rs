//! Lifecycle and admin HTTP handlers: user creation/deletion, socket teardown, and room-code
//! validity checks.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use matchlink_protocol::wire::{versions_compatible, CreatedUser, RoomCodeValidity};
use serde::Deserialize;
use tracing::info;

use crate::error::ServiceError;
use crate::idgen::generate_user_id;
use crate::matchmaking::remove_room;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct CreateUserQuery {
   pub v: String,
}

#[derive(Deserialize)]
pub struct UserRoomQuery {
   pub id: String,
   pub room: Option<String>,
}

#[derive(Deserialize)]
pub struct RoomCodeQuery {
   pub code: String,
}

pub async fn index() -> &'static str {
   "matchlink-relay is running"
}

pub async fn version(State(state): State<AppState>) -> String {
   format!("Version: {}\n", state.config.version)
}

pub async fn stats(State(state): State<AppState>) -> String {
   format!(
      "Players: {}\nPublic: {}\nPrivate: {}\n",
      state.registry.player_count(),
      state.registry.stats.public_matches.load(Ordering::Relaxed),
      state.registry.stats.private_matches.load(Ordering::Relaxed),
   )
}

pub async fn create_user(
   State(state): State<AppState>,
   Query(query): Query<CreateUserQuery>,
) -> Result<Json<CreatedUser>, StatusCode> {
   if !versions_compatible(&query.v, &state.config.version) {
      let err = ServiceError::VersionMismatch {
         client: query.v.clone(),
         server: state.config.version.clone(),
      };
      info!(%err, "rejecting createUser");
      return Err(err.status_code());
   }
   let id = generate_user_id(&state.registry).map_err(|err| err.status_code())?;
   state.registry.insert_user(id.clone());
   Ok(Json(CreatedUser { id }))
}

pub async fn delete_user(State(state): State<AppState>, Query(query): Query<UserRoomQuery>) -> StatusCode {
   let Some(_user) = state.registry.get_user(&query.id) else {
      let err = ServiceError::UnknownUser(query.id.clone());
      info!(%err, "rejecting deleteUser");
      return err.status_code();
   };
   state.registry.remove_user(&query.id);
   if let Some(room) = &query.room {
      remove_room(&state.registry, room);
   }
   StatusCode::OK
}

pub async fn close_socket(State(state): State<AppState>, Query(query): Query<UserRoomQuery>) -> StatusCode {
   let deadline = Duration::from_secs(state.config.close_deadline_secs);
   let Some(user) = state.registry.get_user(&query.id) else {
      let err = ServiceError::UnknownUser(query.id.clone());
      info!(%err, "rejecting closeSocket");
      return err.status_code();
   };
   if let Some(mut sink) = user.take_channel().await {
      tokio::spawn(async move {
         use axum::extract::ws::Message;
         use futures_util::SinkExt;
         let _ = tokio::time::timeout(deadline, sink.send(Message::Close(None))).await;
      });
   }
   if let Some(room) = &query.room {
      remove_room(&state.registry, room);
   }
   StatusCode::OK
}

pub async fn check_room_code(
   State(state): State<AppState>,
   Query(query): Query<RoomCodeQuery>,
) -> Json<RoomCodeValidity> {
   Json(RoomCodeValidity {
      is_valid: state.registry.rooms.contains_key(&query.code),
   })
}
