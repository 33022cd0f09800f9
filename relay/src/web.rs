//! Axum router assembly and the three WebSocket upgrade handlers.
//!
//! Route table, state sharing via `axum::extract::State`, and the `ws.on_upgrade` pattern
//! follow the HTTP/WebSocket layer of the IRC server this service borrows its transport from;
//! the per-connection state machines themselves (matchmaking, rendezvous, relay) are specific
//! to this service and live in their own modules.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use matchlink_protocol::wire::RoomCreated;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::ServiceError;
use crate::matchmaking::{poll_room, publish_room, remove_room, PublicQueueSender};
use crate::pairing::{assign_pair, PairOutcome};
use crate::registry::Registry;
use crate::signaling;
use crate::{admin, idgen};

#[derive(Clone)]
pub struct AppState {
   pub registry: Arc<Registry>,
   pub config: Arc<ServerConfig>,
   pub public_queue: PublicQueueSender,
}

pub fn router(state: AppState) -> Router {
   Router::new()
      .route("/", get(admin::index))
      .route("/version", get(admin::version))
      .route("/stats", get(admin::stats))
      .route("/createUser", get(admin::create_user))
      .route("/deleteUser", get(admin::delete_user))
      .route("/closeSocket", get(admin::close_socket))
      .route("/checkRoomCode", get(admin::check_room_code))
      .route("/publicMatch", get(public_match_upgrade))
      .route("/privateMatch", get(private_match_upgrade))
      .route("/rtcSetup", get(rtc_setup_upgrade))
      .layer(CorsLayer::permissive())
      .with_state(state)
}

fn header(headers: &HeaderMap, name: &'static str) -> Result<String, ServiceError> {
   headers
      .get(name)
      .and_then(|value| value.to_str().ok())
      .map(str::to_string)
      .ok_or(ServiceError::MissingParameter(name))
}

async fn public_match_upgrade(
   ws: WebSocketUpgrade,
   State(state): State<AppState>,
   headers: HeaderMap,
) -> impl IntoResponse {
   let id = match header(&headers, "id") {
      Ok(id) => id,
      Err(err) => {
         debug!(%err, "rejecting publicMatch upgrade");
         return err.status_code().into_response();
      }
   };
   ws.on_upgrade(move |socket| handle_public_match(socket, state, id)).into_response()
}

async fn handle_public_match(socket: WebSocket, state: AppState, user_id: String) {
   let Some(user) = state.registry.get_user(&user_id) else {
      let err = ServiceError::UnknownUser(user_id);
      debug!(%err, "rejecting publicMatch: unknown user");
      return;
   };
   let (sink, mut stream) = socket.split();
   user.bind_channel(sink).await;

   if state.public_queue.send(user_id).await.is_err() {
      warn!("public matchmaking queue is closed");
      user.take_channel().await;
      return;
   }

   // Parked until the matcher sends the match record and closes this channel.
   while stream.next().await.is_some() {}
   user.take_channel().await;
}

async fn private_match_upgrade(
   ws: WebSocketUpgrade,
   State(state): State<AppState>,
   headers: HeaderMap,
) -> impl IntoResponse {
   let id = match header(&headers, "id") {
      Ok(id) => id,
      Err(err) => {
         debug!(%err, "rejecting privateMatch upgrade");
         return err.status_code().into_response();
      }
   };
   let room_code = header(&headers, "room-code").ok();
   ws.on_upgrade(move |socket| handle_private_match(socket, state, id, room_code)).into_response()
}

async fn handle_private_match(socket: WebSocket, state: AppState, user_id: String, room_code: Option<String>) {
   let Some(user) = state.registry.get_user(&user_id) else {
      let err = ServiceError::UnknownUser(user_id);
      debug!(%err, "rejecting privateMatch: unknown user");
      return;
   };
   let (sink, mut stream) = socket.split();
   user.bind_channel(sink).await;

   match room_code {
      None => {
         let code = match idgen::generate_room_code(&state.registry) {
            Ok(code) => code,
            Err(err) => {
               warn!(%err, "rejecting privateMatch host: room code generation failed");
               user.take_channel().await;
               return;
            }
         };
         *user.is_host.lock().unwrap() = true;

         let sent = {
            let record = RoomCreated { room_code: code.clone() };
            let json = serde_json::to_string(&record).expect("RoomCreated is always serializable");
            let mut guard = user.channel.lock().await;
            match guard.as_mut() {
               Some(sink) => sink.send(Message::Text(json)).await.is_ok(),
               None => false,
            }
         };
         if !sent {
            user.take_channel().await;
            return;
         }

         publish_room(&state.registry, code.clone(), user_id);
         while stream.next().await.is_some() {}
         user.take_channel().await;
         remove_room(&state.registry, &code);
      }
      Some(code) => {
         let Some(host_id) = poll_room(&state.registry, &code, state.config.poll_attempts).await else {
            let err = ServiceError::UnknownRoom(code);
            debug!(%err, "rejecting privateMatch join: room never appeared");
            user.take_channel().await;
            return;
         };
         let Some(host) = state.registry.get_user(&host_id) else {
            let err = ServiceError::UnknownUser(host_id);
            debug!(%err, "rejecting privateMatch join: host no longer registered");
            user.take_channel().await;
            return;
         };

         let close_deadline = Duration::from_secs(state.config.close_deadline_secs);
         if let PairOutcome::Matched = assign_pair(user, host, close_deadline).await {
            remove_room(&state.registry, &code);
            state.registry.stats.private_matches.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
         }
      }
   }
}

async fn rtc_setup_upgrade(
   ws: WebSocketUpgrade,
   State(state): State<AppState>,
   headers: HeaderMap,
) -> impl IntoResponse {
   let login_id = match header(&headers, "login-id") {
      Ok(id) => id,
      Err(err) => {
         debug!(%err, "rejecting rtcSetup upgrade");
         return err.status_code().into_response();
      }
   };
   let matched_id = match header(&headers, "matched-user-id") {
      Ok(id) => id,
      Err(err) => {
         debug!(%err, "rejecting rtcSetup upgrade");
         return err.status_code().into_response();
      }
   };
   ws.on_upgrade(move |socket| handle_rtc_setup(socket, state, login_id, matched_id)).into_response()
}

async fn handle_rtc_setup(socket: WebSocket, state: AppState, login_id: String, matched_id: String) {
   let is_host = state
      .registry
      .get_user(&login_id)
      .map(|user| *user.is_host.lock().unwrap())
      .unwrap_or(false);

   let (sink, stream) = socket.split();
   let close_deadline = Duration::from_secs(state.config.close_deadline_secs);

   if is_host {
      signaling::register_host(&state.registry, login_id, sink, stream).await;
   } else {
      signaling::run_signaling_client(
         Arc::clone(&state.registry),
         sink,
         stream,
         matched_id,
         state.config.poll_attempts,
         close_deadline,
      )
      .await;
   }
}
