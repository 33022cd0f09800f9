//! The session registry: users, private rooms, and hosts registered for signaling.
//!
//! Each map supports only single-key operations (lookup, insert, remove) so that different
//! users never contend on each other's entries; this mirrors the `Rooms`/`Peers` split in
//! the relay this service is built from, generalized to run under a sharded concurrent map
//! instead of a single `Mutex` guarding the whole state.

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::sync::oneshot;
use tokio::sync::Mutex as AsyncMutex;

pub type WsSink = SplitSink<WebSocket, Message>;
pub type WsStream = SplitStream<WebSocket>;

/// A shared, lockable signaling/matchmaking write half. A `tokio::sync::Mutex` so that its
/// guard is `Send` and can be held across the `.await` of a socket write -- a `std::sync::
/// Mutex` guard cannot, which would make any future holding it across an await non-`Send` and
/// therefore unusable with `tokio::spawn`.
pub type SharedSink = Arc<AsyncMutex<Option<WsSink>>>;

/// A registered user. Created by `/createUser`, mutated on each matchmaking attempt, and
/// destroyed by `/deleteUser`.
pub struct User {
   pub id: String,
   pub is_host: Mutex<bool>,
   pub matched_id: Mutex<String>,
   /// The write half of the user's currently open matchmaking channel, if any. Taken (never
   /// cloned) by whoever sends the match record, so a channel can be claimed for writing at
   /// most once.
   pub channel: AsyncMutex<Option<WsSink>>,
}

impl User {
   fn new(id: String) -> Self {
      Self {
         id,
         is_host: Mutex::new(false),
         matched_id: Mutex::new(String::new()),
         channel: AsyncMutex::new(None),
      }
   }

   /// Resets matchmaking state and binds a freshly opened channel, superseding any channel
   /// that was previously bound.
   pub async fn bind_channel(&self, sink: WsSink) {
      *self.is_host.lock().unwrap() = false;
      *self.matched_id.lock().unwrap() = String::new();
      *self.channel.lock().await = Some(sink);
   }

   pub async fn take_channel(&self) -> Option<WsSink> {
      self.channel.lock().await.take()
   }
}

/// One half of a signaling connection registered by a host, awaiting its matched client.
///
/// The stream (read) half is claimed exactly once via [`RegisteredHost::take_stream`]; the
/// sink (write) half is shared with the forwarder that writes to the host. The entry itself
/// is only ever removed by the host-direction forwarder (see `signaling.rs`) -- a client's
/// poll is a non-destructive read, so a host that is still mid-registration is never torn
/// out from under a racing lookup.
pub struct RegisteredHost {
   stream: Mutex<Option<WsStream>>,
   pub sink: SharedSink,
   done: Mutex<Option<oneshot::Sender<()>>>,
}

impl RegisteredHost {
   pub fn new(stream: WsStream, sink: WsSink, done: oneshot::Sender<()>) -> Arc<Self> {
      Arc::new(Self {
         stream: Mutex::new(Some(stream)),
         sink: Arc::new(AsyncMutex::new(Some(sink))),
         done: Mutex::new(Some(done)),
      })
   }

   pub fn take_stream(&self) -> Option<WsStream> {
      self.stream.lock().unwrap().take()
   }

   /// Signals the parked host handler that the relay for this host has concluded. Called
   /// once, by the host-direction forwarder, right before it removes the registry entry.
   pub fn signal_done(&self) {
      if let Some(tx) = self.done.lock().unwrap().take() {
         let _ = tx.send(());
      }
   }
}

/// Process-wide counters backing `GET /stats`.
#[derive(Default)]
pub struct Stats {
   pub public_matches: AtomicU64,
   pub private_matches: AtomicU64,
}

/// The full session registry shared by every connection handler and the public matcher.
pub struct Registry {
   pub users: DashMap<String, Arc<User>>,
   pub rooms: DashMap<String, String>,
   pub registered_hosts: DashMap<String, Arc<RegisteredHost>>,
   pub stats: Stats,
}

impl Registry {
   pub fn new() -> Self {
      Self {
         users: DashMap::new(),
         rooms: DashMap::new(),
         registered_hosts: DashMap::new(),
         stats: Stats::default(),
      }
   }

   pub fn insert_user(&self, id: String) -> Arc<User> {
      let user = Arc::new(User::new(id.clone()));
      self.users.insert(id, Arc::clone(&user));
      user
   }

   pub fn get_user(&self, id: &str) -> Option<Arc<User>> {
      self.users.get(id).map(|entry| Arc::clone(entry.value()))
   }

   pub fn remove_user(&self, id: &str) {
      self.users.remove(id);
   }

   pub fn player_count(&self) -> usize {
      self.users.len()
   }
}

impl Default for Registry {
   fn default() -> Self {
      Self::new()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn insert_and_lookup_user() {
      let registry = Registry::new();
      registry.insert_user("user_AAAAAAAA".to_string());
      assert!(registry.get_user("user_AAAAAAAA").is_some());
      assert!(registry.get_user("user_BBBBBBBB").is_none());
   }

   #[test]
   fn remove_user_clears_lookup() {
      let registry = Registry::new();
      registry.insert_user("user_AAAAAAAA".to_string());
      registry.remove_user("user_AAAAAAAA");
      assert!(registry.get_user("user_AAAAAAAA").is_none());
   }

   #[test]
   fn rooms_are_independent_of_users() {
      let registry = Registry::new();
      registry.rooms.insert("QRS4Z".to_string(), "user_AAAAAAAA".to_string());
      assert_eq!(registry.rooms.get("QRS4Z").map(|e| e.clone()), Some("user_AAAAAAAA".to_string()));
      registry.rooms.remove("QRS4Z");
      assert!(registry.rooms.get("QRS4Z").is_none());
   }
}
