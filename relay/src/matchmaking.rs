//! The public pairing pipeline (single consumer over a bounded queue) and the private
//! rendezvous helpers (room-code publication and lookup).
//!
//! The public matcher holds two slots -- `client_slot` and `host_slot` -- exactly like the
//! relay this service is built from holds `clientID`/`hostID`; unlike that relay's in-memory
//! room/peer maps, users here are looked up through the shared [`Registry`] so the matcher
//! can run as a single long-lived task independent of any one connection's lifetime.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::pairing::{assign_pair, PairOutcome};
use crate::registry::Registry;

/// Sending end of the public-matchmaking queue. Cloned into every `/publicMatch` handler.
pub type PublicQueueSender = mpsc::Sender<String>;

/// Creates the bounded public-matchmaking queue.
pub fn public_queue(capacity: usize) -> (PublicQueueSender, mpsc::Receiver<String>) {
   mpsc::channel(capacity)
}

/// Runs the public matcher until the queue's senders are all dropped.
///
/// This is meant to be spawned once, for the lifetime of the process.
pub async fn run_public_matcher(
   registry: Arc<Registry>,
   mut queue: mpsc::Receiver<String>,
   close_deadline: Duration,
) {
   let mut client_slot: Option<String> = None;
   let mut host_slot: Option<String> = None;

   loop {
      if client_slot.is_none() {
         client_slot = match queue.recv().await {
            Some(id) => Some(id),
            None => return,
         };
      }
      if host_slot.is_none() {
         host_slot = match queue.recv().await {
            Some(id) => Some(id),
            None => return,
         };
      }

      if client_slot == host_slot {
         debug!(id = ?client_slot, "discarding self-pairing candidate");
         host_slot = None;
         continue;
      }

      let client_id = client_slot.clone().unwrap();
      let host_id = host_slot.clone().unwrap();

      let client = match registry.get_user(&client_id) {
         Some(user) => user,
         None => {
            client_slot = None;
            continue;
         }
      };
      let host = match registry.get_user(&host_id) {
         Some(user) => user,
         None => {
            host_slot = None;
            continue;
         }
      };

      match assign_pair(client, host, close_deadline).await {
         PairOutcome::Matched => {
            registry.stats.public_matches.fetch_add(1, Ordering::Relaxed);
            info!(client = %client_id, host = %host_id, "public match assigned");
            client_slot = None;
            host_slot = None;
         }
         PairOutcome::Survivor(user) => {
            if *user.is_host.lock().unwrap() {
               host_slot = Some(user.id.clone());
               client_slot = None;
            } else {
               client_slot = Some(user.id.clone());
               host_slot = None;
            }
         }
      }
   }
}

/// Publishes a room under `code`, pointing at `host_id`.
pub fn publish_room(registry: &Registry, code: String, host_id: String) {
   registry.rooms.insert(code, host_id);
}

/// Removes a room, if present.
pub fn remove_room(registry: &Registry, code: &str) {
   registry.rooms.remove(code);
}

/// Polls the rooms registry for `code`, at 1-second granularity, up to `attempts` times.
///
/// Returns the host's user id on a hit. The entry is left in place; the caller removes it
/// only after a successful pair assignment (see module-level docs on private rendezvous in
/// the specification this crate implements).
pub async fn poll_room(registry: &Registry, code: &str, attempts: u32) -> Option<String> {
   for attempt in 0..attempts {
      if let Some(host_id) = registry.rooms.get(code).map(|entry| entry.value().clone()) {
         return Some(host_id);
      }
      if attempt + 1 < attempts {
         tokio::time::sleep(Duration::from_secs(1)).await;
      }
   }
   None
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::idgen::generate_user_id;

   #[tokio::test]
   async fn matcher_pairs_two_distinct_waiters() {
      let registry = Arc::new(Registry::new());
      let a = generate_user_id(&registry).unwrap();
      registry.insert_user(a.clone());
      let b = generate_user_id(&registry).unwrap();
      registry.insert_user(b.clone());

      let (tx, rx) = public_queue(8);
      let matcher = tokio::spawn(run_public_matcher(Arc::clone(&registry), rx, Duration::from_secs(1)));

      tx.send(a.clone()).await.unwrap();
      tx.send(b.clone()).await.unwrap();

      // Give the matcher a chance to run; both users have no bound channel so the match
      // resolves immediately as a (discarded) survivor rather than hanging.
      tokio::time::sleep(Duration::from_millis(50)).await;
      drop(tx);
      let _ = matcher.await;
   }

   #[test]
   fn publish_and_poll_room_roundtrip_is_nonblocking_on_hit() {
      let registry = Registry::new();
      publish_room(&registry, "QRS4Z".to_string(), "user_HOST0001".to_string());
      assert_eq!(registry.rooms.get("QRS4Z").map(|e| e.clone()), Some("user_HOST0001".to_string()));
      remove_room(&registry, "QRS4Z");
      assert!(registry.rooms.get("QRS4Z").is_none());
   }
}
