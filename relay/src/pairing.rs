//! Pair assignment: given two live matchmaking channels, tells each peer who it was matched
//! with and closes both channels, or reports whichever peer survived a partial failure.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::SinkExt;
use matchlink_protocol::wire::MatchRecord;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::registry::User;

/// Outcome of a pair assignment attempt.
pub enum PairOutcome {
   /// Both peers were notified successfully; both channels have been closed.
   Matched,
   /// One peer's channel failed; the other is still viable and should be re-queued.
   Survivor(Arc<User>),
}

/// Sends `user` its match record. `User.channel` is a `tokio::sync::Mutex` rather than a
/// `std::sync::Mutex` precisely so this guard can be held across the `.await` below --
/// `assign_pair`'s future is spawned (indirectly, via the public matcher) with `tokio::spawn`,
/// which requires `Send`, and a `std::sync::MutexGuard` held across an await point is not.
async fn send_match_record(user: &User, matched_id: &str, is_host: bool) -> bool {
   let record = MatchRecord {
      id: user.id.clone(),
      matched_id: matched_id.to_string(),
      is_host,
   };
   let json = match serde_json::to_string(&record) {
      Ok(json) => json,
      Err(err) => {
         warn!(user = %user.id, %err, "failed to serialize match record");
         return false;
      }
   };

   let mut guard = user.channel.lock().await;
   let Some(sink) = guard.as_mut() else {
      let err = ServiceError::PeerGone;
      debug!(user = %user.id, %err, "peer channel already closed");
      return false;
   };
   match sink.send(Message::Text(json)).await {
      Ok(()) => true,
      Err(ws_err) => {
         let err = ServiceError::from(ws_err);
         debug!(user = %user.id, %err, "match record write failed");
         false
      }
   }
}

async fn close_channel(user: &User, close_deadline: Duration) {
   if let Some(mut sink) = user.take_channel().await {
      let _ = tokio::time::timeout(close_deadline, sink.send(Message::Close(None))).await;
   }
}

/// Assigns `host` as the host role and `client` as the client role, sends each their match
/// record, and closes both matchmaking channels on success.
///
/// On a write failure to either peer, the other peer (if its channel is still open) is
/// returned as the survivor so the caller can re-queue it; its channel is left open.
pub async fn assign_pair(client: Arc<User>, host: Arc<User>, close_deadline: Duration) -> PairOutcome {
   *host.is_host.lock().unwrap() = true;
   *client.matched_id.lock().unwrap() = host.id.clone();
   *host.matched_id.lock().unwrap() = client.id.clone();

   if !send_match_record(&client, &host.id, false).await {
      client.take_channel().await;
      debug!(client = %client.id, host = %host.id, "client write failed during pair assignment");
      return PairOutcome::Survivor(host);
   }

   if !send_match_record(&host, &client.id, true).await {
      host.take_channel().await;
      debug!(client = %client.id, host = %host.id, "host write failed during pair assignment");
      return PairOutcome::Survivor(client);
   }

   close_channel(&client, close_deadline).await;
   close_channel(&host, close_deadline).await;
   PairOutcome::Matched
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::registry::Registry;

   #[tokio::test]
   async fn matching_two_users_sets_reciprocal_ids() {
      let registry = Registry::new();
      let client = registry.insert_user("user_CLIENT1".to_string());
      let host = registry.insert_user("user_HOSTID1".to_string());

      // Neither user has a bound channel; sending fails immediately, so this exercises the
      // survivor path deterministically without a live socket.
      let outcome = assign_pair(Arc::clone(&client), Arc::clone(&host), Duration::from_secs(1)).await;
      assert!(matches!(outcome, PairOutcome::Survivor(_)));
      assert_eq!(*client.matched_id.lock().unwrap(), host.id);
      assert_eq!(*host.matched_id.lock().unwrap(), client.id);
      assert!(*host.is_host.lock().unwrap());
   }
}
