//! The signaling relay: forwards opaque JSON messages between two paired peers once each has
//! reconnected on its own signaling channel.
//!
//! Teardown is split asymmetrically between the two forwarder directions so they never race
//! on the same cleanup: the client-direction forwarder closes both peers' channels, and the
//! host-direction forwarder alone removes the host's entry from the registered-hosts index.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::registry::{Registry, RegisteredHost, SharedSink, WsSink, WsStream};

async fn close_shared(sink: &SharedSink, deadline: Duration) {
   let taken = sink.lock().await.take();
   if let Some(mut sink) = taken {
      let _ = tokio::time::timeout(deadline, sink.send(Message::Close(None))).await;
   }
}

/// Parks a newly opened host-role signaling channel in the registered-hosts index and waits
/// until the relay for it concludes.
pub async fn register_host(registry: &Registry, host_id: String, sink: WsSink, stream: WsStream) {
   let (done_tx, done_rx) = oneshot::channel();
   let entry = RegisteredHost::new(stream, sink, done_tx);
   registry.registered_hosts.insert(host_id.clone(), entry);
   info!(host = %host_id, "registered host awaiting signaling partner");
   let _ = done_rx.await;
   debug!(host = %host_id, "host signaling handler returning");
}

/// Polls the registered-hosts index for `host_id`, at 1-second granularity, up to `attempts`
/// times. This is a non-destructive read: the entry remains visible to any other lookup, and
/// is removed only by the host-direction forwarder once the relay actually concludes.
async fn poll_registered_host(registry: &Registry, host_id: &str, attempts: u32) -> Option<Arc<RegisteredHost>> {
   for attempt in 0..attempts {
      if let Some(entry) = registry.registered_hosts.get(host_id).map(|e| Arc::clone(e.value())) {
         return Some(entry);
      }
      if attempt + 1 < attempts {
         tokio::time::sleep(Duration::from_secs(1)).await;
      }
   }
   None
}

async fn client_direction_forwarder(
   mut from: WsStream,
   to: SharedSink,
   own_sink: SharedSink,
   close_deadline: Duration,
   ready: mpsc::Sender<()>,
) {
   let _ = ready.send(()).await;
   loop {
      match from.next().await {
         Some(Ok(Message::Text(text))) => {
            let mut guard = to.lock().await;
            let Some(sink) = guard.as_mut() else { break };
            if sink.send(Message::Text(text)).await.is_err() {
               break;
            }
         }
         Some(Ok(Message::Binary(data))) => {
            let mut guard = to.lock().await;
            let Some(sink) = guard.as_mut() else { break };
            if sink.send(Message::Binary(data)).await.is_err() {
               break;
            }
         }
         Some(Ok(Message::Close(_))) | None => break,
         Some(Ok(_)) => continue,
         Some(Err(err)) => {
            let err = ServiceError::from(err);
            warn!(%err, "client-direction forwarder read error");
            break;
         }
      }
   }
   close_shared(&own_sink, close_deadline).await;
   close_shared(&to, close_deadline).await;
}

async fn host_direction_forwarder(
   mut from: WsStream,
   to: SharedSink,
   registry: Arc<Registry>,
   host_id: String,
   host_entry: Arc<RegisteredHost>,
   ready: mpsc::Sender<()>,
) {
   let _ = ready.send(()).await;
   loop {
      match from.next().await {
         Some(Ok(Message::Text(text))) => {
            let mut guard = to.lock().await;
            let Some(sink) = guard.as_mut() else { break };
            if sink.send(Message::Text(text)).await.is_err() {
               break;
            }
         }
         Some(Ok(Message::Binary(data))) => {
            let mut guard = to.lock().await;
            let Some(sink) = guard.as_mut() else { break };
            if sink.send(Message::Binary(data)).await.is_err() {
               break;
            }
         }
         Some(Ok(Message::Close(_))) | None => break,
         Some(Ok(_)) => continue,
         Some(Err(err)) => {
            let err = ServiceError::from(err);
            warn!(%err, "host-direction forwarder read error");
            break;
         }
      }
   }
   registry.registered_hosts.remove(&host_id);
   host_entry.signal_done();
}

/// Drives the client-role side of a signaling connection: claims the registered host's read
/// half, spawns both forwarders, and returns once both have signaled they are running.
pub async fn run_signaling_client(
   registry: Arc<Registry>,
   sink: WsSink,
   stream: WsStream,
   host_id: String,
   poll_attempts: u32,
   close_deadline: Duration,
) {
   let client_sink: SharedSink = Arc::new(Mutex::new(Some(sink)));

   let Some(host_entry) = poll_registered_host(&registry, &host_id, poll_attempts).await else {
      let err = ServiceError::UnknownUser(host_id.clone());
      debug!(%err, "no host registered within poll window");
      close_shared(&client_sink, close_deadline).await;
      return;
   };

   let Some(host_stream) = host_entry.take_stream() else {
      warn!(host = %host_id, "host stream already claimed");
      close_shared(&client_sink, close_deadline).await;
      return;
   };
   let host_sink = Arc::clone(&host_entry.sink);

   let (ready_tx, mut ready_rx) = mpsc::channel::<()>(2);

   tokio::spawn(client_direction_forwarder(
      stream,
      Arc::clone(&host_sink),
      Arc::clone(&client_sink),
      close_deadline,
      ready_tx.clone(),
   ));
   tokio::spawn(host_direction_forwarder(
      host_stream,
      Arc::clone(&client_sink),
      Arc::clone(&registry),
      host_id.clone(),
      Arc::clone(&host_entry),
      ready_tx,
   ));

   ready_rx.recv().await;
   ready_rx.recv().await;
   info!(host = %host_id, "signaling relay established");
}

#[cfg(test)]
mod tests {
   use super::*;

   #[tokio::test]
   async fn poll_registered_host_misses_when_never_registered() {
      let registry = Registry::new();
      let found = poll_registered_host(&registry, "user_GHOST001", 2).await;
      assert!(found.is_none());
   }
}
