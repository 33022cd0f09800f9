//! Top-level server lifecycle: wires the registry, the public matcher, and the HTTP/WS
//! router together and serves them on the configured listener.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::config::ServerConfig;
use crate::matchmaking::{public_queue, run_public_matcher};
use crate::registry::Registry;
use crate::web::{self, AppState};

pub struct Server {
   config: Arc<ServerConfig>,
}

impl Server {
   pub fn new(config: ServerConfig) -> Self {
      Self { config: Arc::new(config) }
   }

   pub async fn run(self) -> Result<()> {
      let registry = Arc::new(Registry::new());
      let (sender, receiver) = public_queue(self.config.queue_capacity);
      let close_deadline = Duration::from_secs(self.config.close_deadline_secs);

      tokio::spawn(run_public_matcher(Arc::clone(&registry), receiver, close_deadline));

      let state = AppState {
         registry,
         config: Arc::clone(&self.config),
         public_queue: sender,
      };
      let app = web::router(state);

      let listener = tokio::net::TcpListener::bind(&self.config.listen_addr).await?;
      info!(addr = %self.config.listen_addr, "matchmaking and relay service listening");
      axum::serve(listener, app).await?;
      Ok(())
   }
}
