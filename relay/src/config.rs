//! Process configuration, parsed once at startup.

use clap::Parser;

/// Command-line / environment configuration for the matchmaking and relay service.
#[derive(Parser, Debug, Clone)]
#[command(name = "matchlink-relay", about = "Peer matchmaking and WebRTC signaling relay")]
pub struct ServerConfig {
   /// Address to bind the HTTP/WebSocket listener to.
   #[arg(long, default_value = "0.0.0.0:8080", env = "MATCHLINK_LISTEN_ADDR")]
   pub listen_addr: String,

   /// Capacity of the public-matchmaking waiting queue.
   #[arg(long, default_value_t = 1000, env = "MATCHLINK_QUEUE_CAPACITY")]
   pub queue_capacity: usize,

   /// Number of 1-second polling attempts before a private-rendezvous join or a signaling
   /// client gives up waiting for its partner.
   #[arg(long, default_value_t = 10, env = "MATCHLINK_POLL_ATTEMPTS")]
   pub poll_attempts: u32,

   /// Write deadline, in seconds, applied when sending a close control frame during teardown.
   #[arg(long, default_value_t = 30, env = "MATCHLINK_CLOSE_DEADLINE_SECS")]
   pub close_deadline_secs: u64,

   /// Server version reported by `/version` and matched (major.minor) against client-supplied
   /// versions in `/createUser`.
   #[arg(long, default_value = env!("CARGO_PKG_VERSION"), env = "MATCHLINK_VERSION")]
   pub version: String,
}
