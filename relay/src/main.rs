use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
   let json_logs = std::env::var("MATCHLINK_LOG_JSON").unwrap_or_default() == "1";
   let filter = EnvFilter::from_default_env().add_directive("matchlink_relay=info".parse()?);
   if json_logs {
      tracing_subscriber::fmt().with_env_filter(filter).json().init();
   } else {
      tracing_subscriber::fmt().with_env_filter(filter).init();
   }

   let config = matchlink_relay::config::ServerConfig::parse();
   tracing::info!("Starting matchmaking and relay service on {}", config.listen_addr);

   let server = matchlink_relay::server::Server::new(config);
   server.run().await
}
