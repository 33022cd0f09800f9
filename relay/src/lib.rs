//! Peer matchmaking and WebRTC signaling relay service.

pub mod admin;
pub mod config;
pub mod error;
pub mod idgen;
pub mod matchmaking;
pub mod pairing;
pub mod registry;
pub mod server;
pub mod signaling;
pub mod web;
