//! Wire types shared between the matchmaking/relay service and its clients.

pub mod wire;
