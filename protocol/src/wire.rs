//! JSON wire types for matchmaking and signaling.
//!
//! Unlike [`crate::relay`], which frames fixed-size binary packets for the paint canvas
//! protocol, these types are serialized as plain JSON text frames. The matchmaking and
//! signaling endpoints never share a connection with the painting protocol, so there is no
//! need to unify the two wire formats.

use serde::{Deserialize, Serialize};

/// Length of a generated user ID, not counting the `user_` prefix.
pub const USER_ID_LEN: usize = 8;

/// Length of a generated room code.
pub const ROOM_CODE_LEN: usize = 5;

/// Alphabet used for both user IDs and room codes: upper-case alphanumerics, minus `I` to
/// avoid confusion with `1` when read aloud or copied by hand.
pub const ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ0123456789";

/// Prefix prepended to every generated user ID.
pub const USER_ID_PREFIX: &str = "user_";

/// Sent by the server once a pair has been assigned, over the matchmaking channel.
///
/// Delivered to both members of a pair; `is_host` differs between them.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MatchRecord {
   pub id: String,
   pub matched_id: String,
   pub is_host: bool,
}

/// Sent by the server to a private-match host once a room code has been allocated.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RoomCreated {
   pub room_code: String,
}

/// Response body of `GET /createUser`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CreatedUser {
   pub id: String,
}

/// Response body of `GET /checkRoomCode`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RoomCodeValidity {
   pub is_valid: bool,
}

/// Returns whether two protocol version strings agree on major and minor components.
///
/// Patch versions may drift freely; this mirrors the version check the matchmaking service
/// performs on `GET /createUser?v=`.
pub fn versions_compatible(a: &str, b: &str) -> bool {
   fn major_minor(v: &str) -> Option<(&str, &str)> {
      let mut parts = v.split('.');
      let major = parts.next()?;
      let minor = parts.next()?;
      Some((major, minor))
   }
   match (major_minor(a), major_minor(b)) {
      (Some(x), Some(y)) => x == y,
      _ => false,
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn versions_compatible_ignores_patch() {
      assert!(versions_compatible("1.2.0", "1.2.9"));
      assert!(!versions_compatible("1.2.0", "1.3.0"));
      assert!(!versions_compatible("1.2.0", "2.2.0"));
   }

   #[test]
   fn versions_compatible_rejects_malformed() {
      assert!(!versions_compatible("1", "1.2"));
      assert!(!versions_compatible("", "1.2.0"));
   }

   #[test]
   fn match_record_round_trips_through_json() {
      let record = MatchRecord {
         id: "user_ABCD1234".to_string(),
         matched_id: "user_WXYZ5678".to_string(),
         is_host: true,
      };
      let json = serde_json::to_string(&record).unwrap();
      let decoded: MatchRecord = serde_json::from_str(&json).unwrap();
      assert_eq!(record, decoded);
   }
}
