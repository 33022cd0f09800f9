//! Random user ID and room code generation.
//!
//! Mirrors the bounded-retry collision handling the relay this service is built from uses
//! for room and peer IDs (`find_room_id`/`allocate_peer_id`), adapted to the alphabet and
//! lengths this protocol specifies and to the registry's key space instead of a fixed-size
//! set.

use matchlink_protocol::wire::{ID_ALPHABET, ROOM_CODE_LEN, USER_ID_LEN, USER_ID_PREFIX};

use crate::error::{ServiceError, Result};
use crate::registry::Registry;

/// Number of attempts made to find a free ID before giving up.
const MAX_ATTEMPTS: u32 = 50;

fn random_string(len: usize) -> String {
   (0..len)
      .map(|_| ID_ALPHABET[fastrand::usize(..ID_ALPHABET.len())] as char)
      .collect()
}

/// Generates a user ID of the form `user_XXXXXXXX` that is not already present in the
/// registry's users map.
pub fn generate_user_id(registry: &Registry) -> Result<String> {
   for _ in 0..MAX_ATTEMPTS {
      let candidate = format!("{USER_ID_PREFIX}{}", random_string(USER_ID_LEN));
      if !registry.users.contains_key(&candidate) {
         return Ok(candidate);
      }
   }
   Err(ServiceError::IdSpaceExhausted)
}

/// Generates a room code that is not already present in the registry's rooms map.
pub fn generate_room_code(registry: &Registry) -> Result<String> {
   for _ in 0..MAX_ATTEMPTS {
      let candidate = random_string(ROOM_CODE_LEN);
      if !registry.rooms.contains_key(&candidate) {
         return Ok(candidate);
      }
   }
   Err(ServiceError::IdSpaceExhausted)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn user_ids_have_expected_shape() {
      let registry = Registry::new();
      let id = generate_user_id(&registry).unwrap();
      assert!(id.starts_with(USER_ID_PREFIX));
      assert_eq!(id.len(), USER_ID_PREFIX.len() + USER_ID_LEN);
      assert!(id[USER_ID_PREFIX.len()..].bytes().all(|b| ID_ALPHABET.contains(&b)));
   }

   #[test]
   fn room_codes_have_expected_length() {
      let registry = Registry::new();
      let code = generate_room_code(&registry).unwrap();
      assert_eq!(code.len(), ROOM_CODE_LEN);
   }

   #[test]
   fn generation_avoids_existing_ids() {
      let registry = Registry::new();
      registry.insert_user("user_AAAAAAAA".to_string());
      for _ in 0..200 {
         let id = generate_user_id(&registry).unwrap();
         assert_ne!(id, "user_AAAAAAAA");
         registry.insert_user(id);
      }
   }

   #[test]
   fn id_alphabet_excludes_ambiguous_letter() {
      assert!(!ID_ALPHABET.contains(&b'I'));
   }
}
