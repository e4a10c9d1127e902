//! Idempotency rules for side-effecting operations.
//!
//! A money-moving request carries a client key. The first successful
//! response for `(key, actor)` is cached; later requests with the same pair
//! receive that cached response instead of repeating the side effect.

pub mod error;
pub mod types;

pub use error::IdempotencyError;
pub use types::{
    IdempotencyKey, IdempotencyRecord, MAX_KEY_LEN, decode_response, encode_response,
    ttl_from_secs,
};
