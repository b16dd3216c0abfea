//! Game implementations.
//!
//! - [`holdem`]: 3-handed no-limit hold'em with a five-action vocabulary

pub mod holdem;
