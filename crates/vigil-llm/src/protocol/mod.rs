//! Wire format types for provider protocols
//!
//! Pure serde structs matching a provider's JSON API. They are only used at
//! the boundary; the rest of the crate works on [`crate::types`].

pub mod openai;
