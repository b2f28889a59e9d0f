//! Undo the portal's content obfuscation
//!
//! Two tricks show up in message and announcement bodies:
//!
//! - email addresses are hex-encoded and XOR-ed with a one-byte key
//!   ([`email`]), both in link targets and in inline placeholder spans;
//! - emoji are stored as `<img>` tags pointing at a smiley sprite set
//!   ([`emoji`]).
//!
//! Both are pure lookups on single elements; [`crate::markup`] applies them
//! while linearizing a body.

pub mod email;
pub mod emoji;
