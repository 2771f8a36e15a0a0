//! Vision-language extraction for bill photos.
//!
//! This crate sends a bill image plus a fixed prompt to a vision-capable
//! text-generation endpoint and parses the vendor name, amount and date out
//! of the reply.

pub mod client;
pub mod extraction;
pub mod prompts;

pub use client::*;
pub use extraction::*;
pub use prompts::*;
