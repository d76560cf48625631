//! # membridge-client
//!
//! The Store Client (C1): an instrumented, typed transport over the
//! store's HTTP API. Everything above this crate talks to the store only
//! through [`StoreClient`] — no other crate constructs a `reqwest::Client`
//! of its own.

#![deny(unsafe_code)]

pub mod client;
pub mod envelope;
pub mod types;

pub use client::{HttpStoreClient, StoreClient};
pub use envelope::{StoreEnvelope, StoreErrorBody};
