//! # membridge-policy
//!
//! The FS Write Policy Gate (C7): a pure, synchronous pre-flight check
//! that every mutating fs operation (`mkdir`, `rm`, `mv`) must pass before
//! the store client is invoked. Never performs I/O; a denial is a fatal,
//! user-visible [`membridge_core::MemoryError::Policy`] naming the rule
//! that fired.

#![deny(unsafe_code)]

pub mod gate;

pub use gate::{vet_mkdir, vet_mv, vet_rm};
