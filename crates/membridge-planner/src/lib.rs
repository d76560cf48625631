//! # membridge-planner
//!
//! The Retrieval Planner (C5): a pure function that decides which context
//! type (memory, resource, skill) a search should prioritize, given the
//! configured strategy, the store's own planner signals, and — as a last
//! resort — a fixed query lexicon. Produces no side effects and performs
//! no I/O; [`crate::decision::decide`] is called fresh for every search.

#![deny(unsafe_code)]

pub mod decision;
pub mod lexicon;

pub use decision::{decide, PlannerDecision};
