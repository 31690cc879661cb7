//! Core types for hashgraph event intake.
//!
//! This crate provides the foundational types shared by the intake pipeline:
//!
//! - **Primitives**: [`Hash`], [`NodeId`]
//! - **DAG nodes**: [`EventDescriptor`], [`PlatformEvent`]
//! - **Ancient policy**: [`AncientMode`], [`EventWindow`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend on
//! any other workspace crates, making it the foundation layer.

mod event;
mod hash;
mod identifiers;
mod window;

pub use event::{EventDescriptor, PlatformEvent};
pub use hash::{Hash, HexError};
pub use identifiers::{NodeId, FIRST_GENERATION, ROUND_FIRST};
pub use window::{AncientMode, EventWindow, EventWindowError};
