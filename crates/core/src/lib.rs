//! Boutique Core - Shared domain types.
//!
//! This crate provides the types shared by every Boutique component:
//! - `catalog` - Product synchronization, cart state and view-state coordination
//! - `cli` - Command-line front end over the catalog
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no remote
//! store access, no async runtime. This keeps it lightweight and allows it to
//! be used anywhere, including from a presentation layer.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, products, cart lines, display prices and tags

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
