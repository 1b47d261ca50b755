//! Boutique Catalog library.
//!
//! The data core of the shop: keeps the product list in sync with the
//! remote store, holds the shopping cart and derives the filtered view a
//! presentation layer renders.
//!
//! # Architecture
//!
//! - [`store`] - the remote store contract plus an in-memory implementation
//! - [`firebase`] - Firestore and Cloud Storage over REST
//! - [`repository`] - canonical product list, image merging, votes
//! - [`cart`] - cart lines and totals
//! - [`view`] - tag filter, phase and error state for the presentation layer
//! - [`state`] - wiring of the above from [`config::CatalogConfig`]
//!
//! Every mutable collection has a single owner that publishes whole
//! snapshots through a `tokio::sync::watch` channel.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod firebase;
pub mod repository;
pub mod state;
pub mod store;
pub mod view;

pub use cart::{CartQuote, CartStore};
pub use config::{CatalogConfig, ConfigError, FirebaseConfig, SyncConfig};
pub use error::{CatalogError, Result};
pub use repository::{CatalogSnapshot, ProductRepository};
pub use state::CatalogState;
pub use view::{CatalogView, SyncHandle, SyncMode, ViewPhase, ViewState};
