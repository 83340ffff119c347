//! Core types, store traits and the matching engine for the Doppel
//! duplicate-candidate index.
//!
//! This crate is free of database dependencies. Backends implement
//! [`index::DedupIndex`], [`decision::DecisionStore`] and
//! [`resource::ResourceLookup`]; [`service::DedupService`] drives them.

// Native `async fn` in traits; the futures carry explicit `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod bulk;
pub mod config;
pub mod decision;
pub mod error;
pub mod flag;
pub mod index;
pub mod plugin;
pub mod query;
pub mod record;
pub mod registry;
pub mod resource;
pub mod service;
pub mod session;
pub mod signature;

pub use error::{Error, Result};
