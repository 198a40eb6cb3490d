//! # iThenticate Bridge
//!
//! Submits content entities to the iThenticate plagiarism-detection service
//! and keeps a local record of each submission's document ID, report ID,
//! report URL and similarity score.
//!
//! The runtime-agnostic pieces (record model, store trait, vendor trait,
//! request wrapper) live in [`ithenticate_core`]; this crate provides the
//! native implementations and the `ithen` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐
//! │   CLI    │──▶│ RequestWrapper │──▶│ iThenticate  │
//! │ (ithen)  │   │    (core)      │   │  (XML-RPC)   │
//! └──────────┘   └───────┬────────┘   └──────────────┘
//!                        │
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!        ┌──────────┐        ┌──────────┐
//!        │  SQLite  │        │  Files   │
//!        └──────────┘        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite document store |
//! | [`xmlrpc`] | XML-RPC value codec |
//! | [`client`] | iThenticate session client |
//! | [`file_source`] | Filesystem file loader |
//! | [`session`] | Wrapper assembly from config |
//! | [`commands`] | CLI command handlers |
//! | [`logging`] | Tracing subscriber setup |

pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod file_source;
pub mod logging;
pub mod migrate;
pub mod session;
pub mod sqlite_store;
pub mod xmlrpc;

pub use ithenticate_core;
