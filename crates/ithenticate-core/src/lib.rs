//! # iThenticate Bridge Core
//!
//! Runtime-agnostic logic for the iThenticate bridge: the document record
//! model, the storage abstraction, the vendor client abstraction, user-facing
//! notices, and the [`RequestWrapper`](wrapper::RequestWrapper) that ties
//! them together.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Native implementations of the [`store::DocumentStore`],
//! [`vendor::VendorClient`] and [`entity::FileSource`] traits live in the
//! `ithenticate-bridge` crate.

pub mod entity;
pub mod models;
pub mod notice;
pub mod store;
pub mod vendor;
pub mod wrapper;
