//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are assembled in [`crate::app`].

pub mod exports;
