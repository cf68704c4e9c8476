//! # beacon-server
//!
//! HTTP server library for the beacon nearby-device scanner.
//!
//! This library provides the API handlers, backend selection, and state
//! management used by the `beacon-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod backend;
pub mod logging;
pub mod state;
