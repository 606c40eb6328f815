//! mkvshrink - batch MKV converter
//!
//! This library crate exposes the batch pipeline for the binary and for
//! integration testing.

pub mod batch;
pub mod config;
pub mod job;
pub mod naming;
