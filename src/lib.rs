//! Core library for the `sinkhole` CLI.
//!
//! `sinkhole` keeps a steady stream of download traffic flowing: a pool of
//! fetch workers pulls large files from HTTP mirrors, discards the bytes,
//! and paces itself against a shared rate limiter while a collector samples
//! throughput. The binary is the primary interface; the library exposes the
//! same pieces for embedding and testing.
pub mod app;
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod rate;
pub mod shutdown;
pub(crate) mod system;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
