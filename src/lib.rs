//! # skyblue-relay
//!
//! Telemetry fan-out and command mailbox between a single simulated
//! aircraft (the producer) and any number of dashboards (subscribers).
//!
//! The producer pushes full telemetry snapshots over HTTP; the relay
//! stores the latest one with a TTL and broadcasts it to every open
//! server-sent event stream on every relay instance. Subscribers send
//! commands back through a single-slot mailbox that the producer polls.
//!
//! ## Architecture
//!
//! ```text
//! Producer ──POST /wokwi──► ProducerIngress ──set+publish──► SnapshotStore
//!                                                               │
//!                    every instance's StreamManager ◄──subscribe┘
//!                                 │
//!                                 └──SSE──► Subscribers
//!
//! Subscriber ──POST /command──► CommandMailbox ──set──► SnapshotStore
//! Producer   ──GET  /command──► CommandMailbox ──take─► SnapshotStore
//! ```
//!
//! Relay instances are stateless apart from their local subscriber
//! registry; the store ([`store::MemoryStore`] or [`store::RedisStore`])
//! holds everything shared.

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
