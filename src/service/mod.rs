//! Service layer: the relay's four cooperating parts.
//!
//! - [`ProducerIngress`] stores and publishes telemetry pushes.
//! - [`StreamManager`] registers subscriber streams and fans telemetry
//!   out to them.
//! - [`CommandMailbox`] holds at most one pending command for the
//!   producer.
//! - [`StatusAggregator`] reports liveness and mailbox state.
//!
//! All four share one [`crate::store::SnapshotStore`]; the ingress,
//! stream manager and status aggregator also share the instance's
//! [`crate::domain::SubscriberRegistry`].

pub mod ingress;
pub mod mailbox;
pub mod status;
pub mod stream_manager;

pub use ingress::{IngestReceipt, ProducerIngress};
pub use mailbox::CommandMailbox;
pub use status::{StatusAggregator, StatusReport};
pub use stream_manager::{FanoutReport, StreamManager, SubscriberStream};
