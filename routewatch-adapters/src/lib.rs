//! # routewatch-adapters
//!
//! The ingestion boundary of routewatch: everything that talks to the
//! serving system's dashboard API and turns its loosely-typed JSON into
//! finite, well-formed values.
//!
//! ## Components
//!
//! - [`Transport`]: minimal async GET/POST seam, injected into every client
//! - [`HttpTransport`] (`http` feature): reqwest-backed transport
//! - [`ScriptedTransport`]: canned responses for tests and demos
//! - [`safe_number`]: coercion of arbitrary JSON values into finite numbers
//! - [`MetricsClient`]: `GET /metrics/mini` with a per-call timeout
//! - [`VersionedSourceClient`]: ordered protocol-version fallback
//! - [`AgentClient`]: agent summary and run trigger over the fallback cascade
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use routewatch_adapters::{AgentClient, Reply, ScriptedTransport};
//! use routewatch_types::{ProtocolVersion, Verdict};
//!
//! # tokio_test::block_on(async {
//! let transport = ScriptedTransport::new()
//!     .on_get("/agent/summary?v=3", Reply::status(503))
//!     .on_get("/agent/summary?v=2", Reply::json(200, r#"{"ok":true,"verdict":"PASS","bullets":["ok"]}"#));
//!
//! let agent = AgentClient::new(Arc::new(transport));
//! let verdict = agent.summary(ProtocolVersion::V3).await.unwrap();
//! assert_eq!(verdict.verdict, Verdict::Pass);
//! assert_eq!(verdict.version, ProtocolVersion::V2);
//! # });
//! ```

pub mod agent;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod metrics;
pub mod mock;
pub mod payload;
pub mod safe_number;
pub mod transport;
pub mod versioned;

pub use agent::AgentClient;
pub use error::{truncate_detail, FetchError};
#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportBuilder};
pub use metrics::MetricsClient;
pub use mock::{Reply, ScriptedTransport};
pub use payload::{MetricsReading, MetricsWindow};
pub use transport::{HttpResponse, Transport};
pub use versioned::{CascadeState, Versioned, VersionedSourceClient};

// Re-export types for convenience
pub use routewatch_types::{AgentVerdict, ExperimentId, ProtocolVersion, Sample, Verdict};
