//! # routewatch-types
//!
//! Core types for serving-system telemetry. This crate defines the data model
//! shared by the routewatch acquisition layer, its adapters and its views.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON export
//! - **Provenance**: Verdicts record which protocol version actually answered
//!
//! ## Example
//!
//! ```rust
//! use routewatch_types::{ConnectionState, ProtocolVersion, Sample};
//!
//! let sample = Sample::new(1_000)
//!     .p95(120.0)
//!     .qps(5.0)
//!     .route("dense", 0.75)
//!     .route("sparse", 0.25);
//!
//! assert_eq!(sample.route_share.len(), 2);
//! assert_eq!(ProtocolVersion::V3.number(), 3);
//! assert!(ConnectionState::Stale.is_stale());
//! ```

mod experiment;
mod sample;
mod verdict;
mod version;

pub use experiment::*;
pub use sample::*;
pub use verdict::*;
pub use version::*;
