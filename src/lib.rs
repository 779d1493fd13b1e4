//! das-common: shared helpers for distributed fiber-optic sensing data
//!
//! A collection of small, independent helper modules used across the
//! fiber-optic sensing projects: optional-parameter resolution with
//! validation, input parsing, interval-index manipulation and caching,
//! time×locus trace frames with processing filters and scalers, trace-file
//! I/O, credential plumbing and plotting-axis helpers.
//!
//! ## Key Features
//!
//! - **Parameter Resolution**: declared parameters resolve from caller
//!   arguments, a configured default registry, then hard-coded fallbacks,
//!   and are validated before any expensive collaborator is reached
//! - **Interval Indexing**: continuity grouping, set-like add/subtract and
//!   an interval-aware fetch cache that only requests missing time ranges
//! - **Trace Processing**: NaN-aware rolling RMS, FIR filters, moveout
//!   correction, depth aggregation and gap splitting, parallelized with Rayon
//! - **Trace Files**: NetCDF-4 (HDF5) container read/write with free-form
//!   metadata attributes
//!
//! ## Module Organization
//!
//! - [`params`]: optional-parameter resolution and validation
//! - [`parse`]: timestamps, durations, UUIDs and naming conventions
//! - [`interval`]: interval indices and the interval-aware cache
//! - [`frame`]: the time×locus trace frame
//! - [`processing`]: data-processing filters over trace frames
//! - [`scale`]: column scalers (min-max, standard, robust, rolling)
//! - [`trace_io`]: trace-file reading and writing
//! - [`auth`]: credential caching and chaining
//! - [`plot`]: tick locators, label formatting and raster specs
//! - [`riser`]: riser depth-calibration helpers
//! - [`version`]: semantic version parsing
//! - [`parallel`]: thread-pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust
//! use das_common::params::{resolve, CallArgs, DefaultRegistry, ParamSpec};
//!
//! let specs = [
//!     ParamSpec::int("retries").fallback(3),
//!     ParamSpec::choice("mode", ["fast", "safe"]).fallback("safe"),
//! ];
//! let registry = DefaultRegistry::new();
//! let args = CallArgs::new().set("mode", "fast");
//!
//! let resolved = resolve(&args, &specs, &registry).unwrap();
//! assert_eq!(resolved.int("retries"), Some(3));
//! assert_eq!(resolved.str("mode"), Some("fast"));
//! ```

// Core modules
pub mod auth;
pub mod errors;
pub mod frame;
pub mod interval;
pub mod parallel;
pub mod params;
pub mod parse;
pub mod plot;
pub mod processing;
pub mod riser;
pub mod scale;
pub mod trace_io;
pub mod version;

// Direct re-exports for the public API
pub use errors::{DasError, Result};
pub use frame::TraceFrame;
pub use params::{resolve, CallArgs, DefaultRegistry, ParamSpec, ResolvedParams};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::auth::{AccessToken, CredentialCache, TokenCredential};
    pub use crate::errors::{DasError, Result};
    pub use crate::frame::TraceFrame;
    pub use crate::interval::{Interval, IntervalCache};
    pub use crate::params::{
        resolve, CallArgs, Constraint, DefaultRegistry, ParamSpec, ParamValue, ResolvedParams,
        TypeTag,
    };
    pub use crate::processing::AggregationFunction;
    pub use crate::scale::Scaler;
    pub use crate::trace_io::{read_trace, write_trace, MetaValue, Metadata};
    pub use crate::version::SemanticVersion;
}
