//! # auxbus-io: network file I/O
//!
//! Reads and writes [`auxbus_core::Network`] in two JSON layouts:
//!
//! | Format | Layout | Notes |
//! |--------|--------|-------|
//! | native | serde JSON of the table model | lossless, keeps three-winding switch windings |
//! | pandapower | `pandapowerNet` wrapper with split-orient DataFrames | windings inferred from the switch bus |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use auxbus_io::{read_network_with_format, write_network};
//!
//! fn main() -> anyhow::Result<()> {
//!     let (mut net, format) = read_network_with_format(Path::new("grid.json"))?;
//!     auxbus_core::expand(&mut net)?;
//!     write_network(&net, Path::new("grid_expanded.json"), format)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Everything returns `anyhow::Result` with file and table context attached. Model errors
//! ([`auxbus_core::TopologyError`]) stay reachable through `downcast_ref` on the error chain.

pub mod exporters;
pub mod format;
pub mod importers;

pub use format::{read_network, read_network_with_format, write_network, Format};
