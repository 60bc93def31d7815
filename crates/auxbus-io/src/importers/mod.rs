//! Network importers.
//!
//! Native files are read directly through serde (see [`crate::format`]); this module holds the
//! parsers for foreign layouts.

pub mod pandapower;

pub use pandapower::{load_pandapower_network, parse_pandapower_str};
