//! Network exporters for foreign layouts.

pub mod pandapower;

pub use pandapower::{export_network_to_pandapower, network_to_pandapower_value};
