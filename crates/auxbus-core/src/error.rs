//! Error type for topology rewrites and model construction.
//!
//! Every variant carries the identifiers of the offending rows so the caller can locate
//! the problem in the input tables. Errors abort the whole call; the transformations
//! validate before they mutate, so a failed call leaves the network untouched.
//!
//! # Example
//!
//! ```
//! use auxbus_core::{BusId, TopologyError};
//!
//! let err = TopologyError::DanglingAuxiliaryBus {
//!     bus: BusId::new(12),
//!     switches: 0,
//!     terminals: 1,
//! };
//! assert!(err.to_string().contains("auxiliary bus 12"));
//! ```

use thiserror::Error;

use crate::{BusId, SwitchId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// A switch's bus is not the terminal of its element it claims to control,
    /// or the element does not exist.
    #[error("inconsistent topology at bus {bus} / {element}{}: {reason}", fmt_switch(.switch))]
    InconsistentTopology {
        switch: Option<SwitchId>,
        bus: BusId,
        element: String,
        reason: String,
    },

    /// No unused index is left in a table.
    #[error("no free index left in the {table} table")]
    IdentifierExhaustion { table: &'static str },

    /// An auxiliary bus is not attached to exactly one bus-bus switch and one branch terminal.
    #[error(
        "auxiliary bus {bus} cannot be collapsed: {switches} switch(es), {terminals} branch terminal(s)"
    )]
    DanglingAuxiliaryBus {
        bus: BusId,
        switches: usize,
        terminals: usize,
    },

    #[error("index {index} already exists in the {table} table")]
    DuplicateIndex { table: &'static str, index: usize },

    #[error("bus {0} does not exist")]
    UnknownBus(BusId),

    #[error("{table} {index} does not exist")]
    UnknownElement { table: &'static str, index: usize },
}

fn fmt_switch(switch: &Option<SwitchId>) -> String {
    switch
        .map(|id| format!(" (switch {id})"))
        .unwrap_or_default()
}

/// Convenience type alias for Results using TopologyError.
pub type TopologyResult<T> = Result<T, TopologyError>;
