//! Structural comparison of two networks.
//!
//! Used to check that an expand/collapse round trip restored the input. Tables are compared
//! by key set first, then row by row; floating-point columns use an absolute tolerance and
//! treat two NaNs as equal.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::{Bus, BusGeodata, Line, Network, Switch, Trafo, Trafo3w};

/// Absolute tolerance for float columns when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

fn float_eq(a: f64, b: f64, tol: f64) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() <= tol
}

/// Field-level comparison of two rows of the same table.
trait RowCompare {
    fn mismatched_fields(&self, other: &Self, tol: f64) -> Vec<&'static str>;
}

macro_rules! row_compare {
    ($row:ty; exact: [$($exact:ident),*]) => {
        impl RowCompare for $row {
            fn mismatched_fields(&self, other: &Self, _tol: f64) -> Vec<&'static str> {
                let mut fields = Vec::new();
                $(if self.$exact != other.$exact { fields.push(stringify!($exact)); })*
                fields
            }
        }
    };
    ($row:ty; exact: [$($exact:ident),*]; float: [$($float:ident),+]) => {
        impl RowCompare for $row {
            fn mismatched_fields(&self, other: &Self, tol: f64) -> Vec<&'static str> {
                let mut fields = Vec::new();
                $(if self.$exact != other.$exact { fields.push(stringify!($exact)); })*
                $(if !float_eq(self.$float, other.$float, tol) {
                    fields.push(stringify!($float));
                })+
                fields
            }
        }
    };
}

row_compare!(Bus; exact: [name, bus_type, zone, in_service]; float: [vn_kv]);
row_compare!(Line; exact: [name, from_bus, to_bus, std_type, in_service]; float: [length_km]);
row_compare!(Trafo; exact: [name, hv_bus, lv_bus, std_type, in_service]);
row_compare!(Trafo3w; exact: [name, hv_bus, mv_bus, lv_bus, std_type, in_service]);
row_compare!(Switch; exact: [bus, element, closed, name, switch_type]);
row_compare!(BusGeodata; exact: []; float: [x, y]);

fn diff_table<K, V>(
    table: &str,
    left: &BTreeMap<K, V>,
    right: &BTreeMap<K, V>,
    tol: f64,
    out: &mut Vec<String>,
) where
    K: Ord + Display,
    V: RowCompare,
{
    let only_left: Vec<String> = left
        .keys()
        .filter(|k| !right.contains_key(k))
        .map(ToString::to_string)
        .collect();
    let only_right: Vec<String> = right
        .keys()
        .filter(|k| !left.contains_key(k))
        .map(ToString::to_string)
        .collect();
    if !only_left.is_empty() {
        out.push(format!("{table}: only on the left: {}", only_left.join(", ")));
    }
    if !only_right.is_empty() {
        out.push(format!("{table}: only on the right: {}", only_right.join(", ")));
    }

    for (key, row) in left {
        let Some(other) = right.get(key) else {
            continue;
        };
        let fields = row.mismatched_fields(other, tol);
        if !fields.is_empty() {
            out.push(format!("{table} {key}: {} differ", fields.join(", ")));
        }
    }
}

/// Human-readable list of differences between two networks; empty when they match.
pub fn net_diff(left: &Network, right: &Network, tol: f64) -> Vec<String> {
    let mut out = Vec::new();
    diff_table("bus", &left.bus, &right.bus, tol, &mut out);
    diff_table("line", &left.line, &right.line, tol, &mut out);
    diff_table("trafo", &left.trafo, &right.trafo, tol, &mut out);
    diff_table("trafo3w", &left.trafo3w, &right.trafo3w, tol, &mut out);
    diff_table("switch", &left.switch, &right.switch, tol, &mut out);
    diff_table("bus_geodata", &left.bus_geodata, &right.bus_geodata, tol, &mut out);
    out
}

/// Same keys in every table and equal rows, floats within `tol`.
pub fn nets_equal(left: &Network, right: &Network, tol: f64) -> bool {
    net_diff(left, right, tol).is_empty()
}
