use std::path::Path;

use anyhow::{bail, Result};
use auxbus_cli::{FormatArg, TransformConfig};
use auxbus_core::{create_branch_switches, net_diff, replace_branch_switches};
use auxbus_io::{read_network_with_format, write_network};
use tracing::info;

pub fn handle_expand(
    input: &Path,
    out: &Path,
    format: Option<FormatArg>,
    reserve: &[String],
    config: &TransformConfig,
) -> Result<()> {
    let (mut network, detected) = read_network_with_format(input)?;
    let mut options = config.to_expand_options();
    options.reserved_names.extend(reserve.iter().cloned());

    let report = replace_branch_switches(&mut network, &options)?;
    let format = format.map(Into::into).unwrap_or(detected);
    write_network(&network, out, format)?;

    println!(
        "Expanded {} branch switch(es) into auxiliary buses; wrote {} to {}",
        report.aux_buses.len(),
        format,
        out.display()
    );
    Ok(())
}

pub fn handle_collapse(input: &Path, out: &Path, format: Option<FormatArg>) -> Result<()> {
    let (mut network, detected) = read_network_with_format(input)?;
    let report = create_branch_switches(&mut network)?;
    let format = format.map(Into::into).unwrap_or(detected);
    write_network(&network, out, format)?;

    println!(
        "Collapsed {} auxiliary bus(es) into branch switches; wrote {} to {}",
        report.removed_buses.len(),
        format,
        out.display()
    );
    Ok(())
}

pub fn handle_roundtrip(input: &Path, tol: f64, config: &TransformConfig) -> Result<()> {
    let (original, _) = read_network_with_format(input)?;
    let mut network = original.clone();

    let expanded = replace_branch_switches(&mut network, &config.to_expand_options())?;
    let collapsed = create_branch_switches(&mut network)?;
    info!(
        created = expanded.aux_buses.len(),
        removed = collapsed.removed_buses.len(),
        "expand/collapse done"
    );

    let diff = net_diff(&original, &network, tol);
    if !diff.is_empty() {
        for line in &diff {
            println!("  {line}");
        }
        bail!(
            "round trip of '{}' changed {} value(s)",
            input.display(),
            diff.len()
        );
    }
    println!(
        "Round trip OK: {} auxiliary bus(es) created and removed (tol {tol:e})",
        expanded.aux_buses.len()
    );
    Ok(())
}
