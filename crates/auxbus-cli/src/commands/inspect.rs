//! Read-only commands: statistics, islands, validation.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use auxbus_core::graph_utils;
use auxbus_io::read_network;
use tabwriter::TabWriter;

pub fn handle_stats(input: &Path) -> Result<()> {
    let network = read_network(input)?;
    let stats = graph_utils::graph_stats(&network)?;
    println!("Network statistics for {}:", input.display());
    println!("  Tables        : {}", network.stats());
    println!("  Nodes         : {}", stats.node_count);
    println!("  Edges         : {}", stats.edge_count);
    println!("  Islands       : {}", stats.connected_components);
    println!(
        "  Degree [min/avg/max]: {}/{:.2}/{}",
        stats.min_degree, stats.avg_degree, stats.max_degree
    );
    Ok(())
}

pub fn handle_islands(input: &Path, emit: bool) -> Result<()> {
    let network = read_network(input)?;
    let analysis = graph_utils::find_islands(&network)?;
    for summary in &analysis.islands {
        println!(
            "Island {}: {} bus(es)",
            summary.island_id, summary.node_count
        );
    }
    if emit {
        println!();
        let mut writer = TabWriter::new(io::stdout());
        writeln!(writer, "BUS\tNAME\tAUX\tISLAND")?;
        for assignment in &analysis.assignments {
            let aux = network
                .bus
                .get(&assignment.bus)
                .is_some_and(|bus| bus.is_auxiliary());
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                assignment.bus,
                assignment.label,
                if aux { "yes" } else { "" },
                assignment.island_id
            )?;
        }
        writer.flush()?;
    }
    Ok(())
}

pub fn handle_validate(input: &Path, json: bool) -> Result<()> {
    let network = read_network(input)?;
    let diagnostics = network.validate();
    if json {
        serde_json::to_writer_pretty(io::stdout(), &diagnostics)?;
        println!();
    } else {
        print!("{diagnostics}");
    }
    if diagnostics.has_errors() {
        bail!(
            "'{}' failed validation: {}",
            input.display(),
            diagnostics.summary()
        );
    }
    Ok(())
}
