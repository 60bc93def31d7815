//! Format detection and the unified read/write interface.
//!
//! Both supported layouts are JSON, so the extension says nothing; a pandapower document is
//! recognized by its `_module` wrapper key.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use auxbus_core::Network;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{exporters, importers};

/// Supported network file layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// serde JSON of the table model
    #[default]
    Native,
    /// pandapower `to_json` layout
    Pandapower,
}

#[derive(Deserialize)]
struct Probe {
    _module: Option<String>,
}

impl Format {
    pub const ALL: &'static [Format] = &[Format::Native, Format::Pandapower];

    pub fn friendly_name(&self) -> &'static str {
        match self {
            Format::Native => "native JSON",
            Format::Pandapower => "pandapower JSON",
        }
    }

    /// CLI value for this format.
    pub fn command_name(&self) -> &'static str {
        match self {
            Format::Native => "native",
            Format::Pandapower => "pandapower",
        }
    }

    /// Detect the layout of a JSON document.
    ///
    /// Anything that is not a JSON object with a `_module` key is treated as native; parsing
    /// then reports the actual problem.
    pub fn detect(contents: &str) -> Format {
        match serde_json::from_str::<Probe>(contents) {
            Ok(Probe {
                _module: Some(module),
            }) => {
                debug!(module = %module, "detected pandapower wrapper");
                Format::Pandapower
            }
            _ => Format::Native,
        }
    }

    pub fn parse(&self, contents: &str) -> Result<Network> {
        match self {
            Format::Native => serde_json::from_str(contents).context("parsing native network JSON"),
            Format::Pandapower => importers::parse_pandapower_str(contents),
        }
    }

    pub fn render(&self, network: &Network) -> Result<String> {
        let rendered = match self {
            Format::Native => serde_json::to_string_pretty(network)?,
            Format::Pandapower => {
                serde_json::to_string_pretty(&exporters::network_to_pandapower_value(network)?)?
            }
        };
        Ok(rendered)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

impl std::str::FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "json" => Ok(Format::Native),
            "pandapower" | "pp" => Ok(Format::Pandapower),
            _ => anyhow::bail!("Unknown format: {}. Supported: native, pandapower", s),
        }
    }
}

/// Read a network file, detecting its layout from the content.
pub fn read_network_with_format(path: &Path) -> Result<(Network, Format)> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading network file '{}'", path.display()))?;
    let format = Format::detect(&contents);
    let network = format
        .parse(&contents)
        .with_context(|| format!("loading {} from '{}'", format, path.display()))?;
    info!(path = %path.display(), %format, stats = %network.stats(), "read network");
    Ok((network, format))
}

pub fn read_network(path: &Path) -> Result<Network> {
    read_network_with_format(path).map(|(network, _)| network)
}

pub fn write_network(network: &Network, path: &Path, format: Format) -> Result<()> {
    let rendered = format.render(network)?;
    fs::write(path, rendered)
        .with_context(|| format!("writing {} to '{}'", format, path.display()))?;
    info!(path = %path.display(), %format, "wrote network");
    Ok(())
}
