//! Non-failing validation of a network.
//!
//! The transformations stop at the first problem they find. [`Network::validate`] instead walks
//! every table and reports everything that would make one of them fail, so a broken input file
//! can be fixed in one pass.
//!
//! # Example
//!
//! ```
//! use auxbus_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("geodata", "coordinates for unknown bus", "bus 9");
//! diag.add_error_with_entity("reference", "terminal bus does not exist", "line 3");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use std::collections::HashSet;

use serde::Serialize;

use crate::topology::TopologyIndex;
use crate::{BranchRef, Network, SwitchElement, Terminal};

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Transformations still succeed, but the data is suspicious
    Warning,
    /// A transformation would reject the network
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping, e.g. "reference", "topology", "auxiliary"
    pub category: String,
    pub message: String,
    /// Row the issue is about, e.g. "switch 4"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Collected issues of one validation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
        }
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

impl Network {
    /// Validate every table and return the collected issues.
    pub fn validate(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        self.validate_into(&mut diag);
        diag
    }

    /// Append validation issues to `diag`.
    ///
    /// Errors mark exactly the conditions under which expand or collapse would fail; warnings
    /// flag data that transforms fine but is probably unintended.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        for branch in self.branch_refs() {
            for (terminal, bus) in self.terminals(branch).unwrap_or_default() {
                if !self.bus.contains_key(&bus) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("{terminal} references missing bus {bus}"),
                        &branch.to_string(),
                    );
                }
            }
        }

        let mut claimed: HashSet<(BranchRef, Terminal)> = HashSet::new();
        for (id, switch) in &self.switch {
            let entity = format!("switch {id}");
            if !self.bus.contains_key(&switch.bus) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("bus {} does not exist", switch.bus),
                    &entity,
                );
                continue;
            }
            match switch.element {
                SwitchElement::Bus(other) if !self.bus.contains_key(&other) => {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("element bus {other} does not exist"),
                        &entity,
                    );
                }
                SwitchElement::Bus(other) if other == switch.bus => {
                    diag.add_warning_with_entity(
                        "topology",
                        "switch connects a bus to itself",
                        &entity,
                    );
                }
                SwitchElement::Bus(_) => {}
                _ => match self.switch_terminal(*id, switch, &claimed) {
                    Ok(Some(key)) => {
                        if !claimed.insert(key) {
                            diag.add_error_with_entity(
                                "topology",
                                &format!("{} {} already has a switch", key.0, key.1),
                                &entity,
                            );
                        }
                    }
                    Ok(None) => {}
                    Err(err) => diag.add_error_with_entity("topology", &err.to_string(), &entity),
                },
            }
        }

        let index = TopologyIndex::build(self);
        for aux in self.auxiliary_buses() {
            let (switches, terminals) =
                (index.switches_at(aux).len(), index.terminals_at(aux).len());
            if (switches, terminals) != (1, 1) {
                diag.add_error_with_entity(
                    "auxiliary",
                    &format!(
                        "auxiliary bus has {switches} switch(es) and {terminals} branch terminal(s), expected one of each"
                    ),
                    &format!("bus {aux}"),
                );
            }
        }

        for bus in self.bus_geodata.keys() {
            if !self.bus.contains_key(bus) {
                diag.add_warning_with_entity(
                    "geodata",
                    "coordinates for a bus that does not exist",
                    &format!("bus {bus}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BusGeodata, BusId, BusOptions, BusType, ElementOptions, LineId, SwitchOptions};

    fn count(diag: &Diagnostics, category: &str) -> usize {
        diag.issues.iter().filter(|i| i.category == category).count()
    }

    #[test]
    fn test_diagnostics_counts_and_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");
        diag.add_warning_with_entity("geodata", "warning", "bus 1");
        assert_eq!(diag.summary(), "1 warning");
        diag.add_error_with_entity("topology", "error", "switch 2");
        diag.add_warning_with_entity("geodata", "another warning", "bus 3");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
        assert!(diag.has_errors());
        assert_eq!(count(&diag, "geodata"), 2);
        assert_eq!(
            diag.to_string(),
            "Diagnostics: 2 warnings, 1 error\n  [warning:geodata] warning (bus 1)\n  \
             [error:topology] error (switch 2)\n  [warning:geodata] another warning (bus 3)\n"
        );
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_error_with_entity("reference", "Invalid bus", "switch 1");
        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"entity\": \"switch 1\""));
    }

    #[test]
    fn test_valid_network_has_no_issues() {
        let mut net = Network::new();
        let b0 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let b1 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let line = net
            .create_line(b0, b1, 1.0, "cable", ElementOptions::default())
            .unwrap();
        net.create_switch(
            b0,
            SwitchElement::Line(line),
            true,
            SwitchOptions::default(),
        )
        .unwrap();
        assert!(!net.validate().has_issues());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut net = Network::new();
        let b0 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let b1 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let line = net
            .create_line(b0, b1, 1.0, "cable", ElementOptions::default())
            .unwrap();
        net.create_switch(
            b0,
            SwitchElement::Line(line),
            true,
            SwitchOptions::default(),
        )
        .unwrap();
        net.create_switch(
            b0,
            SwitchElement::Line(line),
            true,
            SwitchOptions::default(),
        )
        .unwrap();
        net.create_switch(b1, SwitchElement::Bus(b1), true, SwitchOptions::default())
            .unwrap();
        net.create_bus(20.0, BusOptions::default().with_type(BusType::Auxiliary))
            .unwrap();
        net.bus_geodata
            .insert(BusId::new(40), BusGeodata { x: 0.0, y: 0.0 });
        net.line.get_mut(&LineId::new(0)).unwrap().to_bus = BusId::new(30);

        let diag = net.validate();
        assert_eq!(count(&diag, "reference"), 1);
        assert_eq!(count(&diag, "topology"), 2);
        assert_eq!(count(&diag, "auxiliary"), 1);
        assert_eq!(count(&diag, "geodata"), 1);
        assert_eq!(diag.error_count(), 3);
        assert_eq!(diag.warning_count(), 2);
    }
}
