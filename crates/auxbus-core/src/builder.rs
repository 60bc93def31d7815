//! pandapower-style element constructors for [`Network`].
//!
//! Every `create_*` method either takes an explicit index (rejected if already taken) or
//! assigns `max(existing) + 1`. References to buses and branch elements are checked when the
//! row is created, so a network built only through these helpers always satisfies the switch
//! invariants the transformations rely on.
//!
//! # Example
//! ```
//! use auxbus_core::*;
//!
//! let mut net = Network::new();
//! let hv = net.create_bus(110.0, BusOptions::named("HV Bus 0").with_index(8)).unwrap();
//! let lv = net.create_bus(20.0, BusOptions::named("MV Bus 0")).unwrap();
//! assert_eq!(lv, BusId::new(9));
//!
//! let t = net
//!     .create_transformer(hv, lv, "40 MVA 110/20 kV", ElementOptions::named("T0"))
//!     .unwrap();
//! net.create_switch(hv, SwitchElement::Trafo(t), true, SwitchOptions::named("CB")).unwrap();
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::{
    BranchRef, Bus, BusId, BusType, Line, LineId, Network, Switch, SwitchElement, SwitchId,
    TableId, TopologyError, TopologyResult, Trafo, Trafo3w, Trafo3wId, TrafoId,
};

/// Options for [`Network::create_bus`]
#[derive(Debug, Clone)]
pub struct BusOptions {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub bus_type: BusType,
    pub zone: Option<String>,
    pub in_service: bool,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            index: None,
            name: None,
            bus_type: BusType::Busbar,
            zone: None,
            in_service: true,
        }
    }
}

impl BusOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_type(mut self, bus_type: BusType) -> Self {
        self.bus_type = bus_type;
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

/// Options shared by lines and transformers
#[derive(Debug, Clone)]
pub struct ElementOptions {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub in_service: bool,
}

impl Default for ElementOptions {
    fn default() -> Self {
        Self {
            index: None,
            name: None,
            in_service: true,
        }
    }
}

impl ElementOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn out_of_service(mut self) -> Self {
        self.in_service = false;
        self
    }
}

/// Options for [`Network::create_switch`]
#[derive(Debug, Clone, Default)]
pub struct SwitchOptions {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub switch_type: Option<String>,
}

impl SwitchOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_type(mut self, switch_type: impl Into<String>) -> Self {
        self.switch_type = Some(switch_type.into());
        self
    }
}

/// Smallest index above every key of `table` (0 when empty), `None` on overflow.
pub fn next_index<K: TableId, V>(table: &BTreeMap<K, V>) -> Option<usize> {
    match table.keys().next_back() {
        Some(last) => last.value().checked_add(1),
        None => Some(0),
    }
}

/// Reserve `count` fresh indices for `table`.
///
/// Indices above every existing key come first; once those run out at `usize::MAX`, gaps
/// below the largest key are filled in ascending order. Fails only when fewer than `count`
/// free indices exist at all.
pub fn allocate_indices<K: TableId, V>(
    table: &BTreeMap<K, V>,
    count: usize,
) -> TopologyResult<Vec<K>> {
    let mut ids = Vec::with_capacity(count);
    if let Some(first) = next_index(table) {
        let room = (usize::MAX - first).saturating_add(1);
        ids.extend((first..).take(count.min(room)));
    }

    let mut candidate = 0usize;
    for key in table.keys() {
        if ids.len() == count {
            break;
        }
        let taken = key.value();
        let wanted = count - ids.len();
        ids.extend((candidate..taken).take(wanted));
        match taken.checked_add(1) {
            Some(next) => candidate = next,
            None => break,
        }
    }

    if ids.len() < count {
        return Err(TopologyError::IdentifierExhaustion { table: K::TABLE });
    }
    Ok(ids.into_iter().map(K::new).collect())
}

fn claim_index<K: TableId, V>(
    table: &BTreeMap<K, V>,
    explicit: Option<usize>,
) -> TopologyResult<K> {
    match explicit {
        Some(index) => {
            let id = K::new(index);
            if table.contains_key(&id) {
                return Err(TopologyError::DuplicateIndex {
                    table: K::TABLE,
                    index,
                });
            }
            Ok(id)
        }
        None => allocate_indices(table, 1)?
            .into_iter()
            .next()
            .ok_or(TopologyError::IdentifierExhaustion { table: K::TABLE }),
    }
}

impl Network {
    fn require_bus(&self, bus: BusId) -> TopologyResult<()> {
        if self.bus.contains_key(&bus) {
            Ok(())
        } else {
            Err(TopologyError::UnknownBus(bus))
        }
    }

    /// Add a bus with nominal voltage `vn_kv`.
    pub fn create_bus(&mut self, vn_kv: f64, opts: BusOptions) -> TopologyResult<BusId> {
        let id = claim_index(&self.bus, opts.index)?;
        self.bus.insert(
            id,
            Bus {
                name: opts.name,
                vn_kv,
                bus_type: opts.bus_type,
                zone: opts.zone,
                in_service: opts.in_service,
            },
        );
        Ok(id)
    }

    /// Add one bus per entry of `opts`, all at `vn_kv`.
    ///
    /// Explicit indices are checked against each other as well as the existing table; on error
    /// no bus is added.
    pub fn create_buses(
        &mut self,
        vn_kv: f64,
        opts: Vec<BusOptions>,
    ) -> TopologyResult<Vec<BusId>> {
        let mut staged = self.bus.clone();
        let mut ids = Vec::with_capacity(opts.len());
        for opt in opts {
            let id = claim_index(&staged, opt.index)?;
            staged.insert(
                id,
                Bus {
                    name: opt.name,
                    vn_kv,
                    bus_type: opt.bus_type,
                    zone: opt.zone,
                    in_service: opt.in_service,
                },
            );
            ids.push(id);
        }
        self.bus = staged;
        Ok(ids)
    }

    pub fn create_line(
        &mut self,
        from_bus: BusId,
        to_bus: BusId,
        length_km: f64,
        std_type: &str,
        opts: ElementOptions,
    ) -> TopologyResult<LineId> {
        self.require_bus(from_bus)?;
        self.require_bus(to_bus)?;
        let id = claim_index(&self.line, opts.index)?;
        self.line.insert(
            id,
            Line {
                name: opts.name,
                from_bus,
                to_bus,
                length_km,
                std_type: Some(std_type.to_string()),
                in_service: opts.in_service,
            },
        );
        Ok(id)
    }

    pub fn create_transformer(
        &mut self,
        hv_bus: BusId,
        lv_bus: BusId,
        std_type: &str,
        opts: ElementOptions,
    ) -> TopologyResult<TrafoId> {
        self.require_bus(hv_bus)?;
        self.require_bus(lv_bus)?;
        let id = claim_index(&self.trafo, opts.index)?;
        self.trafo.insert(
            id,
            Trafo {
                name: opts.name,
                hv_bus,
                lv_bus,
                std_type: Some(std_type.to_string()),
                in_service: opts.in_service,
            },
        );
        Ok(id)
    }

    pub fn create_transformer3w(
        &mut self,
        hv_bus: BusId,
        mv_bus: BusId,
        lv_bus: BusId,
        std_type: &str,
        opts: ElementOptions,
    ) -> TopologyResult<Trafo3wId> {
        self.require_bus(hv_bus)?;
        self.require_bus(mv_bus)?;
        self.require_bus(lv_bus)?;
        let id = claim_index(&self.trafo3w, opts.index)?;
        self.trafo3w.insert(
            id,
            Trafo3w {
                name: opts.name,
                hv_bus,
                mv_bus,
                lv_bus,
                std_type: Some(std_type.to_string()),
                in_service: opts.in_service,
            },
        );
        Ok(id)
    }

    /// Add a switch between `bus` and `element`.
    ///
    /// For branch elements `bus` must be one of the element's terminals (for three-winding
    /// transformers, the terminal of the given winding).
    pub fn create_switch(
        &mut self,
        bus: BusId,
        element: SwitchElement,
        closed: bool,
        opts: SwitchOptions,
    ) -> TopologyResult<SwitchId> {
        self.require_bus(bus)?;
        let id = claim_index(&self.switch, opts.index)?;
        let switch = Switch {
            bus,
            element,
            closed,
            name: opts.name,
            switch_type: opts.switch_type,
        };
        match element.branch() {
            None => {
                if let SwitchElement::Bus(other) = element {
                    self.require_bus(other)?;
                }
            }
            Some(branch) => {
                if self.terminals(branch).is_none() {
                    let (table, index) = match branch {
                        BranchRef::Line(id) => (LineId::TABLE, id.value()),
                        BranchRef::Trafo(id) => (TrafoId::TABLE, id.value()),
                        BranchRef::Trafo3w(id) => (Trafo3wId::TABLE, id.value()),
                    };
                    return Err(TopologyError::UnknownElement { table, index });
                }
                self.switch_terminal(id, &switch, &HashSet::new())?;
            }
        }
        self.switch.insert(id, switch);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Winding;

    #[test]
    fn test_auto_and_explicit_indices() {
        let mut net = Network::new();
        let a = net.create_bus(20.0, BusOptions::default()).unwrap();
        assert_eq!(a, BusId::new(0));
        let b = net
            .create_bus(20.0, BusOptions::default().with_index(8))
            .unwrap();
        assert_eq!(b, BusId::new(8));
        let c = net.create_bus(20.0, BusOptions::default()).unwrap();
        assert_eq!(c, BusId::new(9));

        let err = net
            .create_bus(20.0, BusOptions::default().with_index(8))
            .unwrap_err();
        assert_eq!(
            err,
            TopologyError::DuplicateIndex {
                table: "bus",
                index: 8
            }
        );
    }

    #[test]
    fn test_create_buses_is_atomic() {
        let mut net = Network::new();
        let opts = vec![
            BusOptions::named("a").with_index(2),
            BusOptions::named("b").with_index(0),
            BusOptions::named("c").with_index(2),
        ];
        assert!(net.create_buses(20.0, opts).is_err());
        assert!(net.bus.is_empty());

        let ids = net
            .create_buses(
                20.0,
                vec![BusOptions::named("a").with_index(2), BusOptions::named("b")],
            )
            .unwrap();
        assert_eq!(ids, vec![BusId::new(2), BusId::new(3)]);
    }

    #[test]
    fn test_allocate_indices() {
        let mut net = Network::new();
        net.create_bus(1.0, BusOptions::default().with_index(4))
            .unwrap();
        let ids: Vec<BusId> = allocate_indices(&net.bus, 3).unwrap();
        assert_eq!(ids, vec![BusId::new(5), BusId::new(6), BusId::new(7)]);
        assert!(allocate_indices(&net.bus, 0).unwrap().is_empty());

        net.create_bus(1.0, BusOptions::default().with_index(usize::MAX - 1))
            .unwrap();
        let ids: Vec<BusId> = allocate_indices(&net.bus, 3).unwrap();
        assert_eq!(ids, vec![BusId::new(usize::MAX), BusId::new(0), BusId::new(1)]);
    }

    #[test]
    fn test_allocate_indices_fills_gaps_below_max() {
        let mut net = Network::new();
        for index in [0, 1, usize::MAX] {
            net.create_bus(1.0, BusOptions::default().with_index(index))
                .unwrap();
        }
        let ids: Vec<BusId> = allocate_indices(&net.bus, 2).unwrap();
        assert_eq!(ids, vec![BusId::new(2), BusId::new(3)]);

        let id = net.create_bus(1.0, BusOptions::default()).unwrap();
        assert_eq!(id, BusId::new(2));
    }

    #[test]
    fn test_allocate_indices_with_only_the_top_index_taken() {
        let mut table: BTreeMap<BusId, ()> = BTreeMap::new();
        table.insert(BusId::new(usize::MAX), ());
        let ids: Vec<BusId> = allocate_indices(&table, 2).unwrap();
        assert_eq!(ids, vec![BusId::new(0), BusId::new(1)]);
    }

    #[test]
    fn test_branch_requires_existing_buses() {
        let mut net = Network::new();
        let b0 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let err = net
            .create_line(b0, BusId::new(7), 1.0, "cable", ElementOptions::default())
            .unwrap_err();
        assert_eq!(err, TopologyError::UnknownBus(BusId::new(7)));
        assert!(net.line.is_empty());
    }

    #[test]
    fn test_switch_must_sit_at_terminal() {
        let mut net = Network::new();
        let b0 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let b1 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let b2 = net.create_bus(20.0, BusOptions::default()).unwrap();
        let line = net
            .create_line(b0, b1, 1.0, "cable", ElementOptions::default())
            .unwrap();

        let err = net
            .create_switch(b2, SwitchElement::Line(line), true, SwitchOptions::default())
            .unwrap_err();
        assert!(matches!(err, TopologyError::InconsistentTopology { .. }));

        let err = net
            .create_switch(
                b0,
                SwitchElement::Trafo(TrafoId::new(0)),
                true,
                SwitchOptions::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            TopologyError::UnknownElement {
                table: "trafo",
                index: 0
            }
        );
        assert!(net.switch.is_empty());
    }

    #[test]
    fn test_trafo3w_switch_checks_winding() {
        let mut net = Network::new();
        let hv = net.create_bus(110.0, BusOptions::default()).unwrap();
        let mv = net.create_bus(20.0, BusOptions::default()).unwrap();
        let lv = net.create_bus(10.0, BusOptions::default()).unwrap();
        let t = net
            .create_transformer3w(hv, mv, lv, "63/25/38 MVA", ElementOptions::default())
            .unwrap();

        assert!(net
            .create_switch(
                mv,
                SwitchElement::Trafo3w(t, Winding::Mv),
                true,
                SwitchOptions::default()
            )
            .is_ok());
        assert!(net
            .create_switch(
                mv,
                SwitchElement::Trafo3w(t, Winding::Lv),
                true,
                SwitchOptions::default()
            )
            .is_err());
    }
}
