//! pandapower JSON network importer
//!
//! pandapower writes a `pandapowerNet` as JSON that wraps one serialized pandas DataFrame per
//! element table. Only the tables the topology model knows are read (`bus`, `line`, `trafo`,
//! `trafo3w`, `switch`, `bus_geodata`); result tables, std_types and the rest are skipped.
//!
//! Reference: <https://pandapower.readthedocs.io/en/latest/file_io.html>

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use anyhow::{anyhow, bail, Context, Result};
use auxbus_core::{
    Bus, BusGeodata, BusId, BusType, Line, LineId, Network, Switch, SwitchElement, SwitchId,
    TableId, TopologyError, Trafo, Trafo3w, Trafo3wId, TrafoId,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Top-level pandapower JSON structure
#[derive(Debug, Deserialize)]
struct PandapowerJson {
    _module: String,
    _class: String,
    _object: PandapowerNet,
}

/// The pandapower network container
#[derive(Debug, Deserialize)]
struct PandapowerNet {
    bus: Option<DataFrameJson>,
    line: Option<DataFrameJson>,
    trafo: Option<DataFrameJson>,
    trafo3w: Option<DataFrameJson>,
    switch: Option<DataFrameJson>,
    bus_geodata: Option<DataFrameJson>,
    #[serde(flatten)]
    _extra: HashMap<String, Value>,
}

/// A serialized pandas DataFrame
#[derive(Debug, Deserialize)]
struct DataFrameJson {
    /// The DataFrame content as a JSON string in split orientation
    _object: String,
    #[serde(flatten)]
    _extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DataFrameContent {
    columns: Vec<String>,
    index: Vec<usize>,
    data: Vec<Vec<Value>>,
}

/// Borrowed view into a parsed DataFrame with a column name lookup.
struct DataFrameView<'a> {
    table: &'static str,
    index: &'a [usize],
    data: &'a [Vec<Value>],
    col_map: HashMap<&'a str, usize>,
}

impl<'a> DataFrameView<'a> {
    fn new(table: &'static str, content: &'a DataFrameContent) -> Self {
        let col_map = content
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        Self {
            table,
            index: &content.index,
            data: &content.data,
            col_map,
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    /// pandas index of a row (not its position)
    fn get_index(&self, row: usize) -> usize {
        self.index.get(row).copied().unwrap_or(row)
    }

    fn get(&self, row: usize, col: &str) -> Option<&'a Value> {
        let col_idx = self.col_map.get(col)?;
        self.data.get(row)?.get(*col_idx)
    }

    fn f64(&self, row: usize, key: &str) -> Option<f64> {
        match self.get(row, key)? {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Float column where pandas NaN is serialized as null.
    fn f64_or_nan(&self, row: usize, key: &str) -> f64 {
        self.f64(row, key).unwrap_or(f64::NAN)
    }

    fn usize(&self, row: usize, key: &str) -> Option<usize> {
        match self.get(row, key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
                .and_then(|x| usize::try_from(x).ok()),
            _ => None,
        }
    }

    fn bool(&self, row: usize, key: &str) -> Option<bool> {
        match self.get(row, key)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn string(&self, row: usize, key: &str) -> Option<String> {
        match self.get(row, key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn require_bus(&self, row: usize, key: &str) -> Result<BusId> {
        self.usize(row, key).map(BusId::new).ok_or_else(|| {
            anyhow!(
                "{} {} missing '{}'",
                self.table,
                self.get_index(row),
                key
            )
        })
    }
}

impl DataFrameJson {
    fn parse_content(&self, table: &str) -> Result<DataFrameContent> {
        serde_json::from_str(&self._object)
            .with_context(|| format!("parsing DataFrame content of table '{table}'"))
    }
}

/// Parse every row of an optional table into `target`, rejecting repeated indices.
fn read_table<K, V>(
    frame: Option<&DataFrameJson>,
    target: &mut BTreeMap<K, V>,
    mut parse_row: impl FnMut(&DataFrameView, usize) -> Result<V>,
) -> Result<()>
where
    K: TableId,
{
    let Some(frame) = frame else {
        return Ok(());
    };
    let content = frame.parse_content(K::TABLE)?;
    let view = DataFrameView::new(K::TABLE, &content);
    for row in 0..view.len() {
        let index = view.get_index(row);
        let value = parse_row(&view, row)?;
        if target.insert(K::new(index), value).is_some() {
            return Err(TopologyError::DuplicateIndex {
                table: K::TABLE,
                index,
            }
            .into());
        }
    }
    debug!(table = K::TABLE, rows = view.len(), "read pandapower table");
    Ok(())
}

/// Parse a pandapower JSON document.
pub fn parse_pandapower_str(content: &str) -> Result<Network> {
    let pp: PandapowerJson =
        serde_json::from_str(content).context("parsing pandapower JSON")?;
    if !pp._class.eq_ignore_ascii_case("pandapowerNet") {
        warn!(class = %pp._class, module = %pp._module, "unexpected pandapower container class");
    }
    build_network_from_pandapower(&pp._object)
}

/// Load a pandapower JSON file.
pub fn load_pandapower_network(path: &Path) -> Result<Network> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pandapower JSON file '{}'", path.display()))?;
    let network = parse_pandapower_str(&content)
        .with_context(|| format!("importing pandapower network from '{}'", path.display()))?;
    info!(path = %path.display(), stats = %network.stats(), "imported pandapower network");
    Ok(network)
}

fn build_network_from_pandapower(pp: &PandapowerNet) -> Result<Network> {
    let mut network = Network::new();

    read_table(pp.bus.as_ref(), &mut network.bus, |view, row| {
        let bus_type = match view.string(row, "type") {
            None => BusType::default(),
            Some(code) => BusType::from_code(&code).unwrap_or_else(|| {
                warn!(bus = view.get_index(row), code = %code, "unknown bus type, using busbar");
                BusType::default()
            }),
        };
        Ok(Bus {
            name: view.string(row, "name"),
            vn_kv: view.f64_or_nan(row, "vn_kv"),
            bus_type,
            zone: view.string(row, "zone"),
            in_service: view.bool(row, "in_service").unwrap_or(true),
        })
    })?;

    read_table::<LineId, _>(pp.line.as_ref(), &mut network.line, |view, row| {
        Ok(Line {
            name: view.string(row, "name"),
            from_bus: view.require_bus(row, "from_bus")?,
            to_bus: view.require_bus(row, "to_bus")?,
            length_km: view.f64_or_nan(row, "length_km"),
            std_type: view.string(row, "std_type"),
            in_service: view.bool(row, "in_service").unwrap_or(true),
        })
    })?;

    read_table::<TrafoId, _>(pp.trafo.as_ref(), &mut network.trafo, |view, row| {
        Ok(Trafo {
            name: view.string(row, "name"),
            hv_bus: view.require_bus(row, "hv_bus")?,
            lv_bus: view.require_bus(row, "lv_bus")?,
            std_type: view.string(row, "std_type"),
            in_service: view.bool(row, "in_service").unwrap_or(true),
        })
    })?;

    read_table::<Trafo3wId, _>(pp.trafo3w.as_ref(), &mut network.trafo3w, |view, row| {
        Ok(Trafo3w {
            name: view.string(row, "name"),
            hv_bus: view.require_bus(row, "hv_bus")?,
            mv_bus: view.require_bus(row, "mv_bus")?,
            lv_bus: view.require_bus(row, "lv_bus")?,
            std_type: view.string(row, "std_type"),
            in_service: view.bool(row, "in_service").unwrap_or(true),
        })
    })?;

    // Switches last: three-winding switches need the trafo3w table to resolve their winding.
    let mut switches = BTreeMap::new();
    read_table::<SwitchId, _>(pp.switch.as_ref(), &mut switches, |view, row| {
        let id = view.get_index(row);
        let bus = view.require_bus(row, "bus")?;
        let element = view
            .usize(row, "element")
            .ok_or_else(|| anyhow!("switch {id} missing 'element'"))?;
        let et = view
            .string(row, "et")
            .ok_or_else(|| anyhow!("switch {id} missing 'et'"))?;
        let element = match et.as_str() {
            "b" => SwitchElement::Bus(BusId::new(element)),
            "l" => SwitchElement::Line(LineId::new(element)),
            "t" => SwitchElement::Trafo(TrafoId::new(element)),
            "t3" => SwitchElement::trafo3w_at(&network, Trafo3wId::new(element), bus)
                .with_context(|| format!("resolving winding of switch {id}"))?,
            other => bail!("switch {id} has unknown element type '{other}'"),
        };
        Ok(Switch {
            bus,
            element,
            closed: view.bool(row, "closed").unwrap_or(true),
            name: view.string(row, "name"),
            switch_type: view.string(row, "type"),
        })
    })?;
    network.switch = switches;

    read_table(pp.bus_geodata.as_ref(), &mut network.bus_geodata, |view, row| {
        Ok(BusGeodata {
            x: view.f64_or_nan(row, "x"),
            y: view.f64_or_nan(row, "y"),
        })
    })?;

    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auxbus_core::Winding;
    use serde_json::json;

    fn frame(columns: &[&str], index: &[usize], data: Value) -> Value {
        let object = json!({ "columns": columns, "index": index, "data": data });
        json!({
            "_module": "pandas.core.frame",
            "_class": "DataFrame",
            "_object": object.to_string(),
            "orient": "split",
        })
    }

    fn sample() -> Value {
        json!({
            "_module": "pandapower.auxiliary",
            "_class": "pandapowerNet",
            "_object": {
                "name": "sample",
                "f_hz": 50.0,
                "bus": frame(
                    &["name", "vn_kv", "type", "zone", "in_service"],
                    &[8, 0, 1],
                    json!([
                        ["HV", 110.0, "b", null, true],
                        ["MV", 20.0, "n", "z1", true],
                        [null, 10.0, "m", null, false]
                    ]),
                ),
                "trafo3w": frame(
                    &["name", "std_type", "hv_bus", "mv_bus", "lv_bus", "in_service"],
                    &[0],
                    json!([["T3", "63/25/38 MVA 110/20/10 kV", 8, 0, 1, true]]),
                ),
                "line": frame(
                    &["name", "std_type", "from_bus", "to_bus", "length_km", "in_service"],
                    &[4],
                    json!([["L", null, 0, 1, null, true]]),
                ),
                "switch": frame(
                    &["bus", "element", "et", "type", "closed", "name"],
                    &[0, 3],
                    json!([
                        [0, 0, "t3", "CB", false, "S0"],
                        [1, 4, "l", null, true, null]
                    ]),
                ),
                "load": frame(&["bus", "p_mw"], &[0], json!([[1, 0.4]])),
                "bus_geodata": frame(&["x", "y", "coords"], &[8], json!([[1.0, 2.0, null]])),
            }
        })
    }

    #[test]
    fn test_parse_sample_tables() {
        let net = parse_pandapower_str(&sample().to_string()).unwrap();
        assert_eq!(net.bus.len(), 3);
        assert_eq!(net.bus[&BusId::new(0)].zone.as_deref(), Some("z1"));
        assert_eq!(net.bus[&BusId::new(1)].bus_type, BusType::Muff);
        assert!(!net.bus[&BusId::new(1)].in_service);
        assert!(net.bus[&BusId::new(1)].name.is_none());

        let line = &net.line[&LineId::new(4)];
        assert!(line.length_km.is_nan());
        assert!(line.std_type.is_none());

        assert_eq!(
            net.switch[&SwitchId::new(0)].element,
            SwitchElement::Trafo3w(Trafo3wId::new(0), Winding::Mv)
        );
        assert_eq!(net.switch[&SwitchId::new(0)].switch_type.as_deref(), Some("CB"));
        assert!(net.switch[&SwitchId::new(3)].closed);
        assert_eq!(net.bus_geodata[&BusId::new(8)], BusGeodata { x: 1.0, y: 2.0 });
        assert!(net.trafo.is_empty());
    }

    #[test]
    fn test_trafo3w_switch_at_foreign_bus_is_rejected() {
        let mut doc = sample();
        doc["_object"]["switch"] = frame(
            &["bus", "element", "et", "closed"],
            &[0],
            json!([[5, 0, "t3", true]]),
        );
        let err = parse_pandapower_str(&doc.to_string()).unwrap_err();
        let topology = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<TopologyError>())
            .unwrap();
        assert!(matches!(topology, TopologyError::InconsistentTopology { .. }));
    }

    #[test]
    fn test_unknown_switch_element_type() {
        let mut doc = sample();
        doc["_object"]["switch"] = frame(
            &["bus", "element", "et", "closed"],
            &[0],
            json!([[0, 0, "x", true]]),
        );
        let err = parse_pandapower_str(&doc.to_string()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown element type 'x'"));
    }

    #[test]
    fn test_duplicate_index_is_rejected() {
        let mut doc = sample();
        doc["_object"]["bus"] = frame(
            &["name", "vn_kv"],
            &[0, 0],
            json!([["a", 20.0], ["b", 20.0]]),
        );
        let err = parse_pandapower_str(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("index 0 already exists in the bus table"));
    }

    #[test]
    fn test_missing_tables_are_empty() {
        let doc = json!({
            "_module": "pandapower.auxiliary",
            "_class": "pandapowerNet",
            "_object": {}
        });
        let net = parse_pandapower_str(&doc.to_string()).unwrap();
        assert_eq!(net, Network::new());
    }
}
