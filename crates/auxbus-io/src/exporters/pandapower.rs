//! pandapower JSON exporter
//!
//! Writes the topology tables in the layout [`crate::importers::pandapower`] reads: a
//! `pandapowerNet` wrapper whose tables are split-orient DataFrames serialized as strings.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use auxbus_core::{Network, TableId};
use serde::Serialize;
use serde_json::{json, Number, Value};
use tracing::info;

#[derive(Serialize)]
struct DataFrameObject {
    columns: Vec<String>,
    index: Vec<usize>,
    data: Vec<Vec<Value>>,
}

/// NaN and infinities become null, as pandas writes them.
fn f64_value(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn opt_str(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn id_value(id: impl TableId) -> Value {
    Value::Number(Number::from(id.value()))
}

fn make_dataframe(
    columns: &[(&str, &str)],
    index: Vec<usize>,
    rows: Vec<Vec<Value>>,
) -> Result<Value> {
    let dtype: serde_json::Map<String, Value> = columns
        .iter()
        .map(|(name, dtype)| (name.to_string(), Value::String(dtype.to_string())))
        .collect();
    let object = DataFrameObject {
        columns: columns.iter().map(|(name, _)| name.to_string()).collect(),
        index,
        data: rows,
    };
    let obj_str = serde_json::to_string(&object)?;
    Ok(json!({
        "_module": "pandas.core.frame",
        "_class": "DataFrame",
        "_object": obj_str,
        "orient": "split",
        "dtype": dtype,
        "is_multiindex": false,
        "is_multicolumn": false,
    }))
}

/// Build the pandapower JSON document for `network`.
pub fn network_to_pandapower_value(network: &Network) -> Result<Value> {
    let bus_table = make_dataframe(
        &[
            ("name", "object"),
            ("vn_kv", "float64"),
            ("type", "object"),
            ("zone", "object"),
            ("in_service", "bool"),
        ],
        network.bus.keys().map(|id| id.value()).collect(),
        network
            .bus
            .values()
            .map(|bus| {
                vec![
                    opt_str(&bus.name),
                    f64_value(bus.vn_kv),
                    Value::String(bus.bus_type.code().to_string()),
                    opt_str(&bus.zone),
                    Value::Bool(bus.in_service),
                ]
            })
            .collect(),
    )?;

    let line_table = make_dataframe(
        &[
            ("name", "object"),
            ("std_type", "object"),
            ("from_bus", "uint32"),
            ("to_bus", "uint32"),
            ("length_km", "float64"),
            ("in_service", "bool"),
        ],
        network.line.keys().map(|id| id.value()).collect(),
        network
            .line
            .values()
            .map(|line| {
                vec![
                    opt_str(&line.name),
                    opt_str(&line.std_type),
                    id_value(line.from_bus),
                    id_value(line.to_bus),
                    f64_value(line.length_km),
                    Value::Bool(line.in_service),
                ]
            })
            .collect(),
    )?;

    let trafo_table = make_dataframe(
        &[
            ("name", "object"),
            ("std_type", "object"),
            ("hv_bus", "uint32"),
            ("lv_bus", "uint32"),
            ("in_service", "bool"),
        ],
        network.trafo.keys().map(|id| id.value()).collect(),
        network
            .trafo
            .values()
            .map(|trafo| {
                vec![
                    opt_str(&trafo.name),
                    opt_str(&trafo.std_type),
                    id_value(trafo.hv_bus),
                    id_value(trafo.lv_bus),
                    Value::Bool(trafo.in_service),
                ]
            })
            .collect(),
    )?;

    let trafo3w_table = make_dataframe(
        &[
            ("name", "object"),
            ("std_type", "object"),
            ("hv_bus", "uint32"),
            ("mv_bus", "uint32"),
            ("lv_bus", "uint32"),
            ("in_service", "bool"),
        ],
        network.trafo3w.keys().map(|id| id.value()).collect(),
        network
            .trafo3w
            .values()
            .map(|trafo| {
                vec![
                    opt_str(&trafo.name),
                    opt_str(&trafo.std_type),
                    id_value(trafo.hv_bus),
                    id_value(trafo.mv_bus),
                    id_value(trafo.lv_bus),
                    Value::Bool(trafo.in_service),
                ]
            })
            .collect(),
    )?;

    // The winding of a t3 switch is implied by its bus and not written.
    let switch_table = make_dataframe(
        &[
            ("bus", "int64"),
            ("element", "int64"),
            ("et", "object"),
            ("type", "object"),
            ("closed", "bool"),
            ("name", "object"),
        ],
        network.switch.keys().map(|id| id.value()).collect(),
        network
            .switch
            .values()
            .map(|switch| {
                vec![
                    id_value(switch.bus),
                    Value::Number(Number::from(switch.element.index())),
                    Value::String(switch.element.et().to_string()),
                    opt_str(&switch.switch_type),
                    Value::Bool(switch.closed),
                    opt_str(&switch.name),
                ]
            })
            .collect(),
    )?;

    let geodata_table = make_dataframe(
        &[("x", "float64"), ("y", "float64")],
        network.bus_geodata.keys().map(|id| id.value()).collect(),
        network
            .bus_geodata
            .values()
            .map(|geo| vec![f64_value(geo.x), f64_value(geo.y)])
            .collect(),
    )?;

    Ok(json!({
        "_module": "pandapower.auxiliary",
        "_class": "pandapowerNet",
        "_object": {
            "bus": bus_table,
            "line": line_table,
            "trafo": trafo_table,
            "trafo3w": trafo3w_table,
            "switch": switch_table,
            "bus_geodata": geodata_table,
        }
    }))
}

/// Export a network to a pandapower JSON file.
pub fn export_network_to_pandapower(network: &Network, output_path: &Path) -> Result<()> {
    let payload = network_to_pandapower_value(network)?;
    let output = serde_json::to_string_pretty(&payload)?;
    fs::write(output_path, output)
        .with_context(|| format!("writing pandapower JSON to '{}'", output_path.display()))?;
    info!(path = %output_path.display(), "exported pandapower network");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auxbus_core::{BusOptions, ElementOptions, SwitchElement, SwitchOptions, Winding};

    fn inner_frame(doc: &Value, table: &str) -> Value {
        let object = doc["_object"][table]["_object"].as_str().unwrap();
        serde_json::from_str(object).unwrap()
    }

    #[test]
    fn test_switch_table_layout() {
        let mut net = Network::new();
        let hv = net.create_bus(110.0, BusOptions::named("HV")).unwrap();
        let mv = net.create_bus(20.0, BusOptions::default()).unwrap();
        let lv = net.create_bus(10.0, BusOptions::default()).unwrap();
        let t = net
            .create_transformer3w(hv, mv, lv, "t3", ElementOptions::default())
            .unwrap();
        net.create_switch(
            lv,
            SwitchElement::Trafo3w(t, Winding::Lv),
            false,
            SwitchOptions::default().with_index(5).with_type("LS"),
        )
        .unwrap();

        let doc = network_to_pandapower_value(&net).unwrap();
        assert_eq!(doc["_class"], "pandapowerNet");
        assert_eq!(doc["_object"]["switch"]["orient"], "split");
        assert_eq!(doc["_object"]["switch"]["dtype"]["et"], "object");

        let switch = inner_frame(&doc, "switch");
        assert_eq!(switch["index"], json!([5]));
        assert_eq!(switch["data"], json!([[2, 0, "t3", "LS", false, null]]));

        let bus = inner_frame(&doc, "bus");
        assert_eq!(bus["data"][0], json!(["HV", 110.0, "b", null, true]));
    }

    #[test]
    fn test_nan_becomes_null() {
        let mut net = Network::new();
        let b0 = net.create_bus(f64::NAN, BusOptions::default()).unwrap();
        net.create_line(b0, b0, f64::NAN, "cable", ElementOptions::default())
            .unwrap();
        let doc = network_to_pandapower_value(&net).unwrap();
        assert_eq!(inner_frame(&doc, "bus")["data"][0][1], Value::Null);
        assert_eq!(inner_frame(&doc, "line")["data"][0][4], Value::Null);
    }
}
