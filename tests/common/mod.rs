#![allow(dead_code)]

use simreport::{CodecContext, FileKind, ProbeFilter, ReportRegistry, ReportTree};

pub const NODES: &str = "\
Test network nodes
4 1.0 1.0
1 0.0 0.0 1 1 downtown gate
2 100.5 0.0 0 1
3 100.5 250.25 2 2 ramp
4 0.0 250.25 0 2
";

pub const EDGES: &str = "\
Test network edges
3 1000.0 3.6
1 1 2 100.5 50.0 1800.0 2 40.0 150.0 0 0 0 main street
2 2 3 250.25 60.0 1900.0 3 45.0 160.0 5 1 2
3 3 4 100.5 * 1800.0 1 40.0 150.0 -1 0 0 alley
";

pub const SIGNALS: &str = "\
Signal plan
2
5 90.0 0.0 2
1 40.0 3.0 2.0
2 40.0 3.0 2.0
7 60.0 15.0 1
1 55.0 3.0 2.0
";

pub const SUMMARY: &str = "\
SIMULATION SUMMARY
Simulation Duration (s) : 3600.0
Vehicles Generated : 1250
Average Speed (kph) : *

VEHICLE CLASS SUMMARY
Class  Trips  Vehicle-km  Vehicle-hours  Avg Speed (kph)  Fuel (l)  Stops/Veh
1 1000 5230.5 120.25 43.5 410.0 2.35
2 250 1800.0 40.0 45.0 300.5 1.10
";

pub const OVERVIEW: &str = "\
Simulation overview report

SIGNAL TIMING AT TIME: 900.0
5 1 40.0 3.0 90.0 0.0
5 2 40.0 3.0 90.0 0.0

LINK FLOW SUMMARY AT TIME: 900.0
1 1200 45.5 26.4 3.5
2 800 50.0 16.0 *

LINK FLOW SUMMARY AT TIME: 1800.0
1 1100 47.0 23.4 2.0

O-D STATISTICS FOR VEHICLE CLASS 1
1 4 120 310.5 2.5

O-D STATISTICS FOR ALL VEHICLES
1 4 150 305.0 2.5
4 1 90 280.0 2.4

NETWORK TOTALS
Vehicles Entered        1250
Vehicles Exited         1200
Vehicles In Network       50
Vehicle-km            7030.5
Vehicle-hours          160.25
Average Speed (kph)     43.9
Total Stops             2900
Fuel Used (l)          710.5

INCIDENTS
1 2 600.0 900.0 1
2 3 1200.0 1500.0 2
End of report
";

pub const PATHS: &str = "\
PATH TREE FOR ORIGIN 1 AT TIME: 0.0
2 12.5 1 1
3 30.0 2 1 2
4 45.5 3 1 2 3

PATH TREE FOR ORIGIN 4 AT TIME: 900.0
4 0.0 0
";

pub const AVG_V1_WIDTHS: [usize; 22] = [
    8, 8, 8, 12, 12, 10, 12, 14, 14, 10, 14, 12, 14, 14, 14, 14, 14, 12, 12, 14, 12, 15,
];
pub const AVG_V2_EXTRA_WIDTHS: [usize; 3] = [14, 14, 15];
pub const COND_WIDTHS: [usize; 10] = [6, 6, 6, 8, 8, 8, 9, 9, 7, 7];

/// Right-aligns each value in its column.
pub fn columns(widths: &[usize], values: &[&str]) -> String {
    assert_eq!(widths.len(), values.len(), "one value per column");
    widths
        .iter()
        .zip(values)
        .map(|(width, value)| format!("{:>width$}", value, width = width))
        .collect()
}

pub fn average_row_v1(link: &str) -> String {
    columns(
        &AVG_V1_WIDTHS,
        &[
            link, "1", "2", "0.50", "60.0", "120", "45.2", "40.5", "5.5", "1.25", "12.3", "900", "30.5", "1.2",
            "10.5", "2.25", "60.0", "3.5", "8.0", "0.0", "12", "60.0",
        ],
    )
}

pub fn average_row_v2(link: &str) -> String {
    let mut row = average_row_v1(link);
    row.push_str(&columns(&AVG_V2_EXTRA_WIDTHS, &["0.05", "12.5", "2.50"]));
    row
}

pub fn average_report(rows: &[String]) -> String {
    let mut text = String::from("AVERAGE LINK CONDITIONS\n  Link  From  To  ...\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

pub fn condition_row(link: &str, queue: &str) -> String {
    columns(
        &COND_WIDTHS,
        &[link, "1", "2", "1200", "45.5", "26.4", "8.0", "1.5", queue, "0.75"],
    )
}

pub fn conditions_report() -> String {
    format!(
        "LINK CONDITIONS AT TIME: 900.0\n  Link From To ...\n{}\n{}\n\n\
         LINK CONDITIONS AT TIME: 1800.0\n  Link From To ...\n{}\n",
        condition_row("1", "3.5"),
        condition_row("2", "*"),
        condition_row("1", "2.0"),
    )
}

/// Edge probe log with groups of 5, 3 and 7 records for edges 1, 2 and 3.
///
/// Edge 2 holds times 10, 20 and 30, listed out of order and interleaved
/// with the other edges.
pub fn edge_probe_report() -> String {
    let mut text = String::from("LINK PROBE RECORDS\n");
    for (i, edge_3_time) in [5.0f32, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0].iter().enumerate() {
        text.push_str(&format!("11 3 {} {:.1} 12.5 40.0 1.5 0.05\n", 300 + i, edge_3_time));
        if i < 5 {
            text.push_str(&format!("21 1 {} {:.1} 12.5 40.25 1.5 0.125 2 1\n", 100 + i, 10.0 * i as f32));
        }
    }
    text.push_str("11 2 202 30.0 9.0 44.0 0.5 0.04\n");
    text.push_str("11 2 200 10.0 9.0 44.0 0.5 0.04\n");
    text.push_str("21 2 201 20.0 9.5 42.5 0.7 0.045 0 1\n");
    text
}

/// Trip probe log with groups of 5, 3 and 7 trips for three O-D pairs.
pub fn trip_probe_report() -> String {
    let mut text = String::from("TRIP PROBE RECORDS\n");
    for i in 0..7 {
        text.push_str(&format!("{} 3 1 1 {}.0 {}.0 2.5 3 0.3\n", 300 + i, 100 * i, 100 * i + 250));
    }
    text.push_str("202 1 4 2 30.0 330.0 2.5 1 0.2\n");
    for i in 0..5 {
        text.push_str(&format!("{} 1 2 1 {}.0 {}.0 1.5 0 0.1\n", 100 + i, 50 * i, 50 * i + 120));
    }
    text.push_str("200 1 4 1 10.0 310.0 2.5 2 0.2\n");
    text.push_str("201 1 4 1 20.0 320.0 2.5 * 0.2\n");
    text
}

pub fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

pub fn ctx() -> CodecContext {
    CodecContext {
        simulation_id: 42,
        owner_id: 7,
    }
}

pub fn registry() -> ReportRegistry<impl Fn(&CodecContext, FileKind) -> bool> {
    ReportRegistry::new(|_: &CodecContext, _: FileKind| false)
}

pub fn encode(kind: FileKind, text: &str) -> Vec<u8> {
    registry()
        .encode(kind, &lines(text), &ctx())
        .unwrap_or_else(|e| panic!("encode {} failed: {}", kind, e))
        .unwrap_or_else(|| panic!("encode {} skipped", kind))
}

pub fn decode(kind: FileKind, blob: &[u8], filter: Option<&ProbeFilter>) -> ReportTree {
    registry()
        .decode(kind, blob, filter, &ctx())
        .unwrap_or_else(|e| panic!("decode {} failed: {}", kind, e))
}

/// One valid report per kind.
pub fn all_fixtures() -> Vec<(FileKind, String)> {
    vec![
        (FileKind::Overview, OVERVIEW.to_string()),
        (
            FileKind::AverageConditions,
            average_report(&[average_row_v1("101"), average_row_v1("102")]),
        ),
        (FileKind::Conditions, conditions_report()),
        (FileKind::Paths, PATHS.to_string()),
        (FileKind::Summary, SUMMARY.to_string()),
        (FileKind::TripProbes, trip_probe_report()),
        (FileKind::EdgeProbes, edge_probe_report()),
        (FileKind::Nodes, NODES.to_string()),
        (FileKind::Edges, EDGES.to_string()),
        (FileKind::Signals, SIGNALS.to_string()),
    ]
}
