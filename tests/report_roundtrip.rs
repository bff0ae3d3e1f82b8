mod common;

use common::*;
use simreport::report::codec::line_format::LineFormat;
use simreport::report::codec::scanner::Row;
use simreport::{FileKind, Location, Record, ReportError, ReportTree, Value};

/// Parses a text line the way the encoder does, for comparison with the
/// decoded record.
fn reference_row(descriptor: &str, names: &[&'static str], kind: FileKind, line: &str) -> Record {
    LineFormat::parse(descriptor, names)
        .expect("reference descriptor")
        .parse_row(kind, &Row::tokens(0, line))
        .expect("reference row")
}

#[test]
fn nodes_and_edges_scenario() {
    let ReportTree::Nodes(network) = decode(FileKind::Nodes, &encode(FileKind::Nodes, NODES), None) else {
        panic!("expected a node network");
    };
    assert_eq!(network.title, "Test network nodes");
    assert_eq!((network.x_scale, network.y_scale), (1.0, 1.0));
    assert_eq!(network.nodes.len(), 4, "all four nodes decode");

    let expected = [
        (1, 0.0, 0.0, 1, 1, Some("downtown gate")),
        (2, 100.5, 0.0, 0, 1, None),
        (3, 100.5, 250.25, 2, 2, Some("ramp")),
        (4, 0.0, 250.25, 0, 2, None),
    ];
    for (node, (id, x, y, node_type, zone, tag)) in network.nodes.iter().zip(expected) {
        assert_eq!(node.id, id);
        assert_eq!(node.x, x, "x of node {}", id);
        assert_eq!(node.y, y, "y of node {}", id);
        assert_eq!(node.node_type, node_type, "type of node {}", id);
        assert_eq!(node.zone, zone, "zone of node {}", id);
        assert_eq!(node.tag.as_deref(), tag, "tag of node {}", id);
    }

    let ReportTree::Edges(edges) = decode(FileKind::Edges, &encode(FileKind::Edges, EDGES), None) else {
        panic!("expected an edge network");
    };
    assert_eq!(edges.title, "Test network edges");
    assert_eq!((edges.length_scale, edges.speed_scale), (1000.0, 3.6));
    assert_eq!(edges.edges.len(), 3);

    let first = &edges.edges[0];
    assert_eq!((first.id, first.from, first.to), (1, 1, 2));
    assert_eq!(first.length, 100.5);
    assert_eq!(first.saturation_flow, 1800.0);
    assert_eq!(first.lanes, 2);
    assert_eq!(first.tag.as_deref(), Some("main street"));

    let second = &edges.edges[1];
    assert_eq!((second.signal, second.phase_1, second.phase_2), (5, 1, 2));
    assert_eq!(second.tag, None, "an empty tag decodes as absent");

    let third = &edges.edges[2];
    assert_eq!(third.free_speed, -1.0, "unavailable speed reads as -1");
    assert_eq!(third.signal, -1);
    assert_eq!(third.tag.as_deref(), Some("alley"));
}

#[test]
fn empty_tag_writes_a_zero_length_string() {
    let text = "T\n1 1.0 1.0\n9 1.0 2.0 0 0\n";
    let blob = encode(FileKind::Nodes, text);
    // title (1 + 1) + header (4 + 4 + 4) + node (4 + 4 + 4 + 1 + 2) + empty tag (1)
    assert_eq!(blob.len(), 2 + 12 + 15 + 1);
    assert_eq!(*blob.last().unwrap(), 0, "tag length byte is zero");
}

#[test]
fn signals_keep_their_phases() {
    let ReportTree::Signals(plan) = decode(FileKind::Signals, &encode(FileKind::Signals, SIGNALS), None) else {
        panic!("expected a signal plan");
    };
    assert_eq!(plan.title, "Signal plan");
    assert_eq!(plan.signals.len(), 2);
    assert_eq!(plan.signals[0].id, 5);
    assert_eq!(plan.signals[0].cycle, 90.0);
    assert_eq!(plan.signals[0].phases.len(), 2);
    assert_eq!(plan.signals[0].phases[1].phase, 2);
    assert_eq!(plan.signals[1].offset, 15.0);
    assert_eq!(plan.signals[1].phases.len(), 1);
    assert_eq!(plan.signals[1].phases[0].green, 55.0);
}

#[test]
fn signal_with_missing_phase_lines_is_malformed() {
    let text = "Plan\n1\n5 90.0 0.0 3\n1 40.0 3.0 2.0\n";
    let err = registry().encode(FileKind::Signals, &lines(text), &ctx()).unwrap_err();
    match err {
        ReportError::MalformedReport { kind, at, .. } => {
            assert_eq!(kind, FileKind::Signals);
            assert_eq!(at, Location::Line(4), "the first missing phase line");
        }
        other => panic!("expected MalformedReport, got {:?}", other),
    }
}

#[test]
fn summary_round_trip() {
    let ReportTree::Summary(summary) = decode(FileKind::Summary, &encode(FileKind::Summary, SUMMARY), None) else {
        panic!("expected a run summary");
    };
    let labels: Vec<&str> = summary.statistics.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["Simulation Duration (s)", "Vehicles Generated", "Average Speed (kph)"]);
    assert_eq!(summary.statistics[0].value, 3600.0);
    assert_eq!(summary.statistics[2].value, -1.0);

    let names = [
        "Class",
        "Trips",
        "Vehicle-km",
        "Vehicle-hours",
        "Avg Speed (kph)",
        "Fuel (l)",
        "Stops/Veh",
    ];
    assert_eq!(
        summary.classes,
        vec![
            reference_row("biffffc2", &names, FileKind::Summary, "1 1000 5230.5 120.25 43.5 410.0 2.35"),
            reference_row("biffffc2", &names, FileKind::Summary, "2 250 1800.0 40.0 45.0 300.5 1.10"),
        ]
    );
    assert_eq!(summary.classes[0].get("Stops/Veh"), Some(Value::Fixed(2.35)));
}

#[test]
fn overview_round_trip() {
    let ReportTree::Overview(overview) = decode(FileKind::Overview, &encode(FileKind::Overview, OVERVIEW), None)
    else {
        panic!("expected an overview");
    };

    assert_eq!(overview.signal_timings.len(), 1);
    assert_eq!(overview.signal_timings[0].time, 900.0);
    assert_eq!(overview.signal_timings[0].rows.len(), 2);

    let flow_names = ["Link", "Flow (vph)", "Speed (kph)", "Density (veh/km)", "Queue (veh)"];
    assert_eq!(overview.link_flow_periods.len(), 2);
    assert_eq!(overview.link_flow_periods[1].time, 1800.0);
    assert_eq!(
        overview.link_flow_periods[0].rows[1],
        reference_row("iiffc1", &flow_names, FileKind::Overview, "2 800 50.0 16.0 *")
    );
    assert_eq!(overview.link_flow_periods[0].rows[1].get("Queue (veh)"), Some(Value::Fixed(-1.0)));

    assert_eq!(overview.od_stats_by_class.len(), 1);
    assert_eq!(overview.od_stats_by_class[0].class, 1);
    assert_eq!(overview.od_stats_overall.len(), 2);
    assert_eq!(overview.od_stats_overall[1].get("Trips"), Some(Value::Int(90)));

    let totals = overview.network_totals;
    assert_eq!(totals.vehicles_entered, 1250.0);
    assert_eq!(totals.vehicles_in_network, 50.0);
    assert_eq!(totals.vehicle_hours, 160.25);
    assert_eq!(totals.fuel_litres, 710.5);

    assert_eq!(overview.incidents.len(), 2);
    assert_eq!(overview.incidents[1].get("Lanes Blocked"), Some(Value::Int(2)));

    let json = serde_json::to_value(&overview).expect("serialises");
    assert_eq!(json["network_totals"]["Avg Speed (kph)"], serde_json::json!(43.9f32));
    assert_eq!(json["link_flow_periods"][0]["rows"][0]["Flow (vph)"], serde_json::json!(1200));
}

#[test]
fn overview_sections_may_come_in_any_order() {
    let text = "\
NETWORK TOTALS
a 1
b 2
c 3
d 4
e 5
f 6
g 7
h 8
INCIDENTS
1 2 600.0 900.0 1
LINK FLOW SUMMARY AT TIME: 60.0
1 1200 45.5 26.4 3.5
";
    let ReportTree::Overview(overview) = decode(FileKind::Overview, &encode(FileKind::Overview, text), None) else {
        panic!("expected an overview");
    };
    assert_eq!(overview.network_totals.fuel_litres, 8.0);
    assert_eq!(overview.incidents.len(), 1, "incident table ends at the marker");
    assert_eq!(overview.link_flow_periods.len(), 1);
    assert!(overview.od_stats_overall.is_empty());
}

#[test]
fn overview_requires_network_totals_once() {
    let missing = "SIGNAL TIMING AT TIME: 1.0\n5 1 40.0 3.0 90.0 0.0\n";
    assert!(matches!(
        registry().encode(FileKind::Overview, &lines(missing), &ctx()),
        Err(ReportError::MalformedReport { .. })
    ));

    let short = "NETWORK TOTALS\n1\n2\n3\n";
    assert!(matches!(
        registry().encode(FileKind::Overview, &lines(short), &ctx()),
        Err(ReportError::MalformedReport { .. })
    ));

    let twice = format!("{}\n{}", "NETWORK TOTALS\n1\n2\n3\n4\n5\n6\n7\n8", "NETWORK TOTALS\n1\n2\n3\n4\n5\n6\n7\n8");
    match registry().encode(FileKind::Overview, &lines(&twice), &ctx()) {
        Err(ReportError::MalformedReport { at, .. }) => assert_eq!(at, Location::Line(9)),
        other => panic!("duplicate totals should be malformed, got {:?}", other),
    }
}

#[test]
fn average_conditions_dispatch_on_row_length() {
    let v1 = average_report(&[average_row_v1("101"), average_row_v1("102")]);
    assert_eq!(average_row_v1("1").len(), 269);
    let ReportTree::AverageConditions(report) = decode(
        FileKind::AverageConditions,
        &encode(FileKind::AverageConditions, &v1),
        None,
    ) else {
        panic!("expected average conditions");
    };
    assert_eq!(report.version, 1);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].len(), 22);
    assert_eq!(report.rows[1].get("Link"), Some(Value::Int(102)));
    assert_eq!(report.rows[0].get("Stops"), Some(Value::Fixed(1.25)));
    assert_eq!(report.rows[0].get("Max Queue (veh)"), Some(Value::Fixed(8.0)));

    let v2 = average_report(&[average_row_v2("201")]);
    assert_eq!(average_row_v2("1").len(), 312);
    let ReportTree::AverageConditions(report) = decode(
        FileKind::AverageConditions,
        &encode(FileKind::AverageConditions, &v2),
        None,
    ) else {
        panic!("expected average conditions");
    };
    assert_eq!(report.version, 2);
    assert_eq!(report.rows[0].len(), 25);
    assert_eq!(report.rows[0].get("Toll ($)"), Some(Value::Fixed(2.5)));
}

#[test]
fn average_conditions_reject_other_lengths() {
    let mut odd = average_row_v1("101");
    odd.push(' ');
    let text = average_report(&[average_row_v1("100"), odd]);
    match registry().encode(FileKind::AverageConditions, &lines(&text), &ctx()) {
        Err(ReportError::MalformedReport { kind, at, .. }) => {
            assert_eq!(kind, FileKind::AverageConditions);
            assert_eq!(at, Location::Line(3));
        }
        other => panic!("a 270-column row should be malformed, got {:?}", other),
    }

    let mixed = average_report(&[average_row_v1("100"), average_row_v2("101")]);
    assert!(matches!(
        registry().encode(FileKind::AverageConditions, &lines(&mixed), &ctx()),
        Err(ReportError::MalformedReport { .. })
    ));
}

#[test]
fn conditions_round_trip() {
    let ReportTree::Conditions(report) = decode(
        FileKind::Conditions,
        &encode(FileKind::Conditions, &conditions_report()),
        None,
    ) else {
        panic!("expected condition slices");
    };
    assert_eq!(report.slices.len(), 2);
    assert_eq!(report.slices[0].time, 900.0);
    assert_eq!(report.slices[0].rows.len(), 2);
    assert_eq!(report.slices[1].time, 1800.0);
    assert_eq!(report.slices[1].rows.len(), 1);

    let row = &report.slices[0].rows[0];
    assert_eq!(row.get("Flow (vph)"), Some(Value::Int(1200)));
    assert_eq!(row.get("Speed (kph)"), Some(Value::Float(45.5)));
    assert_eq!(row.get("Queue (veh)"), Some(Value::Fixed(3.5)));
    assert_eq!(row.get("Stops"), Some(Value::Fixed(0.75)));
    assert_eq!(report.slices[0].rows[1].get("Queue (veh)"), Some(Value::Fixed(-1.0)));
}

#[test]
fn paths_round_trip() {
    let ReportTree::Paths(report) = decode(FileKind::Paths, &encode(FileKind::Paths, PATHS), None) else {
        panic!("expected path trees");
    };
    assert_eq!(report.trees.len(), 2);
    let tree = &report.trees[0];
    assert_eq!((tree.origin, tree.time), (1, 0.0));
    assert_eq!(tree.entries.len(), 3);
    assert_eq!(tree.entries[2].destination, 4);
    assert_eq!(tree.entries[2].cost, 45.5);
    assert_eq!(tree.entries[2].links, vec![1, 2, 3]);
    assert_eq!(report.trees[1].time, 900.0);
    assert!(report.trees[1].entries[0].links.is_empty());
}

#[test]
fn path_hop_count_must_match_links() {
    let text = "PATH TREE FOR ORIGIN 1 AT TIME: 0.0\n2 12.5 2 1\n";
    match registry().encode(FileKind::Paths, &lines(text), &ctx()) {
        Err(ReportError::MalformedReport { at, .. }) => assert_eq!(at, Location::Line(1)),
        other => panic!("expected MalformedReport, got {:?}", other),
    }
}

#[test]
fn every_kind_round_trips_and_reencodes_identically() {
    for (kind, text) in all_fixtures() {
        let blob = encode(kind, &text);
        let again = encode(kind, &text);
        assert_eq!(blob, again, "{} encoding is deterministic", kind);

        let first = decode(kind, &blob, None);
        let second = decode(kind, &again, None);
        assert_eq!(first, second, "{} decodes identically", kind);
        serde_json::to_string(&first).unwrap_or_else(|e| panic!("{} tree serialises: {}", kind, e));
    }
}

#[test]
fn crlf_line_endings_are_accepted() {
    let crlf: Vec<String> = NODES.lines().map(|l| format!("{}\r\n", l)).collect();
    let blob = registry()
        .encode(FileKind::Nodes, &crlf, &ctx())
        .expect("encode")
        .expect("not stored yet");
    assert_eq!(blob, encode(FileKind::Nodes, NODES));
}
