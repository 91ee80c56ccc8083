// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Check command - data-integrity report for a graph file

use super::GlobalOpts;
use anyhow::{bail, Result};
use lcdi_engine::graph::{IntegrityReport, SupplyChainGraph};
use owo_colors::OwoColorize;
use serde_json::json;

/// Run the check command; `strict` turns findings into a failure
pub fn run(opts: &GlobalOpts, strict: bool) -> Result<()> {
    let graph = opts.load_graph()?;
    let report = graph.integrity_report();

    if opts.json {
        let flow: Vec<_> = report
            .flow_violations
            .iter()
            .map(|v| {
                json!({
                    "vertex": v.vertex,
                    "carrier": v.carrier,
                    "at_vertex": v.at_vertex,
                    "on_out_edges": v.on_out_edges,
                })
            })
            .collect();
        let doc = json!({
            "fingerprint": graph.fingerprint(),
            "vertices": graph.node_count(),
            "edges": graph.edge_count(),
            "clean": report.is_clean(),
            "back_edges": report.back_edges,
            "flow_violations": flow,
            "dead_ends": report.dead_ends,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_report(&graph, &report, opts.color());
    }

    if strict && !report.is_clean() {
        bail!("Graph has integrity findings");
    }
    Ok(())
}

fn print_report(graph: &SupplyChainGraph, report: &IntegrityReport, color: bool) {
    let sink = graph.vertex(graph.sink());
    println!(
        "Graph {}: {} vertices, {} edges, sink #{} '{}'",
        graph.fingerprint(),
        graph.node_count(),
        graph.edge_count(),
        sink.id,
        sink.name
    );

    let status = |ok: bool| -> String {
        match (ok, color) {
            (true, true) => "ok".green().to_string(),
            (true, false) => "ok".to_string(),
            (false, true) => "FAIL".red().to_string(),
            (false, false) => "FAIL".to_string(),
        }
    };

    println!("  [{}] acyclic", status(report.back_edges.is_empty()));
    for (from, to) in &report.back_edges {
        println!("      back-edge {from} -> {to}");
    }

    println!("  [{}] flow conservation", status(report.flow_violations.is_empty()));
    for v in &report.flow_violations {
        println!(
            "      vertex {} carrier {}: {} at vertex, {} on outgoing edges",
            v.vertex, v.carrier, v.at_vertex, v.on_out_edges
        );
    }

    println!("  [{}] every vertex reaches the sink", status(report.dead_ends.is_empty()));
    for id in &report.dead_ends {
        println!("      dead end {id}");
    }
}
