// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Paths command - probability-weighted routes from a vertex to the manufacturer

use super::GlobalOpts;
use anyhow::Result;
use lcdi_engine::types::{ProbPaths, VertexRef};
use owo_colors::OwoColorize;

/// Run the paths command
pub fn run(opts: &GlobalOpts, vertex: &str, carriers: &[String], include_zero: bool) -> Result<()> {
    let config = opts.load_config()?;
    let session = opts.open_session(&config)?;

    let result = session.extract_paths(&VertexRef::parse(vertex), carriers, include_zero)?;
    session.finish(false);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_paths(&result, opts.color());
    }
    Ok(())
}

fn print_paths(result: &ProbPaths, color: bool) {
    println!(
        "Paths from #{} to #{} ({} weighted, total probability {:.4})",
        result.source,
        result.destination,
        result.n_paths(),
        result.total_probability()
    );

    let ignored: Vec<_> = result
        .requested_carriers
        .iter()
        .filter(|c| !result.valid_carriers.contains(c))
        .collect();
    if !ignored.is_empty() {
        let names: Vec<&str> = ignored.iter().map(|c| c.as_str()).collect();
        println!("  no volume at source for: {}", names.join(", "));
    }
    println!();

    for p in &result.paths {
        let route = p
            .path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        let probability = format!("{:>7.4}", p.probability);
        if color {
            println!("  {}  {:<10} {}", probability.green(), p.carrier.cyan(), route);
        } else {
            println!("  {probability}  {:<10} {route}", p.carrier);
        }
    }
}
