// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Estimate command - remaining delivery time for one shipment

use super::GlobalOpts;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lcdi_engine::blend::{BlendOutcome, MixtureBlender};
use lcdi_engine::estimators::{alpha, AlphaInput, Distribution, TransitTimeInput};
use lcdi_engine::path_time::PathTimeInput;
use lcdi_engine::time::TimeSequence;
use lcdi_engine::types::VertexRef;
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Arguments of the estimate command
#[derive(Debug, Clone)]
pub struct EstimateArgs {
    /// Current vertex (id or name)
    pub vertex: String,
    /// Carriers that may handle the shipment
    pub carriers: Vec<String>,
    /// When the order was placed
    pub order_time: DateTime<Utc>,
    /// When the shipment left the supplier
    pub shipment_time: DateTime<Utc>,
    /// When the shipment reached its current vertex
    pub event_time: DateTime<Utc>,
    /// Point in time the estimate is for (now if omitted)
    pub estimation_time: Option<DateTime<Utc>>,
    /// JSON file with the lane's shipment-time distribution
    pub distribution: PathBuf,
    /// Fixed blend weight, bypassing the configured calculator
    pub alpha: Option<f64>,
    /// Branch-skipping tolerance override
    pub tolerance: Option<f64>,
    /// Run both branches one after the other
    pub sequential: bool,
}

/// Run the estimate command
pub fn run(opts: &GlobalOpts, args: EstimateArgs) -> Result<()> {
    let config = opts.load_config()?;
    let times = TimeSequence::new(
        args.order_time,
        args.shipment_time,
        args.event_time,
        args.estimation_time.unwrap_or_else(Utc::now),
    )?;
    let distribution = read_distribution(&args.distribution)?;
    info!("Estimating at {} ({} stage)", times.estimation_time(), times.stage());

    let session = Arc::new(opts.open_session(&config)?);
    let blender = MixtureBlender::from_config(Arc::clone(&session), &config)?;

    let pt_input = PathTimeInput {
        vertex: VertexRef::parse(&args.vertex),
        carriers: args.carriers,
    };
    let tt_input = TransitTimeInput {
        distribution: distribution.clone(),
    };
    let parallel = config.blend.parallel && !args.sequential;
    let tolerance = args.tolerance.unwrap_or(config.blend.tolerance);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let outcome = runtime.block_on(async {
        match args.alpha {
            Some(value) => {
                blender
                    .execute(value, &pt_input, &tt_input, &times, parallel, tolerance)
                    .await
            }
            None => {
                let calculator = alpha::from_params(&config.alpha)?;
                blender
                    .run(
                        calculator.as_ref(),
                        &AlphaInput { distribution },
                        &pt_input,
                        &tt_input,
                        &times,
                        parallel,
                        tolerance,
                    )
                    .await
            }
        }
    })?;
    session.finish(false);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, opts.color());
    }
    Ok(())
}

fn read_distribution(path: &Path) -> Result<Distribution> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read distribution from {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse distribution in {}", path.display()))?;
    Ok(Distribution::from_json(value)?)
}

fn print_outcome(outcome: &BlendOutcome, color: bool) {
    let blend = format!("[{:.2}, {:.2}] h", outcome.blend.lower, outcome.blend.upper);
    if color {
        println!("Remaining time {}", blend.bold().green());
    } else {
        println!("Remaining time {blend}");
    }
    println!(
        "  alpha {:.4} (tolerance {}, computed {:?})",
        outcome.alpha, outcome.blend.tolerance, outcome.blend.computed
    );
    println!(
        "  path time     [{:.2}, {:.2}] h over {} paths",
        outcome.path_time.lower, outcome.path_time.upper, outcome.path_time.n_paths
    );
    println!(
        "  transit time  [{:.2}, {:.2}] h at {:.0}%",
        outcome.transit_time.lower,
        outcome.transit_time.upper,
        outcome.transit_time.confidence * 100.0
    );

    for p in &outcome.path_time.paths {
        println!(
            "    p={:.4} {:<8} [{:.2}, {:.2}] {:?}",
            p.prob_path.probability, p.prob_path.carrier, p.lower, p.upper, p.prob_path.path
        );
    }

    for (name, records) in [
        ("traffic", &outcome.path_time.traffic_records),
        ("weather", &outcome.path_time.weather_records),
    ] {
        for r in records {
            let mode = r.transport_mode.map(|m| format!(" {m}")).unwrap_or_default();
            println!(
                "    {name} {} -> {}{mode} at {}: {:.3}",
                r.source_id,
                r.destination_id,
                r.departure_time.to_rfc3339(),
                r.value
            );
        }
    }
}
