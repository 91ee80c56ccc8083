// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - show the effective configuration

use super::GlobalOpts;
use anyhow::{Context, Result};

/// Print the whole configuration, or the value at a dotted `key`
pub fn run(opts: &GlobalOpts, key: Option<&str>) -> Result<()> {
    let config = opts.load_config()?;

    let Some(key) = key else {
        if opts.json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            print!("{}", config.to_toml()?);
        }
        return Ok(());
    };

    let root = serde_json::to_value(&config)?;
    let value = lookup(&root, key).with_context(|| format!("Unknown configuration key: {key}"))?;
    match value {
        serde_json::Value::String(s) => println!("{s}"),
        other => println!("{other}"),
    }
    Ok(())
}

fn lookup<'a>(root: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    key.split('.').try_fold(root, |node, part| node.get(part))
}
