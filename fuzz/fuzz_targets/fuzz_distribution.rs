// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use lcdi_engine::estimators::Distribution;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(distribution) = Distribution::from_json(value) {
        let _ = distribution.mean();
        let _ = distribution.interval(0.95);
    }
});
