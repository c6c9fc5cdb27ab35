// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brooks CLI - assemble and validate floor plan layouts.
//!
//! ```text
//! brooks-cli <plan.json>...
//! ```
//!
//! Prints one JSON report per plan to stdout, in argument order. Exits with
//! status 1 when any plan fails to assemble or has blocking violations.
//!
//! Configuration comes from `BROOKS_*` environment variables (see
//! [`config::Config`]), logging from `RUST_LOG`.

use anyhow::Context;
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod report;

use config::Config;
use report::{process_plan, PlanReport};

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr, reports to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,brooks_layout=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("usage: brooks-cli <plan.json>...");
        return Ok(ExitCode::from(2));
    }

    let config = Config::from_env();
    tracing::info!(
        plans = paths.len(),
        worker_threads = config.worker_threads,
        scale_factor = config.scale_factor,
        postprocess = config.postprocess,
        classify = config.classify,
        "Starting Brooks CLI"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("failed to initialize rayon thread pool")?;

    // One plan per task; each task owns its handler
    let reports: Vec<PlanReport> = paths
        .par_iter()
        .map(|path| {
            let plan = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(json) => process_plan(&plan, &json, &config),
                Err(e) => {
                    tracing::warn!(plan = %plan, error = %e, "failed to read plan");
                    PlanReport::failed(&plan, format!("failed to read {plan}: {e}"))
                }
            }
        })
        .collect();

    for report in &reports {
        let line = if config.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        println!("{line}");
    }

    let failures = reports.iter().filter(|r| r.is_failure()).count();
    if failures > 0 {
        tracing::warn!(failures, "some plans failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
