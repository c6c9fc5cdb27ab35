// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI configuration loaded from environment variables.

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Editor units to metres.
    pub scale_factor: f64,
    /// Number of plans processed in parallel.
    pub worker_threads: usize,
    /// Merge walls, railings and columns before deriving spaces.
    pub postprocess: bool,
    /// Assign area types from labels and features.
    pub classify: bool,
    /// Pretty-print the JSON reports.
    pub pretty: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            scale_factor: std::env::var("BROOKS_SCALE_FACTOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|f: &f64| f.is_finite() && *f > 0.0)
                .unwrap_or(0.01),
            worker_threads: std::env::var("BROOKS_WORKER_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get()),
            postprocess: env_flag("BROOKS_POSTPROCESS", true),
            classify: env_flag("BROOKS_CLASSIFY", true),
            pretty: env_flag("BROOKS_PRETTY", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
