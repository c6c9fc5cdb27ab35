// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-plan report: assemble, validate, summarize.

use crate::config::Config;
use brooks_layout::{
    violations_to_json, Annotation, EntityKey, LayoutConfig, LayoutHandler, LayoutValidator,
    MapperOptions,
};
use geo::Area as _;
use serde::Serialize;

/// One area of an assembled plan.
#[derive(Debug, Clone, Serialize)]
pub struct AreaSummary {
    pub id: u64,
    pub area_type: String,
    pub net_area: f64,
}

/// Outcome of one plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub spaces: usize,
    pub areas: Vec<AreaSummary>,
    pub violations: serde_json::Value,
    pub blocking: usize,
}

impl PlanReport {
    pub fn failed(plan: &str, error: String) -> Self {
        Self {
            plan: plan.to_string(),
            error: Some(error),
            spaces: 0,
            areas: Vec::new(),
            violations: serde_json::Value::Array(Vec::new()),
            blocking: 0,
        }
    }

    /// Whether the plan should fail the run.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.blocking > 0
    }
}

/// Layout switches used by the CLI.
pub fn layout_config(config: &Config) -> LayoutConfig {
    LayoutConfig {
        scaled: true,
        classified: config.classify,
        postprocessed: config.postprocess,
        set_area_types_from_react_areas: config.classify,
        ..LayoutConfig::default()
    }
}

/// Assembles and validates one plan given its annotation JSON.
///
/// The handler lives only for this call, on the calling thread.
pub fn process_plan(plan: &str, json: &str, config: &Config) -> PlanReport {
    let annotation = match Annotation::from_json(json) {
        Ok(a) => a,
        Err(e) => return PlanReport::failed(plan, e.to_string()),
    };
    let options = MapperOptions {
        scale_factor: config.scale_factor,
        ..MapperOptions::default()
    };
    let handler = LayoutHandler::new(annotation, options);
    let layout = match handler.get_layout(layout_config(config)) {
        Ok(layout) => layout,
        Err(e) => {
            tracing::warn!(plan, error = %e, "failed to assemble layout");
            return PlanReport::failed(plan, e.to_string());
        }
    };

    let violations = LayoutValidator::new(&layout).validate();
    let blocking = violations.iter().filter(|v| v.is_blocking).count();
    let areas = layout
        .areas()
        .map(|(key, area)| AreaSummary {
            id: EntityKey::from(key).id(),
            area_type: area.area_type.to_string(),
            net_area: area.footprint.unsigned_area(),
        })
        .collect();

    tracing::info!(
        plan,
        spaces = layout.num_spaces(),
        areas = layout.num_areas(),
        violations = violations.len(),
        blocking,
        "processed plan"
    );
    PlanReport {
        plan: plan.to_string(),
        error: None,
        spaces: layout.num_spaces(),
        areas,
        violations: violations_to_json(&violations),
        blocking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        Config {
            scale_factor: 0.01,
            worker_threads: 1,
            postprocess: true,
            classify: true,
            pretty: false,
        }
    }

    #[test]
    fn test_malformed_json_is_reported_as_failure() {
        let report = process_plan("broken.json", "{ not json", &config());
        assert!(report.is_failure());
        assert!(report.error.is_some());
    }

    #[test]
    fn test_closed_room_report() {
        let plan = json!({
            "layers": {"0": {
                "vertices": {
                    "a": {"x": 0, "y": 0, "lines": ["s", "w"]},
                    "b": {"x": 400, "y": 0, "lines": ["s", "e"]},
                    "c": {"x": 400, "y": 400, "lines": ["e", "n"]},
                    "d": {"x": 0, "y": 400, "lines": ["n", "w"]}
                },
                "lines": {
                    "s": {"type": "wall", "vertices": ["a", "b"], "properties": {"width": 20}},
                    "e": {"type": "wall", "vertices": ["b", "c"], "properties": {"width": 20}},
                    "n": {"type": "wall", "vertices": ["c", "d"], "properties": {"width": 20}},
                    "w": {"type": "wall", "vertices": ["d", "a"], "properties": {"width": 20}}
                },
                "items": {
                    "st": {"type": "stairs", "x": 200, "y": 200, "properties": {"width": 100, "length": 200}}
                }
            }}
        });
        let report = process_plan("room.json", &plan.to_string(), &config());
        assert!(report.error.is_none(), "{:?}", report.error);
        assert_eq!(report.spaces, 1);
        assert_eq!(report.areas.len(), 1);
        assert_eq!(report.areas[0].area_type, "STAIRCASE");
        // 3.8 m x 3.8 m clear
        assert!((report.areas[0].net_area - 14.44).abs() < 1e-6);
        // Stairs give access, so the room is fine
        assert_eq!(report.violations, json!([]));
        assert!(!report.is_failure());
    }
}
