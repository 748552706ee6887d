//! JSON exporter for external scene renderers.
//!
//! Exports recorded scene frames as JSON: sprites (position with bob,
//! color, frame index), connector lines and visible bubbles.

use agentscape_core::SceneFrame;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Failure writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single recorded frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Scene snapshot
    #[serde(flatten)]
    pub scene: SceneFrame,

    /// Events (pause, feed errors, etc.)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_frame(time_sec: f64) -> SimFrame {
        SimFrame {
            time_sec,
            scene: SceneFrame {
                clock_ms: (time_sec * 1000.0) as u64,
                scene_ms: (time_sec * 1000.0) as u64,
                paused: false,
                sprites: vec![],
                links: vec![],
                bubbles: vec![],
            },
            events: vec![],
        }
    }

    #[test]
    fn test_add_frame_tracks_duration() {
        let mut export = SimExport::new("wander", 42);
        export.add_frame(empty_frame(0.5));
        export.add_frame(empty_frame(1.0));

        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.duration_sec, 1.0);
    }

    #[test]
    fn test_frame_json_is_flat() {
        let value = serde_json::to_value(empty_frame(2.0)).unwrap();

        assert_eq!(value["time_sec"], 2.0);
        assert_eq!(value["clock_ms"], 2000);
        assert!(value["sprites"].is_array());
        assert!(value.get("events").is_none());
        assert!(value.get("scene").is_none());
    }

    #[test]
    fn test_write_to_file() {
        let mut export = SimExport::new("chatter", 7);
        export.add_frame(empty_frame(0.1));
        export.finalize(true, None);

        let path = std::env::temp_dir().join(format!("agentscape_export_{}.json", std::process::id()));
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: SimExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.scenario, "chatter");
        assert!(parsed.passed);
        assert_eq!(parsed.frames.len(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
