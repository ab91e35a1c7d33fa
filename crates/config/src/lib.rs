// IrqLab - Interrupt Injection Sandbox
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default schema version for YAML scenarios
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_line() -> u32 {
    // The software-generated interrupt ID the original GIC demo used (0x0E).
    14
}

fn default_iterations() -> u64 {
    20
}

fn default_tick_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

fn default_samples() -> u64 {
    10
}

fn default_period_ms() -> u64 {
    1000
}

/// Scenario for the interrupt demo: which line to arm, how long the loop
/// runs, and at which iterations the scripted button reads as pressed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InterruptScenario {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_line")]
    pub line: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Loop iterations (0-based) at which the button reads as pressed.
    #[serde(default)]
    pub presses: Vec<u64>,
    /// Whether the loop clears the completion signal after observing it.
    #[serde(default = "default_true")]
    pub auto_rearm: bool,
}

impl Default for InterruptScenario {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: String::new(),
            line: default_line(),
            iterations: default_iterations(),
            tick_ms: default_tick_ms(),
            presses: Vec::new(),
            auto_rearm: true,
        }
    }
}

/// Scenario for the sensor demo.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SensorScenario {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_samples")]
    pub samples: u64,
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Sample indices at which the synthetic sensor reports a bus fault.
    #[serde(default)]
    pub transfer_faults: Vec<u64>,
    /// Sample indices at which the synthetic sensor reports a CRC fault.
    #[serde(default)]
    pub crc_faults: Vec<u64>,
}

impl Default for SensorScenario {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: String::new(),
            samples: default_samples(),
            period_ms: default_period_ms(),
            transfer_faults: Vec::new(),
            crc_faults: Vec::new(),
        }
    }
}

/// Top-level scenario manifest. Either section may be omitted; the demos
/// fall back to their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ScenarioManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub interrupt: Option<InterruptScenario>,
    #[serde(default)]
    pub sensor: Option<SensorScenario>,
}

pub fn load_scenario(path: &Path) -> Result<ScenarioManifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
    let manifest: ScenarioManifest = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse scenario YAML: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "scenario loaded");
    Ok(manifest)
}
