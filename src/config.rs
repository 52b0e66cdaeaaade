//! Lab configuration loaded from TOML.
//!
//! Every section may be omitted; missing sections take the course's
//! defaults. Several files can be layered with [`LabConfig::merge`].
//!
//! ```toml
//! [dashboard]
//! learning_rate = 0.3
//! tick_ms = 100
//!
//! [dashboard.limits]
//! max_weight_step = 2.0
//!
//! [descent]
//! start_position = -2.0
//!
//! [logging]
//! level = "debug"
//! ```
use crate::activations::ActivationKind;
use crate::descent::DescentParams;
use crate::error::{LabError, LabResult};
use crate::feedforward::Topology;
use crate::multilayer::MultiLayerParams;
use crate::toy::ToyParams;
use crate::training::{DashboardLimits, TrainingParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    #[serde(flatten)]
    pub params: TrainingParams,
    pub limits: DashboardLimits,
    pub tick_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            params: TrainingParams::default(),
            limits: DashboardLimits::default(),
            tick_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescentConfig {
    #[serde(flatten)]
    pub params: DescentParams,
    pub tick_ms: u64,
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            params: DescentParams::default(),
            tick_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptronConfig {
    #[serde(flatten)]
    pub topology: Topology,
    pub activation: ActivationKind,
    pub seed: u64,
}

impl Default for PerceptronConfig {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            activation: ActivationKind::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> LabResult<Level> {
        Level::from_str(&self.level)
            .map_err(|_| LabError::Config(format!("unknown log level `{}`", self.level)))
    }
}

/// Typed view of the `[section]` tables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct Sections {
    dashboard: Option<DashboardConfig>,
    descent: Option<DescentConfig>,
    toy: Option<ToyParams>,
    multilayer: Option<MultiLayerParams>,
    perceptron: Option<PerceptronConfig>,
    logging: Option<LoggingConfig>,
}

/// One or more config files layered together. The raw TOML is kept so
/// that merging only overrides the keys a later file actually sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabConfig {
    raw: toml::Table,
    sections: Sections,
}

impl LabConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> LabResult<Self> {
        let contents = fs::read_to_string(&path)?;
        contents.parse()
    }

    fn from_table(raw: toml::Table) -> LabResult<Self> {
        let sections: Sections = toml::Value::Table(raw.clone()).try_into()?;
        Ok(Self { raw, sections })
    }

    /// Merge configs where the second overwrites the first, key by key.
    /// Arrays are replaced whole.
    pub fn merge(self, other: Self) -> LabResult<Self> {
        let mut raw = self.raw;
        merge_tables(&mut raw, other.raw);
        Self::from_table(raw)
    }

    pub fn dashboard(&self) -> DashboardConfig {
        self.sections.dashboard.unwrap_or_default()
    }

    pub fn descent(&self) -> DescentConfig {
        self.sections.descent.unwrap_or_default()
    }

    pub fn toy(&self) -> ToyParams {
        self.sections.toy.unwrap_or_default()
    }

    pub fn multilayer(&self) -> MultiLayerParams {
        self.sections.multilayer.unwrap_or_default()
    }

    pub fn perceptron(&self) -> PerceptronConfig {
        self.sections.perceptron.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.sections.logging.clone().unwrap_or_default()
    }

    pub fn validate(&self) -> LabResult<()> {
        let dashboard = self.dashboard();
        let p = dashboard.params;
        finite(
            "dashboard",
            &[
                p.input,
                p.target,
                p.initial_weights.theta1,
                p.initial_weights.theta2,
                p.learning_rate,
            ],
        )?;
        positive("dashboard.learning_rate", p.learning_rate)?;
        let l = dashboard.limits;
        positive("dashboard.limits.convergence_threshold", l.convergence_threshold)?;
        positive("dashboard.limits.weight_limit", l.weight_limit)?;
        positive("dashboard.limits.input_limit", l.input_limit)?;
        positive("dashboard.limits.max_weight_step", l.max_weight_step)?;
        if l.history_len == 0 {
            return Err(LabError::Config("dashboard.limits.history_len must be at least 1".into()));
        }
        if dashboard.tick_ms == 0 {
            return Err(LabError::Config("dashboard.tick_ms must be positive".into()));
        }

        let descent = self.descent();
        finite("descent", &[descent.params.start_position, descent.params.learning_rate])?;
        positive("descent.learning_rate", descent.params.learning_rate)?;
        if descent.tick_ms == 0 {
            return Err(LabError::Config("descent.tick_ms must be positive".into()));
        }

        let t = self.toy();
        finite("toy", &[t.input, t.theta1, t.theta2, t.target])?;

        let m = self.multilayer();
        let values: Vec<f64> = m
            .inputs
            .iter()
            .chain(m.targets.iter())
            .chain(m.weights_layer1.iter().flatten())
            .chain(m.weights_layer2.iter().flatten())
            .copied()
            .collect();
        finite("multilayer", &values)?;

        self.perceptron().topology.validate()?;
        self.logging().level()?;
        Ok(())
    }
}

impl FromStr for LabConfig {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_table(toml::from_str(s)?)
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

fn finite(section: &str, values: &[f64]) -> LabResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(LabError::Config(format!("[{section}] contains a non-finite value")))
    }
}

fn positive(key: &str, value: f64) -> LabResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(LabError::Config(format!("{key} must be positive, got {value}")))
    }
}
