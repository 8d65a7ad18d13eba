//! Phase configuration: plain, statically-shaped structs rather than the
//! teacher's dynamic `ConfigurationValue` grammar, since the configuration
//! surface here (§6) is small and fixed. `serde` derives give the external
//! CLI a `toml`-backed loader without this crate depending on a custom
//! parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Learning-phase configuration (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningConfig {
    pub node_count: usize,
    #[serde(default = "LearningConfig::default_hop_limit")]
    pub learning_hop_limit: u32,
    #[serde(default = "LearningConfig::default_delta")]
    pub inter_message_delta: u64,
    pub seed: u64,
}

impl LearningConfig {
    fn default_hop_limit() -> u32 {
        4
    }

    fn default_delta() -> u64 {
        4
    }

    pub fn new(node_count: usize, seed: u64) -> Self {
        LearningConfig {
            node_count,
            learning_hop_limit: Self::default_hop_limit(),
            inter_message_delta: Self::default_delta(),
            seed,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_count < 2 {
            return Err(Error::ConfigurationInvalid("node_count must be at least 2 (a message needs a distinct source and target)".into()));
        }
        if self.inter_message_delta == 0 {
            return Err(Error::ConfigurationInvalid("inter_message_delta must be positive".into()));
        }
        Ok(())
    }
}

/// Per-`node_count` hop-limit table for the comparison phase (§6), with a
/// fallback for node counts outside the standard presets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HopLimitTable {
    entries: BTreeMap<usize, u32>,
    default: u32,
}

impl HopLimitTable {
    /// `{10: 4, 50: 8, 100: 12, default: 6}`, the reference table.
    pub fn standard() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(10, 4);
        entries.insert(50, 8);
        entries.insert(100, 12);
        HopLimitTable { entries, default: 6 }
    }

    pub fn hop_limit_for(&self, node_count: usize) -> u32 {
        self.entries.get(&node_count).copied().unwrap_or(self.default)
    }
}

impl Default for HopLimitTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Comparison-phase configuration (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub message_count: usize,
    pub total_frames: u64,
    pub seed: u64,
    #[serde(default)]
    pub hop_limit_table: HopLimitTable,
}

impl ComparisonConfig {
    pub fn new(message_count: usize, total_frames: u64, seed: u64) -> Self {
        ComparisonConfig {
            message_count,
            total_frames,
            seed,
            hop_limit_table: HopLimitTable::standard(),
        }
    }

    pub fn hop_limit(&self, node_count: usize) -> u32 {
        self.hop_limit_table.hop_limit_for(node_count)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_frames == 0 {
            return Err(Error::ConfigurationInvalid("total_frames must be positive".into()));
        }
        if self.message_count == 0 {
            return Err(Error::ConfigurationInvalid("message_count must be positive (empty message set)".into()));
        }
        Ok(())
    }
}

/// The complete, serializable configuration of a run, for the external CLI
/// to load from a `main.cfg`-style file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub learning: LearningConfig,
    pub comparison: ComparisonConfig,
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigurationInvalid(format!("invalid configuration file: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        self.learning.validate()?;
        self.comparison.validate()?;
        Ok(())
    }
}

/// Supported CLI presets (§6): an optional preset flag selecting one of the
/// standard node counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeCountPreset {
    Small,
    Medium,
    Large,
}

impl NodeCountPreset {
    pub fn node_count(self) -> usize {
        match self {
            NodeCountPreset::Small => 10,
            NodeCountPreset::Medium => 50,
            NodeCountPreset::Large => 100,
        }
    }

    pub fn from_node_count(node_count: usize) -> Result<Self> {
        match node_count {
            10 => Ok(NodeCountPreset::Small),
            50 => Ok(NodeCountPreset::Medium),
            100 => Ok(NodeCountPreset::Large),
            other => Err(Error::ConfigurationInvalid(format!(
                "unsupported preset node_count {other}; expected one of 10, 50, 100"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_limit_table_matches_reference_values() {
        let table = HopLimitTable::standard();
        assert_eq!(table.hop_limit_for(10), 4);
        assert_eq!(table.hop_limit_for(50), 8);
        assert_eq!(table.hop_limit_for(100), 12);
        assert_eq!(table.hop_limit_for(17), 6);
    }

    #[test]
    fn single_node_learning_config_is_rejected() {
        let cfg = LearningConfig::new(1, 1);
        assert!(matches!(cfg.validate(), Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn zero_total_frames_is_rejected() {
        let cfg = ComparisonConfig::new(5, 0, 1);
        assert!(matches!(cfg.validate(), Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn empty_message_set_is_rejected() {
        let cfg = ComparisonConfig::new(0, 100, 1);
        assert!(matches!(cfg.validate(), Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn unsupported_preset_is_rejected() {
        assert!(NodeCountPreset::from_node_count(17).is_err());
        assert_eq!(NodeCountPreset::from_node_count(50).unwrap(), NodeCountPreset::Medium);
    }

    #[test]
    fn loads_from_toml() {
        let text = r#"
            [learning]
            node_count = 10
            seed = 42

            [comparison]
            message_count = 20
            total_frames = 200
            seed = 7
        "#;
        let cfg = SimulationConfig::from_toml_str(text).unwrap();
        assert_eq!(cfg.learning.learning_hop_limit, 4);
        assert_eq!(cfg.comparison.hop_limit(10), 4);
        cfg.validate().unwrap();
    }
}
