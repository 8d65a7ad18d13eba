//! `Comparator`: runs both forwarding policies over an identical comparison
//! workload and aggregates per-category winners (§4, "Comparator").
//!
//! No corpus or `original_source/` precedent spells out exactly which
//! categories to compare or how ties are broken; this module's category
//! set and win rule are this crate's own design, built directly from the
//! three derived ratios §4.6 already defines.

use std::fmt;

use crate::config::ComparisonConfig;
use crate::error::Result;
use crate::phase::PhaseRunner;
use crate::policy::Policy;
use crate::statistics::ComparisonStats;

/// A single comparable metric between the two policies' comparison runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    NetworkEfficiency,
    ResourceEfficiency,
    AveragePathLength,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::NetworkEfficiency => write!(f, "network_efficiency"),
            Category::ResourceEfficiency => write!(f, "resource_efficiency"),
            Category::AveragePathLength => write!(f, "average_path_length"),
        }
    }
}

/// The winning policy for one category, or a tie. Shorter paths win for
/// `AveragePathLength`; higher values win for the two efficiency ratios.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    Policy(Policy),
    Tie,
}

/// Both policies' statistics on the identical workload, plus the per-category
/// winner.
pub struct ComparisonResult {
    pub flood: ComparisonStats,
    pub tree_aware: ComparisonStats,
    pub winners_by_category: Vec<(Category, Winner)>,
}

/// Runs `flood` then `tree_aware` over one `PhaseRunner`'s cached comparison
/// schedule (§4.5), since a `PhaseRunner` only generates that schedule once.
pub struct Comparator;

impl Comparator {
    pub fn compare(runner: &mut PhaseRunner, cfg: &ComparisonConfig, node_count: usize) -> Result<ComparisonResult> {
        let flood = runner.run_comparison(cfg, node_count, Policy::Flood)?;
        let tree_aware = runner.run_comparison(cfg, node_count, Policy::TreeAware)?;

        let winners_by_category = vec![
            (
                Category::NetworkEfficiency,
                rank_higher_wins(flood.statistics.network_efficiency(), tree_aware.statistics.network_efficiency()),
            ),
            (
                Category::ResourceEfficiency,
                rank_higher_wins(flood.statistics.resource_efficiency(), tree_aware.statistics.resource_efficiency()),
            ),
            (
                Category::AveragePathLength,
                rank_shorter_wins(flood.statistics.average_path_length(), tree_aware.statistics.average_path_length()),
            ),
        ];

        log::info!(
            "comparison complete: {} vs {} — winners {:?}",
            Policy::Flood,
            Policy::TreeAware,
            winners_by_category
        );

        Ok(ComparisonResult { flood, tree_aware, winners_by_category })
    }
}

fn rank_higher_wins(flood_value: f64, tree_aware_value: f64) -> Winner {
    if (flood_value - tree_aware_value).abs() < f64::EPSILON {
        Winner::Tie
    } else if flood_value > tree_aware_value {
        Winner::Policy(Policy::Flood)
    } else {
        Winner::Policy(Policy::TreeAware)
    }
}

fn rank_shorter_wins(flood_value: f64, tree_aware_value: f64) -> Winner {
    if flood_value == 0.0 && tree_aware_value == 0.0 {
        return Winner::Tie;
    }
    if (flood_value - tree_aware_value).abs() < f64::EPSILON {
        Winner::Tie
    } else if flood_value < tree_aware_value {
        Winner::Policy(Policy::Flood)
    } else {
        Winner::Policy(Policy::TreeAware)
    }
}
