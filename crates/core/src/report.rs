//! The Cluster Report: aggregate statistics over one run's resolutions, used
//! to judge whether the clustering stayed healthy (not too fragmented, not
//! dumping everything into Misc, not exceeding the folder size cap).

use std::collections::HashMap;

use crate::rules::Candidate;

/// One item's final resolution: where it landed, which rule (or special
/// value — `cache`, `override`, `normalized`, `misc`) won, the
/// pre-normalization cluster key it started from, the score of the winning
/// candidate, the cluster key actually used to build `path`, and whichever
/// lower-precedence candidates lost to the winner.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub item_id: String,
    pub path: String,
    pub winning_rule: String,
    pub initial_root: String,
    pub score: f64,
    pub final_cluster_key: String,
    pub runner_ups: Vec<Candidate>,
}

/// Run-identifying metadata carried alongside a report's statistics, so a
/// report can be matched back to the config and persistent-map schema that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub config_hash: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterReport {
    pub meta: ReportMeta,
    pub total_items: usize,
    pub rule_counts: HashMap<String, u32>,
    pub folder_counts: HashMap<String, u32>,
    pub rerouted_count: u32,
    pub unmapped_count: u32,
    pub misc_share: f64,
    pub singleton_rate: f64,
    pub reroute_share: f64,
    pub fragmentation: f64,
    pub median_files_per_folder: f64,
    pub capacity_constraint_ok: bool,
    pub largest_folder_size: u32,
}

fn top_level_folder(path: &str) -> &str {
    path.split('/').nth(1).unwrap_or(path)
}

pub fn compute(
    results: &[ResolutionResult],
    max_folder_size: usize,
    config_hash: &str,
    schema_version: u32,
) -> ClusterReport {
    let mut rule_counts: HashMap<String, u32> = HashMap::new();
    let mut folder_counts: HashMap<String, u32> = HashMap::new();
    let mut unmapped_count = 0u32;
    let mut rerouted_count = 0u32;

    for result in results {
        *rule_counts.entry(result.winning_rule.clone()).or_insert(0) += 1;
        *folder_counts
            .entry(top_level_folder(&result.path).to_string())
            .or_insert(0) += 1;

        if result.winning_rule != "cache" && result.winning_rule != "override" {
            unmapped_count += 1;
            if result.initial_root != top_level_folder(&result.path) {
                rerouted_count += 1;
            }
        }
    }

    let total_items = results.len();
    let misc_share = folder_counts.get("Misc").copied().unwrap_or(0) as f64 / total_items.max(1) as f64;

    let num_folders = folder_counts.len();
    let singleton_folders = folder_counts.values().filter(|&&c| c == 1).count();
    let singleton_rate = if num_folders == 0 {
        0.0
    } else {
        singleton_folders as f64 / num_folders as f64
    };

    let reroute_share = if unmapped_count == 0 {
        0.0
    } else {
        rerouted_count as f64 / unmapped_count as f64
    };

    let has_misc = folder_counts.contains_key("Misc");
    let small_folders = folder_counts
        .iter()
        .filter(|(name, count)| name.as_str() != "Misc" && **count < 3)
        .count();
    let fragmentation_denominator = if has_misc {
        num_folders.saturating_sub(1)
    } else {
        num_folders
    };
    let fragmentation = if fragmentation_denominator == 0 {
        0.0
    } else {
        small_folders as f64 / fragmentation_denominator as f64
    };

    let median_files_per_folder = median(folder_counts.values().copied());

    let capacity_constraint_ok = folder_counts
        .iter()
        .all(|(name, count)| name == "Misc" || (*count as usize) <= max_folder_size);

    let largest_folder_size = folder_counts.values().copied().max().unwrap_or(0);

    ClusterReport {
        meta: ReportMeta {
            config_hash: config_hash.to_string(),
            schema_version,
        },
        total_items,
        rule_counts,
        folder_counts,
        rerouted_count,
        unmapped_count,
        misc_share,
        singleton_rate,
        reroute_share,
        fragmentation,
        median_files_per_folder,
        capacity_constraint_ok,
        largest_folder_size,
    }
}

fn median(values: impl Iterator<Item = u32>) -> f64 {
    let mut sorted: Vec<u32> = values.collect();
    sorted.sort_unstable();
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, path: &str, rule: &str, initial_root: &str) -> ResolutionResult {
        ResolutionResult {
            item_id: id.to_string(),
            path: path.to_string(),
            winning_rule: rule.to_string(),
            initial_root: initial_root.to_string(),
            score: 1.0,
            final_cluster_key: initial_root.to_string(),
            runner_ups: Vec::new(),
        }
    }

    #[test]
    fn cache_and_override_do_not_count_toward_unmapped() {
        let results = vec![
            result("a", "Global/Story/A.md", "cache", ""),
            result("b", "Global/Story/B.md", "override", ""),
            result("c", "Global/Story/C.md", "strong_prefix", "Story"),
        ];
        let report = compute(&results, 250, "hash", 1);
        assert_eq!(report.unmapped_count, 1);
    }

    #[test]
    fn rerouted_count_detects_root_mismatch() {
        let results = vec![
            result("a", "Global/Big/A.md", "normalized", "Small"),
            result("b", "Global/Big/B.md", "strong_prefix", "Big"),
        ];
        let report = compute(&results, 250, "hash", 1);
        assert_eq!(report.rerouted_count, 1);
        assert_eq!(report.unmapped_count, 2);
        assert!((report.reroute_share - 0.5).abs() < 1e-9);
    }

    #[test]
    fn misc_share_and_capacity_constraint() {
        let mut results = vec![result("a", "Global/Misc/A.md", "misc", "Misc")];
        for n in 0..300 {
            results.push(result(&format!("b{n}"), "Global/Big/X.md", "strong_prefix", "Big"));
        }
        let report = compute(&results, 250, "hash", 1);
        assert!(report.misc_share > 0.0);
        assert!(!report.capacity_constraint_ok);
    }

    #[test]
    fn median_of_even_and_odd_folder_counts() {
        let results = vec![
            result("a", "Global/A/1.md", "x", "A"),
            result("b", "Global/B/1.md", "x", "B"),
            result("c", "Global/B/2.md", "x", "B"),
        ];
        let report = compute(&results, 250, "hash", 1);
        assert!((report.median_files_per_folder - 1.5).abs() < 1e-9);
    }
}
