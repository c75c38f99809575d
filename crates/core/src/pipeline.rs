//! Orchestrates the full ten-stage run: tokenize, sanitize, index, analyze,
//! apply rules, normalize, resolve paths, persist the map, write stubs, and
//! report. This is the crate's single public entry point.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::analyzer::Analyzer;
use crate::config::{compute_config_hash, Config};
use crate::error::EngineResult;
use crate::item::Item;
use crate::metadata_index::MetadataIndex;
use crate::normalization::{normalize, ItemSignal};
use crate::persistent_map::PersistentPathMap;
use crate::report::{self, ClusterReport, ResolutionResult};
use crate::resolver::{resolve_path, Registry};
use crate::rules::RuleEngine;
use crate::sanitizer::Sanitizer;
use crate::stub::generate_stub;
use crate::tokenizer::Tokenizer;

pub struct PipelineOutput {
    pub results: Vec<ResolutionResult>,
    pub report: ClusterReport,
}

/// Runs the full pipeline over `items`. `map_path` is where the persistent
/// path map is loaded from and saved back to (skipped entirely if `None`).
/// `stub_output_root`, if given, is where forwarding stubs are written for
/// any item whose path changed from what the persistent map remembered.
pub fn run(
    items: &[Item],
    config: &Config,
    map_path: Option<&Path>,
    stub_output_root: Option<&Path>,
) -> EngineResult<PipelineOutput> {
    let sanitizer = Sanitizer::new(&config.acronyms);
    let tokenizer = Tokenizer::new();
    let metadata_index = MetadataIndex::new(items);

    let mut analyzer = Analyzer::new(&config.rules.stop_tokens, &sanitizer);
    analyzer.analyze(items, &tokenizer, &sanitizer, &metadata_index);
    let rule_engine = RuleEngine::new(config, &analyzer);

    let config_hash = compute_config_hash(config);
    let mut persistent_map = match map_path {
        Some(p) => PersistentPathMap::load(p, &config_hash, true),
        None => PersistentPathMap::empty(&config_hash),
    };

    let item_by_id: HashMap<&str, &Item> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let global_items: Vec<&Item> = items.iter().filter(|i| i.is_global()).collect();
    info!(count = global_items.len(), "global items discovered");

    let mut registry = Registry::new();
    let mut results = Vec::new();
    let mut to_normalize: Vec<ItemSignal> = Vec::new();

    for item in &global_items {
        if !config.force_rebuild {
            if let Some(cached) = persistent_map.lookup(&item.id).map(str::to_string) {
                let path = resolve_path(&mut registry, &item.id, &cached)?;
                persistent_map.record(&item.id, &path);
                results.push(ResolutionResult {
                    item_id: item.id.clone(),
                    path,
                    winning_rule: "cache".to_string(),
                    initial_root: String::new(),
                    score: 1.0,
                    final_cluster_key: "cache".to_string(),
                    runner_ups: Vec::new(),
                });
                continue;
            }
        }

        let override_path = config
            .path_overrides
            .get(&item.id)
            .or_else(|| config.path_overrides.get(&item.full_name));
        if let Some(desired) = override_path {
            let path = resolve_path(&mut registry, &item.id, desired)?;
            persistent_map.record(&item.id, &path);
            results.push(ResolutionResult {
                item_id: item.id.clone(),
                path,
                winning_rule: "override".to_string(),
                initial_root: String::new(),
                score: 1.0,
                final_cluster_key: "override".to_string(),
                runner_ups: Vec::new(),
            });
            continue;
        }

        let candidates = rule_engine.apply_rules(item, &tokenizer, &sanitizer, &metadata_index, &analyzer);
        let cluster_key = candidates
            .first()
            .map(|c| c.cluster_key.clone())
            .unwrap_or_else(|| "Misc".to_string());

        to_normalize.push(ItemSignal {
            item_id: item.id.clone(),
            name: item.name.clone(),
            initial_cluster_key: cluster_key,
            candidates,
        });
    }

    let stop_tokens: std::collections::HashSet<String> = config
        .rules
        .stop_tokens
        .iter()
        .map(|t| sanitizer.normalize(t))
        .collect();
    let signal_by_item: HashMap<&str, &ItemSignal> = to_normalize
        .iter()
        .map(|s| (s.item_id.as_str(), s))
        .collect();
    let normalized = normalize(&to_normalize, &tokenizer, &sanitizer, &stop_tokens, config);

    for n in normalized {
        let candidates = signal_by_item
            .get(n.item_id.as_str())
            .map(|s| s.candidates.as_slice())
            .unwrap_or(&[]);
        let score = candidates.first().map(|c| c.score).unwrap_or(0.1);
        let runner_ups = candidates.get(1..).map(|c| c.to_vec()).unwrap_or_default();
        let winning_rule = if n.rerouted {
            "normalized".to_string()
        } else {
            candidates
                .first()
                .map(|c| c.rule_id.to_string())
                .unwrap_or_else(|| "misc".to_string())
        };

        let item = item_by_id[n.item_id.as_str()];
        let leaf = sanitizer.normalize(&item.name);
        let desired = format!("Global/{}/{leaf}.md", n.final_path);

        let old_path = persistent_map.lookup(&n.item_id).map(str::to_string);
        let path = resolve_path(&mut registry, &n.item_id, &desired)?;
        persistent_map.record(&n.item_id, &path);

        if let (Some(root), Some(old)) = (stub_output_root, &old_path) {
            if old != &path {
                generate_stub(root, &n.item_id, old, &path)?;
            }
        }

        results.push(ResolutionResult {
            item_id: n.item_id.clone(),
            path,
            winning_rule,
            initial_root: n.initial_root,
            score,
            final_cluster_key: n.final_path.clone(),
            runner_ups,
        });
    }

    if let Some(p) = map_path {
        persistent_map.save(p, config.thresholds.stale_prune_after_runs)?;
    }

    let report = report::compute(
        &results,
        config.thresholds.max_folder_size,
        &config_hash,
        crate::persistent_map::SCHEMA_VERSION,
    );
    Ok(PipelineOutput { results, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn end_to_end_assigns_stable_paths_for_a_strong_prefix_family() {
        let config = Config::default();
        let mut items = Vec::new();
        for n in 0..5 {
            items.push(Item::new(format!("s{n}"), ItemKind::Class, format!("Story{n}")));
        }
        let output = run(&items, &config, None, None).unwrap();
        assert_eq!(output.results.len(), 5);
        assert!(output
            .results
            .iter()
            .all(|r| r.path.starts_with("Global/Story/")));
    }

    #[test]
    fn metadata_hub_beats_suffix_end_to_end() {
        let config = Config::default();
        let items = vec![
            Item::new("z1", ItemKind::Class, "ZombieCreature").with_base("Creature"),
            Item::new("z2", ItemKind::Class, "SkeletonCreature").with_base("Creature"),
            Item::new("z3", ItemKind::Class, "GhoulCreature").with_base("Creature"),
        ];
        let output = run(&items, &config, None, None).unwrap();
        let zombie = output.results.iter().find(|r| r.item_id == "z1").unwrap();
        assert_eq!(zombie.path, "Global/Creature/ZombieCreature.md");
        assert_eq!(zombie.winning_rule, "metadata_hub");
        assert_eq!(zombie.final_cluster_key, "Creature");
        assert!((zombie.score - 0.95).abs() < 1e-9);
        // "Creature" also qualifies as a strong suffix across all three
        // items, so the lower-precedence candidate survives as a runner-up
        // rather than being discarded outright.
        assert!(zombie.runner_ups.iter().any(|c| c.rule_id == "strong_suffix"));
    }

    #[test]
    fn override_bypasses_rules_and_normalization() {
        let mut config = Config::default();
        config.path_overrides.insert("s1".to_string(), "Global/Story.md".to_string());
        let items = vec![Item::new("s1", ItemKind::Class, "Anything")];
        let output = run(&items, &config, None, None).unwrap();
        assert_eq!(output.results[0].path, "Global/Story.md");
        assert_eq!(output.results[0].winning_rule, "override");
    }

    #[test]
    fn persistent_map_keeps_an_item_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let map_path = dir.path().join("map.json");
        let config = Config::default();
        let mut items = Vec::new();
        for n in 0..5 {
            items.push(Item::new(format!("s{n}"), ItemKind::Class, format!("Story{n}")));
        }
        let first = run(&items, &config, Some(&map_path), None).unwrap();
        let first_path = first
            .results
            .iter()
            .find(|r| r.item_id == "s0")
            .unwrap()
            .path
            .clone();

        items.push(Item::new("extra", ItemKind::Class, "NewArrival"));
        let second = run(&items, &config, Some(&map_path), None).unwrap();
        let second_path = second
            .results
            .iter()
            .find(|r| r.item_id == "s0")
            .unwrap()
            .path
            .clone();
        assert_eq!(first_path, second_path);
        assert_eq!(
            second.results.iter().find(|r| r.item_id == "s0").unwrap().winning_rule,
            "cache"
        );
    }
}
