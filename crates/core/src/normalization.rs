//! The Normalization Pass: merges near-duplicate clusters, drops clusters
//! too small to justify a folder, reroutes the items that fall out of a
//! dropped cluster, and splits any surviving cluster that grew past the
//! folder size cap.
//!
//! Runs once over every non-cached, non-overridden assignment the Rule
//! Engine produced. Cache hits and configuration overrides never reach this
//! stage.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::canonical::{canonicalize_root_name, project_token_boundaries};
use crate::config::Config;
use crate::rules::Candidate;
use crate::sanitizer::Sanitizer;
use crate::tokenizer::Tokenizer;

const MIN_PREFIX_LEN: usize = 5;
const SIMILARITY_THRESHOLD: f64 = 0.7;
const HIGH_CONFIDENCE_PREFIX_LEN: usize = 7;
const SMALL_CLUSTER_SIZE: u32 = 20;
const MAX_SUBFOLDER_TOKENS: usize = 50;

/// Tiers rerouted orphans are matched against, in precedence order.
/// `type_family` is deliberately excluded — reviving a small family cluster
/// through rerouting would defeat the cluster-size floor that dropped it.
const REROUTE_TIERS: &[&str] = &[
    "metadata_hub",
    "priority_suffix",
    "strong_suffix",
    "strong_prefix",
    "keyword",
];

/// Everything the normalization pass needs to know about one already-routed
/// item: its sanitized name (for token splitting), the cluster key the Rule
/// Engine initially picked, and every candidate the Rule Engine produced for
/// it (used only if the initial pick gets dropped).
pub struct ItemSignal {
    pub item_id: String,
    pub name: String,
    pub initial_cluster_key: String,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub item_id: String,
    pub initial_root: String,
    pub final_path: String,
    pub rerouted: bool,
}

struct NormalizationRoot {
    name: String,
    scope_token: String,
    pre_merge_size: u32,
    sanitized_name: String,
    token_boundaries: BTreeSet<usize>,
    boundaries_unknown: bool,
    pinned: bool,
}

struct UnionFind {
    parent: HashMap<String, String>,
    size: HashMap<String, u32>,
    pinned: HashSet<String>,
}

impl UnionFind {
    fn new() -> Self {
        UnionFind {
            parent: HashMap::new(),
            size: HashMap::new(),
            pinned: HashSet::new(),
        }
    }

    fn register(&mut self, name: &str, initial_size: u32, pinned: bool) {
        self.parent.entry(name.to_string()).or_insert_with(|| name.to_string());
        self.size.entry(name.to_string()).or_insert(initial_size);
        if pinned {
            self.pinned.insert(name.to_string());
        }
    }

    fn find(&mut self, name: &str) -> String {
        if !self.parent.contains_key(name) {
            self.parent.insert(name.to_string(), name.to_string());
            self.size.insert(name.to_string(), 0);
            return name.to_string();
        }
        let parent = self.parent.get(name).unwrap().clone();
        if parent == name {
            return parent;
        }
        let root = self.find(&parent);
        self.parent.insert(name.to_string(), root.clone());
        root
    }

    fn is_pinned(&self, rep: &str) -> bool {
        self.pinned.contains(rep)
    }

    fn size_of(&mut self, name: &str) -> u32 {
        let rep = self.find(name);
        self.size.get(&rep).copied().unwrap_or(0)
    }

    /// Unites the classes containing `a` and `b`. A pinned root always wins
    /// over a non-pinned one; two pinned roots never merge. Returns the
    /// winning representative, or `None` if the union was disallowed.
    fn union(&mut self, a: &str, b: &str) -> Option<String> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return Some(ra);
        }
        let pa = self.is_pinned(&ra);
        let pb = self.is_pinned(&rb);
        if pa && pb {
            return None;
        }
        let (winner, loser) = if pa {
            (ra, rb)
        } else if pb {
            (rb, ra)
        } else if ra < rb {
            (ra, rb)
        } else {
            (rb, ra)
        };
        let loser_size = self.size.remove(&loser).unwrap_or(0);
        *self.size.entry(winner.clone()).or_insert(0) += loser_size;
        self.parent.insert(loser, winner.clone());
        Some(winner)
    }
}

fn canonicalize_cluster_key(tokenizer: &Tokenizer, key: &str) -> String {
    canonicalize_root_name(&tokenizer.tokenize(key))
}

fn build_roots(
    signals: &[ItemSignal],
    tokenizer: &Tokenizer,
    sanitizer: &Sanitizer,
    config: &Config,
) -> (BTreeMap<String, NormalizationRoot>, HashMap<String, String>) {
    let mut members: BTreeMap<String, u32> = BTreeMap::new();
    let mut canonical_of: HashMap<String, String> = HashMap::new();
    for signal in signals {
        let canon = canonicalize_cluster_key(tokenizer, &signal.initial_cluster_key);
        *members.entry(canon.clone()).or_insert(0) += 1;
        canonical_of.insert(signal.item_id.clone(), canon);
    }

    let mut roots = BTreeMap::new();
    for (name, pre_merge_size) in members {
        let tokens = tokenizer.tokenize(&name);
        let scope_token = tokens
            .first()
            .map(|t| sanitizer.normalize(t))
            .unwrap_or_else(|| name.clone());
        let sanitized_name = sanitizer.normalize(&name);

        let mut normalized_boundaries = BTreeSet::new();
        let mut offset = 0usize;
        normalized_boundaries.insert(0);
        for token in &tokens {
            offset += token.chars().count();
            normalized_boundaries.insert(offset);
        }
        let (token_boundaries, ok) =
            project_token_boundaries(&name, &sanitized_name, &normalized_boundaries);

        let pinned = config.rules.pinned_roots.iter().any(|p| p == &name);

        roots.insert(
            name.clone(),
            NormalizationRoot {
                name,
                scope_token,
                pre_merge_size,
                sanitized_name,
                token_boundaries,
                boundaries_unknown: !ok,
                pinned,
            },
        );
    }
    (roots, canonical_of)
}

fn has_boundary(root: &NormalizationRoot, l: usize) -> bool {
    !root.boundaries_unknown && root.token_boundaries.contains(&l)
}

fn false_friends_ok(a: &NormalizationRoot, b: &NormalizationRoot, l: usize) -> bool {
    let shorter = a
        .sanitized_name
        .chars()
        .count()
        .min(b.sanitized_name.chars().count())
        .max(1);
    let ratio = l as f64 / shorter as f64;

    if !a.boundaries_unknown && !b.boundaries_unknown {
        has_boundary(a, l) || has_boundary(b, l) || ratio >= SIMILARITY_THRESHOLD
    } else if a.boundaries_unknown && b.boundaries_unknown {
        ratio >= SIMILARITY_THRESHOLD && l >= HIGH_CONFIDENCE_PREFIX_LEN
    } else {
        has_boundary(a, l) || has_boundary(b, l) || ratio >= SIMILARITY_THRESHOLD
    }
}

fn utility_ok(a: &NormalizationRoot, b: &NormalizationRoot, l: usize) -> bool {
    (a.pre_merge_size < SMALL_CLUSTER_SIZE && b.pre_merge_size < SMALL_CLUSTER_SIZE)
        || l >= HIGH_CONFIDENCE_PREFIX_LEN
}

struct PendingPair {
    scope: String,
    l: usize,
    merged_pre_merge_size: u32,
    a: String,
    b: String,
}

fn merge_micro_variants(
    roots: &BTreeMap<String, NormalizationRoot>,
    config: &Config,
) -> UnionFind {
    let mut uf = UnionFind::new();
    for root in roots.values() {
        uf.register(&root.name, root.pre_merge_size, root.pinned);
    }

    let mut buckets: BTreeMap<(String, String), Vec<&NormalizationRoot>> = BTreeMap::new();
    for root in roots.values() {
        let prefix5: String = root.name.chars().take(5).collect();
        buckets
            .entry((root.scope_token.clone(), prefix5))
            .or_default()
            .push(root);
    }

    let mut pairs = Vec::new();
    for group in buckets.values() {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let a = group[i];
                let b = group[j];
                if a.pinned && b.pinned {
                    continue;
                }
                let l = common_prefix_len(&a.name, &b.name);
                if l < MIN_PREFIX_LEN {
                    continue;
                }
                pairs.push(PendingPair {
                    scope: a.scope_token.clone(),
                    l,
                    merged_pre_merge_size: a.pre_merge_size + b.pre_merge_size,
                    a: a.name.clone(),
                    b: b.name.clone(),
                });
            }
        }
    }

    pairs.sort_by(|p, q| {
        p.scope
            .cmp(&q.scope)
            .then_with(|| q.l.cmp(&p.l))
            .then_with(|| q.merged_pre_merge_size.cmp(&p.merged_pre_merge_size))
            .then_with(|| sorted_pair(&p.a, &p.b).cmp(&sorted_pair(&q.a, &q.b)))
    });

    let min_cluster_size = config.thresholds.min_cluster_size as u32;
    for pair in &pairs {
        let a = &roots[&pair.a];
        let b = &roots[&pair.b];

        if !false_friends_ok(a, b, pair.l) {
            continue;
        }
        if !utility_ok(a, b, pair.l) {
            continue;
        }

        let ra = uf.find(&pair.a);
        let rb = uf.find(&pair.b);
        if ra == rb {
            continue;
        }
        let size_a = uf.size_of(&ra);
        let size_b = uf.size_of(&rb);
        let either_kept =
            size_a >= min_cluster_size || size_b >= min_cluster_size || uf.is_pinned(&ra) || uf.is_pinned(&rb);
        if size_a + size_b < min_cluster_size && !either_kept {
            continue;
        }

        uf.union(&pair.a, &pair.b);
    }

    uf
}

fn sorted_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn determine_kept_set(
    roots: &BTreeMap<String, NormalizationRoot>,
    uf: &mut UnionFind,
    config: &Config,
) -> HashSet<String> {
    let min_cluster_size = config.thresholds.min_cluster_size as u32;
    let mut rep_size: HashMap<String, u32> = HashMap::new();
    let mut pinned_reps: HashSet<String> = HashSet::new();
    for root in roots.values() {
        let rep = uf.find(&root.name);
        *rep_size.entry(rep.clone()).or_insert(0) += root.pre_merge_size;
        if root.pinned {
            pinned_reps.insert(rep);
        }
    }

    let mut candidates: Vec<(String, u32)> = rep_size
        .iter()
        .filter(|(rep, size)| !pinned_reps.contains(*rep) && **size >= min_cluster_size)
        .map(|(rep, size)| (rep.clone(), *size))
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut kept: HashSet<String> = candidates
        .into_iter()
        .take(config.thresholds.max_top_level_folders)
        .map(|(rep, _)| rep)
        .collect();

    for rep in pinned_reps {
        let size = *rep_size.get(&rep).unwrap_or(&0);
        if size > 0 && (size >= min_cluster_size || config.rules.pinned_allow_singleton) {
            kept.insert(rep);
        }
    }

    kept
}

fn reroute_orphan(
    signal: &ItemSignal,
    tokenizer: &Tokenizer,
    uf: &mut UnionFind,
    kept: &HashSet<String>,
) -> String {
    let mut tiers: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for candidate in &signal.candidates {
        let Some(rank) = REROUTE_TIERS.iter().position(|t| *t == candidate.rule_id) else {
            continue;
        };
        let canon = canonicalize_cluster_key(tokenizer, &candidate.cluster_key);
        let rep = uf.find(&canon);
        if !kept.contains(&rep) {
            continue;
        }
        tiers.entry(rank).or_default().push(rep);
    }

    for rank in 0..REROUTE_TIERS.len() {
        if let Some(reps) = tiers.get(&rank) {
            if let Some(best) = reps.iter().min() {
                return best.clone();
            }
        }
    }

    "Misc".to_string()
}

fn apply_density_safety_valve(
    signals: &[ItemSignal],
    finals: &HashMap<String, String>,
    tokenizer: &Tokenizer,
    sanitizer: &Sanitizer,
    stop_tokens: &HashSet<String>,
    max_folder_size: usize,
) -> HashMap<String, String> {
    let mut by_root: HashMap<String, Vec<&ItemSignal>> = HashMap::new();
    for signal in signals {
        by_root
            .entry(finals[&signal.item_id].clone())
            .or_default()
            .push(signal);
    }

    let mut result = HashMap::new();
    for (root, members) in &by_root {
        if members.len() <= max_folder_size || root == "Misc" {
            for m in members {
                result.insert(m.item_id.clone(), root.clone());
            }
            continue;
        }

        let mut per_item_token: HashMap<String, Option<String>> = HashMap::new();
        let mut split_tokens: HashSet<String> = HashSet::new();
        for m in members {
            let chosen = tokenizer
                .tokenize(&m.name)
                .iter()
                .map(|t| sanitizer.normalize(t))
                .find(|t| t != root && !stop_tokens.contains(t));
            if let Some(t) = &chosen {
                split_tokens.insert(t.clone());
            }
            per_item_token.insert(m.item_id.clone(), chosen);
        }

        if !split_tokens.is_empty() && split_tokens.len() <= MAX_SUBFOLDER_TOKENS {
            for m in members {
                let sub = per_item_token[&m.item_id].clone().unwrap_or_else(|| "_".to_string());
                result.insert(m.item_id.clone(), format!("{root}/{sub}"));
            }
        } else {
            for m in members {
                let sub = m
                    .name
                    .chars()
                    .next()
                    .map(|c| c.to_ascii_uppercase())
                    .filter(|c| c.is_ascii_alphabetic())
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "_".to_string());
                result.insert(m.item_id.clone(), format!("{root}/{sub}"));
            }
        }
    }
    result
}

/// Runs the full four-step normalization pass over a batch of already-routed
/// items and returns each item's final cluster path plus whether it was
/// rerouted away from its initial root.
pub fn normalize(
    signals: &[ItemSignal],
    tokenizer: &Tokenizer,
    sanitizer: &Sanitizer,
    stop_tokens: &HashSet<String>,
    config: &Config,
) -> Vec<NormalizedItem> {
    let (roots, canonical_of) = build_roots(signals, tokenizer, sanitizer, config);
    let mut uf = merge_micro_variants(&roots, config);
    let kept = determine_kept_set(&roots, &mut uf, config);

    let mut final_root: HashMap<String, String> = HashMap::new();
    let mut rerouted: HashMap<String, bool> = HashMap::new();
    for signal in signals {
        let canon = &canonical_of[&signal.item_id];
        let rep = uf.find(canon);
        if kept.contains(&rep) {
            final_root.insert(signal.item_id.clone(), rep);
            rerouted.insert(signal.item_id.clone(), false);
        } else {
            let rerouted_root = reroute_orphan(signal, tokenizer, &mut uf, &kept);
            final_root.insert(signal.item_id.clone(), rerouted_root);
            rerouted.insert(signal.item_id.clone(), true);
        }
    }

    let final_path = apply_density_safety_valve(
        signals,
        &final_root,
        tokenizer,
        sanitizer,
        stop_tokens,
        config.thresholds.max_folder_size,
    );

    signals
        .iter()
        .map(|signal| NormalizedItem {
            item_id: signal.item_id.clone(),
            initial_root: canonical_of[&signal.item_id].clone(),
            final_path: final_path[&signal.item_id].clone(),
            rerouted: rerouted[&signal.item_id],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Tokenizer, Sanitizer, Config) {
        let config = Config::default();
        (Tokenizer::new(), Sanitizer::new(&config.acronyms), config)
    }

    fn signal(id: &str, name: &str, root: &str) -> ItemSignal {
        ItemSignal {
            item_id: id.to_string(),
            name: name.to_string(),
            initial_cluster_key: root.to_string(),
            candidates: Vec::new(),
        }
    }

    #[test]
    fn micro_variants_merge_into_one_folder() {
        // "StoryEvent" and "StoryEvents" share the scope token "Story" (the
        // first tokenized word of each root name) and a length-10 common
        // prefix, so they bucket together and merge despite being two
        // distinct cluster keys.
        let (tokenizer, sanitizer, mut config) = fixture();
        config.thresholds.min_cluster_size = 3;
        let mut signals = Vec::new();
        for n in 0..2 {
            signals.push(signal(&format!("a{n}"), &format!("AlphaTrigger{n}"), "StoryEvent"));
        }
        for n in 0..2 {
            signals.push(signal(
                &format!("b{n}"),
                &format!("GammaChronicle{n}"),
                "StoryEvents",
            ));
        }
        let stop_tokens = HashSet::new();
        let results = normalize(&signals, &tokenizer, &sanitizer, &stop_tokens, &config);
        let roots: HashSet<&str> = results.iter().map(|r| r.final_path.as_str()).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots.into_iter().next().unwrap(), "StoryEvent");
    }

    #[test]
    fn small_unmatched_cluster_gets_dropped_and_reaches_misc() {
        let (tokenizer, sanitizer, mut config) = fixture();
        config.thresholds.min_cluster_size = 5;
        let signals = vec![signal("s1", "Small1", "Small")];
        let stop_tokens = HashSet::new();
        let results = normalize(&signals, &tokenizer, &sanitizer, &stop_tokens, &config);
        assert_eq!(results[0].final_path, "Misc");
        assert!(results[0].rerouted);
    }

    #[test]
    fn orphan_reroutes_to_a_kept_candidate_root() {
        let (tokenizer, sanitizer, mut config) = fixture();
        config.thresholds.min_cluster_size = 3;
        let mut signals = Vec::new();
        for n in 0..5 {
            signals.push(signal(&format!("b{n}"), &format!("Big{n}"), "Big"));
        }
        signals.push(ItemSignal {
            item_id: "s1".to_string(),
            name: "Small1".to_string(),
            initial_cluster_key: "Small".to_string(),
            candidates: vec![Candidate {
                rule_id: "strong_suffix",
                cluster_key: "Big".to_string(),
                score: 0.7,
            }],
        });
        let stop_tokens = HashSet::new();
        let results = normalize(&signals, &tokenizer, &sanitizer, &stop_tokens, &config);
        let s1 = results.iter().find(|r| r.item_id == "s1").unwrap();
        assert_eq!(s1.final_path, "Big");
        assert!(s1.rerouted);
        assert_eq!(s1.initial_root, "Small");
    }

    #[test]
    fn pinned_root_survives_below_min_cluster_size() {
        let (tokenizer, sanitizer, mut config) = fixture();
        config.thresholds.min_cluster_size = 10;
        config.rules.pinned_roots = vec!["Legacy".to_string()];
        config.rules.pinned_allow_singleton = true;
        let signals = vec![signal("a", "Legacy1", "Legacy")];
        let stop_tokens = HashSet::new();
        let results = normalize(&signals, &tokenizer, &sanitizer, &stop_tokens, &config);
        assert_eq!(results[0].final_path, "Legacy");
        assert!(!results[0].rerouted);
    }

    #[test]
    fn oversized_folder_splits_by_token() {
        let (tokenizer, sanitizer, mut config) = fixture();
        config.thresholds.min_cluster_size = 1;
        config.thresholds.max_folder_size = 3;
        let mut signals = Vec::new();
        for n in 0..6 {
            signals.push(signal(&format!("w{n}"), &format!("WidgetKind{n}"), "Widget"));
        }
        let stop_tokens = HashSet::new();
        let results = normalize(&signals, &tokenizer, &sanitizer, &stop_tokens, &config);
        assert!(results.iter().all(|r| r.final_path.starts_with("Widget/")));
    }
}
