//! The Rule Engine: turns one global item into an ordered list of candidate
//! cluster assignments. Candidates are produced in fixed precedence order —
//! the first one a caller accepts wins, nothing is re-sorted by score.

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::item::Item;
use crate::metadata_index::MetadataIndex;
use crate::sanitizer::Sanitizer;
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub rule_id: &'static str,
    pub cluster_key: String,
    pub score: f64,
}

pub struct RuleEngine {
    priority_suffixes: std::collections::HashSet<String>,
    metadata_denylist: std::collections::HashSet<String>,
    keyword_clusters: std::collections::BTreeMap<String, Vec<String>>,
    hub_types: std::collections::BTreeMap<String, String>,
    min_family_size: u32,
    top_prefixes: std::collections::HashSet<String>,
    strong_suffixes: std::collections::HashSet<String>,
}

impl RuleEngine {
    pub fn new(config: &Config, analyzer: &Analyzer) -> Self {
        let min_size = config.thresholds.min_cluster_size as u32;
        RuleEngine {
            priority_suffixes: config.rules.priority_suffixes.iter().cloned().collect(),
            metadata_denylist: config.rules.metadata_denylist.iter().cloned().collect(),
            keyword_clusters: config.rules.keyword_clusters.clone(),
            hub_types: config.hub_types.clone(),
            min_family_size: config.thresholds.min_family_size as u32,
            top_prefixes: analyzer
                .top_prefixes(config.thresholds.top_k, min_size)
                .into_iter()
                .collect(),
            strong_suffixes: analyzer.strong_suffixes(min_size),
        }
    }

    /// Candidates in fixed precedence order: metadata_hub, priority_suffix,
    /// strong_prefix, strong_suffix, keyword, type_family. Callers append a
    /// `misc` fallback themselves when this list comes back empty.
    pub fn apply_rules(
        &self,
        item: &Item,
        tokenizer: &Tokenizer,
        sanitizer: &Sanitizer,
        metadata_index: &MetadataIndex,
        analyzer: &Analyzer,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        let tokens = tokenizer.tokenize(&item.name);
        let (Some(first_raw), Some(last_raw)) = (tokens.first(), tokens.last()) else {
            return candidates;
        };
        let first = sanitizer.normalize(first_raw);
        let last = sanitizer.normalize(last_raw);

        if let Some(hub) = self.check_metadata_hub(item, sanitizer, metadata_index) {
            candidates.push(hub);
        }

        if self.priority_suffixes.contains(&last) {
            candidates.push(Candidate {
                rule_id: "priority_suffix",
                cluster_key: last.clone(),
                score: 0.9,
            });
        }

        if self.top_prefixes.contains(&first) {
            candidates.push(Candidate {
                rule_id: "strong_prefix",
                cluster_key: first.clone(),
                score: 0.8,
            });
        }

        if self.strong_suffixes.contains(&last) {
            candidates.push(Candidate {
                rule_id: "strong_suffix",
                cluster_key: last.clone(),
                score: 0.7,
            });
        }

        let normalized_tokens: Vec<String> =
            tokens.iter().map(|t| sanitizer.normalize(t)).collect();
        'buckets: for (bucket, keywords) in &self.keyword_clusters {
            for kw in keywords {
                if normalized_tokens.contains(&sanitizer.normalize(kw)) {
                    candidates.push(Candidate {
                        rule_id: "keyword",
                        cluster_key: bucket.clone(),
                        score: 0.6,
                    });
                    continue 'buckets;
                }
            }
        }

        if first.chars().count() >= 4 && analyzer.prefix_count(&first) >= self.min_family_size {
            candidates.push(Candidate {
                rule_id: "type_family",
                cluster_key: first.clone(),
                score: 0.5,
            });
        }

        candidates
    }

    fn check_metadata_hub(
        &self,
        item: &Item,
        sanitizer: &Sanitizer,
        metadata_index: &MetadataIndex,
    ) -> Option<Candidate> {
        let hub_id = if let Some(base) = metadata_index.base_class(&item.id) {
            self.is_valid_hub(base).then(|| base.to_string())
        } else {
            None
        };

        let hub_id = hub_id.or_else(|| {
            let mut valid: Vec<&String> = metadata_index
                .interfaces(&item.id)
                .iter()
                .filter(|iface| self.is_valid_hub(iface))
                .collect();
            if valid.is_empty() {
                return None;
            }
            valid.sort();
            Some(valid[0].clone())
        })?;

        let name = self.hub_name(&hub_id, sanitizer);
        Some(Candidate {
            rule_id: "metadata_hub",
            cluster_key: name,
            score: 0.95,
        })
    }

    fn is_valid_hub(&self, id: &str) -> bool {
        let short = short_name(id);
        if self.metadata_denylist.contains(short) || self.metadata_denylist.contains(id) {
            return false;
        }
        if short.chars().count() < 4 {
            return false;
        }
        if short.ends_with("Base") {
            return false;
        }
        true
    }

    fn hub_name(&self, id: &str, sanitizer: &Sanitizer) -> String {
        if let Some(name) = self.hub_types.get(id) {
            return name.clone();
        }
        sanitizer.normalize(short_name(id))
    }
}

fn short_name(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    struct Fixture {
        config: Config,
        tokenizer: Tokenizer,
        sanitizer: Sanitizer,
    }

    fn fixture() -> Fixture {
        Fixture {
            config: Config::default(),
            tokenizer: Tokenizer::new(),
            sanitizer: Sanitizer::new(&Config::default().acronyms),
        }
    }

    fn analyze<'a>(fx: &Fixture, items: &'a [Item]) -> (Analyzer, MetadataIndex<'a>) {
        let index = MetadataIndex::new(items);
        let mut analyzer = Analyzer::new(&fx.config.rules.stop_tokens, &fx.sanitizer);
        analyzer.analyze(items, &fx.tokenizer, &fx.sanitizer, &index);
        (analyzer, index)
    }

    #[test]
    fn metadata_hub_outranks_everything_else() {
        let fx = fixture();
        let items = vec![
            Item::new("z1", ItemKind::Class, "ZombieCreature").with_base("Creature"),
            Item::new("z2", ItemKind::Class, "SkeletonCreature").with_base("Creature"),
            Item::new("z3", ItemKind::Class, "GhoulCreature").with_base("Creature"),
        ];
        let (analyzer, index) = analyze(&fx, &items);
        let engine = RuleEngine::new(&fx.config, &analyzer);
        let candidates =
            engine.apply_rules(&items[0], &fx.tokenizer, &fx.sanitizer, &index, &analyzer);
        assert_eq!(candidates[0].rule_id, "metadata_hub");
        assert_eq!(candidates[0].cluster_key, "Creature");
    }

    #[test]
    fn priority_suffix_outranks_strong_prefix() {
        let fx = fixture();
        let mut items = vec![Item::new("u1", ItemKind::Class, "StoryUI")];
        for n in 0..5 {
            items.push(Item::new(
                format!("p{n}"),
                ItemKind::Class,
                format!("Story{n}"),
            ));
        }
        let (analyzer, index) = analyze(&fx, &items);
        let engine = RuleEngine::new(&fx.config, &analyzer);
        let candidates =
            engine.apply_rules(&items[0], &fx.tokenizer, &fx.sanitizer, &index, &analyzer);
        assert_eq!(candidates[0].rule_id, "priority_suffix");
        assert_eq!(candidates[0].cluster_key, "UI");
    }

    #[test]
    fn hub_denylist_and_short_name_and_base_suffix_are_rejected() {
        let fx = fixture();
        let items = vec![
            Item::new("a", ItemKind::Class, "Foo").with_base("MonoBehaviour"),
            Item::new("b", ItemKind::Class, "Bar").with_base("Obj"),
            Item::new("c", ItemKind::Class, "Baz").with_base("WidgetBase"),
        ];
        let (analyzer, index) = analyze(&fx, &items);
        let engine = RuleEngine::new(&fx.config, &analyzer);
        for item in &items {
            let candidates =
                engine.apply_rules(item, &fx.tokenizer, &fx.sanitizer, &index, &analyzer);
            assert!(candidates.iter().all(|c| c.rule_id != "metadata_hub"));
        }
    }

    #[test]
    fn interface_hub_tiebreak_prefers_lexicographically_smallest() {
        let fx = fixture();
        let items = vec![
            Item::new("a", ItemKind::Class, "A")
                .with_interface("IWidget")
                .with_interface("IWidget")
                .with_interface("IWidget")
                .with_interface("IApple"),
        ];
        let (analyzer, index) = analyze(&fx, &items);
        let engine = RuleEngine::new(&fx.config, &analyzer);
        let candidates =
            engine.apply_rules(&items[0], &fx.tokenizer, &fx.sanitizer, &index, &analyzer);
        assert_eq!(candidates[0].rule_id, "metadata_hub");
        assert_eq!(candidates[0].cluster_key, "IApple");
    }

    #[test]
    fn type_family_requires_min_family_size() {
        let mut fx = fixture();
        fx.config.thresholds.min_family_size = 2;
        let items = vec![
            Item::new("a", ItemKind::Struct, "VectorThing"),
            Item::new("b", ItemKind::Struct, "VectorOther"),
        ];
        let (analyzer, index) = analyze(&fx, &items);
        let engine = RuleEngine::new(&fx.config, &analyzer);
        let candidates =
            engine.apply_rules(&items[0], &fx.tokenizer, &fx.sanitizer, &index, &analyzer);
        assert!(candidates.iter().any(|c| c.rule_id == "type_family"));
    }

    #[test]
    fn no_signals_yields_empty_candidate_list() {
        let fx = fixture();
        let items = vec![Item::new("a", ItemKind::Struct, "Zq")];
        let (analyzer, index) = analyze(&fx, &items);
        let engine = RuleEngine::new(&fx.config, &analyzer);
        let candidates =
            engine.apply_rules(&items[0], &fx.tokenizer, &fx.sanitizer, &index, &analyzer);
        assert!(candidates.is_empty());
    }
}
