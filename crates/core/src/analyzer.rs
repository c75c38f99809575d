//! Frequency analysis over the global item set: prefix/suffix token
//! popularity and base-class/interface hub popularity.

use std::collections::{HashMap, HashSet};

use crate::item::Item;
use crate::metadata_index::MetadataIndex;
use crate::sanitizer::Sanitizer;
use crate::tokenizer::Tokenizer;

pub struct Analyzer {
    prefix_counts: HashMap<String, u32>,
    suffix_counts: HashMap<String, u32>,
    /// Base classes and implemented interfaces share one counter, as they do
    /// in the metadata-hub rule's source of truth.
    base_class_counts: HashMap<String, u32>,
    stop_tokens: HashSet<String>,
    global_item_ids: Vec<String>,
}

impl Analyzer {
    pub fn new(stop_tokens: &[String], sanitizer: &Sanitizer) -> Self {
        Analyzer {
            prefix_counts: HashMap::new(),
            suffix_counts: HashMap::new(),
            base_class_counts: HashMap::new(),
            stop_tokens: stop_tokens.iter().map(|t| sanitizer.normalize(t)).collect(),
            global_item_ids: Vec::new(),
        }
    }

    pub fn analyze(
        &mut self,
        items: &[Item],
        tokenizer: &Tokenizer,
        sanitizer: &Sanitizer,
        metadata_index: &MetadataIndex,
    ) {
        self.global_item_ids.clear();
        for item in items {
            if !item.is_global() {
                continue;
            }
            self.global_item_ids.push(item.id.clone());
            self.process_item(item, tokenizer, sanitizer, metadata_index);
        }
    }

    fn process_item(
        &mut self,
        item: &Item,
        tokenizer: &Tokenizer,
        sanitizer: &Sanitizer,
        metadata_index: &MetadataIndex,
    ) {
        let tokens = tokenizer.tokenize(&item.name);
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return;
        };

        let prefix = sanitizer.normalize(first);
        *self.prefix_counts.entry(prefix).or_insert(0) += 1;

        let suffix = sanitizer.normalize(last);
        *self.suffix_counts.entry(suffix).or_insert(0) += 1;

        if let Some(base) = metadata_index.base_class(&item.id) {
            *self.base_class_counts.entry(base.to_string()).or_insert(0) += 1;
        }
        for iface in metadata_index.interfaces(&item.id) {
            *self.base_class_counts.entry(iface.clone()).or_insert(0) += 1;
        }
    }

    pub fn global_item_ids(&self) -> &[String] {
        &self.global_item_ids
    }

    pub fn base_class_count(&self, name: &str) -> u32 {
        self.base_class_counts.get(name).copied().unwrap_or(0)
    }

    pub fn prefix_count(&self, token: &str) -> u32 {
        self.prefix_counts.get(token).copied().unwrap_or(0)
    }

    /// Top `k` prefixes with at least `min_size` occurrences, excluding stop
    /// tokens, ordered by count descending then token ascending.
    pub fn top_prefixes(&self, k: usize, min_size: u32) -> Vec<String> {
        let mut candidates: Vec<(&String, u32)> = self
            .prefix_counts
            .iter()
            .filter(|(token, count)| **count >= min_size && !self.stop_tokens.contains(*token))
            .map(|(token, count)| (token, *count))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        candidates.into_iter().take(k).map(|(t, _)| t.clone()).collect()
    }

    /// Suffixes with at least `min_size` occurrences, excluding stop tokens.
    pub fn strong_suffixes(&self, min_size: u32) -> HashSet<String> {
        self.suffix_counts
            .iter()
            .filter(|(token, count)| **count >= min_size && !self.stop_tokens.contains(*token))
            .map(|(token, _)| token.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    fn build(items: &[Item]) -> Analyzer {
        let tokenizer = Tokenizer::new();
        let sanitizer = Sanitizer::new(&[]);
        let index = MetadataIndex::new(items);
        let mut analyzer = Analyzer::new(&["Manager".to_string()], &sanitizer);
        analyzer.analyze(items, &tokenizer, &sanitizer, &index);
        analyzer
    }

    #[test]
    fn prefix_and_suffix_counts_ignore_non_global_items() {
        let items = vec![
            Item::new("a", ItemKind::Class, "StoryEvent"),
            Item::new("b", ItemKind::Class, "StoryTrigger"),
            Item::new("c", ItemKind::Class, "Other").with_namespace("App.Core"),
        ];
        let analyzer = build(&items);
        assert_eq!(analyzer.global_item_ids().len(), 2);
        let top = analyzer.top_prefixes(10, 2);
        assert_eq!(top, vec!["Story".to_string()]);
    }

    #[test]
    fn stop_tokens_are_excluded_from_suffixes() {
        let items = vec![
            Item::new("a", ItemKind::Class, "StoryManager"),
            Item::new("b", ItemKind::Class, "EventManager"),
        ];
        let analyzer = build(&items);
        assert!(!analyzer.strong_suffixes(2).contains("Manager"));
    }

    #[test]
    fn base_and_interfaces_share_one_counter() {
        let items = vec![
            Item::new("a", ItemKind::Class, "A").with_base("Widget"),
            Item::new("b", ItemKind::Class, "B").with_interface("Widget"),
        ];
        let analyzer = build(&items);
        assert_eq!(analyzer.base_class_count("Widget"), 2);
    }

    #[test]
    fn top_prefixes_break_ties_alphabetically() {
        let items = vec![
            Item::new("a", ItemKind::Class, "ZooKeeper"),
            Item::new("b", ItemKind::Class, "ZooAnimal"),
            Item::new("c", ItemKind::Class, "AlphaKeeper"),
            Item::new("d", ItemKind::Class, "AlphaAnimal"),
        ];
        let analyzer = build(&items);
        let top = analyzer.top_prefixes(2, 1);
        assert_eq!(top, vec!["Alpha".to_string(), "Zoo".to_string()]);
    }
}
