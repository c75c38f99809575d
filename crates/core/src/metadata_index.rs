//! Cheap lookups over the full item set: immediate base class and
//! implemented interfaces by id.

use std::collections::HashMap;

use crate::item::Item;

pub struct MetadataIndex<'a> {
    by_id: HashMap<&'a str, &'a Item>,
}

impl<'a> MetadataIndex<'a> {
    pub fn new(items: &'a [Item]) -> Self {
        MetadataIndex {
            by_id: items.iter().map(|item| (item.id.as_str(), item)).collect(),
        }
    }

    /// The identifier of the immediate base class, root-to-immediate-base
    /// ordering (the last element of `inheritance`).
    pub fn base_class(&self, id: &str) -> Option<&str> {
        self.by_id.get(id)?.inheritance.last().map(String::as_str)
    }

    /// Identifiers of implemented interfaces, in declaration order.
    pub fn interfaces(&self, id: &str) -> &[String] {
        match self.by_id.get(id) {
            Some(item) => &item.implements,
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    #[test]
    fn base_class_is_last_in_chain() {
        let items = vec![Item::new("a", ItemKind::Class, "A")
            .with_base("Root")
            .with_base("Mid")];
        let index = MetadataIndex::new(&items);
        assert_eq!(index.base_class("a"), Some("Mid"));
    }

    #[test]
    fn missing_item_yields_none_and_empty() {
        let items: Vec<Item> = Vec::new();
        let index = MetadataIndex::new(&items);
        assert_eq!(index.base_class("missing"), None);
        assert!(index.interfaces("missing").is_empty());
    }

    #[test]
    fn interfaces_preserve_order() {
        let items = vec![Item::new("a", ItemKind::Class, "A")
            .with_interface("IFoo")
            .with_interface("IBar")];
        let index = MetadataIndex::new(&items);
        assert_eq!(index.interfaces("a"), &["IFoo".to_string(), "IBar".to_string()]);
    }
}
