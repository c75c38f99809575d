//! The engine's input unit: a documented type, member, or namespace.

use std::fmt;

/// Closed set of kinds a documented item can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Namespace,
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
    Method,
    Property,
    Field,
    Event,
    Operator,
    Constructor,
    Unknown,
}

impl ItemKind {
    /// The "type kind" predicate used by the Global Item definition:
    /// class, struct, interface, enum, delegate.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            ItemKind::Class
                | ItemKind::Struct
                | ItemKind::Interface
                | ItemKind::Enum
                | ItemKind::Delegate
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Namespace => "namespace",
            ItemKind::Class => "class",
            ItemKind::Struct => "struct",
            ItemKind::Interface => "interface",
            ItemKind::Enum => "enum",
            ItemKind::Delegate => "delegate",
            ItemKind::Method => "method",
            ItemKind::Property => "property",
            ItemKind::Field => "field",
            ItemKind::Event => "event",
            ItemKind::Operator => "operator",
            ItemKind::Constructor => "constructor",
            ItemKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ItemKind {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "namespace" => ItemKind::Namespace,
            "class" => ItemKind::Class,
            "struct" => ItemKind::Struct,
            "interface" => ItemKind::Interface,
            "enum" => ItemKind::Enum,
            "delegate" => ItemKind::Delegate,
            "method" => ItemKind::Method,
            "property" => ItemKind::Property,
            "field" => ItemKind::Field,
            "event" => ItemKind::Event,
            "operator" => ItemKind::Operator,
            "constructor" => ItemKind::Constructor,
            _ => ItemKind::Unknown,
        }
    }
}

/// A documented item: a type, a member, or a namespace. Immutable for the
/// engine's lifetime — nothing in this crate mutates an `Item` after it is
/// handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub name: String,
    pub full_name: String,
    pub namespace: Option<String>,
    /// Root-to-immediate-base inheritance chain of identifiers.
    pub inheritance: Vec<String>,
    pub implements: Vec<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, kind: ItemKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Item {
            id: id.into(),
            kind,
            full_name: name.clone(),
            name,
            namespace: None,
            inheritance: Vec::new(),
            implements: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.inheritance.push(base.into());
        self
    }

    pub fn with_interface(mut self, iface: impl Into<String>) -> Self {
        self.implements.push(iface.into());
        self
    }

    /// An item with no namespace or the literal namespace `Global`, of a type
    /// kind — the subset this engine processes.
    pub fn is_global(&self) -> bool {
        self.kind.is_type() && matches!(self.namespace.as_deref(), None | Some("Global"))
    }

    /// Immediate base class: the last element of the inheritance chain
    /// (root-to-immediate-base ordering).
    pub fn immediate_base(&self) -> Option<&str> {
        self.inheritance.last().map(String::as_str)
    }
}
