//! Rule and Filter types for element conversion.

use crate::node::NodeRef;

/// Type alias for filter predicates
pub type Predicate = Box<dyn Fn(&str, &NodeRef) -> bool + Send + Sync>;

/// A filter determines which elements a rule applies to
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match using a predicate function
    Predicate(Predicate),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &NodeRef) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches a node
    pub fn matches(&self, node: &NodeRef) -> bool {
        let tag = node.tag_name();
        match self {
            Filter::TagName(t) => tag == t,
            Filter::TagNames(tags) => tags.iter().any(|t| t == tag),
            Filter::Predicate(f) => f(tag, node),
        }
    }
}

/// How a matched element is emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// `**content**`
    Strong,
    /// `_content_`
    Emphasis,
    /// `**_content_**`
    StrongEmphasis,
    /// `~~content~~`
    Strikethrough,
    /// Drop the element, keep its content
    Bypass,
    /// Drop the element and its content
    Remove,
    /// Convert the element as if it had another tag name
    Rename(String),
}

/// A rule pairs a filter with the emission for the elements it matches
pub struct Rule {
    /// Filter to determine which elements this rule applies to
    pub filter: Filter,
    pub emission: Emission,
}

impl Rule {
    /// Create a new rule
    pub fn new(filter: Filter, emission: Emission) -> Self {
        Self { filter, emission }
    }

    /// Create a rule that matches a single tag
    pub fn for_tag(tag: &str, emission: Emission) -> Self {
        Self::new(Filter::tag(tag), emission)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags(tags: &[&str], emission: Emission) -> Self {
        Self::new(Filter::tags(tags), emission)
    }
}
