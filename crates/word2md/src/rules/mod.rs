//! Rule system for element conversion.
//!
//! Rules are consulted before the converter's built-in tag mapping, in
//! insertion order; the first matching rule decides how an element is
//! emitted.

mod rule;
mod style;

pub use rule::{Emission, Filter, Predicate, Rule};
pub use style::{is_bold, is_italic, style_emphasis_rules};

use indexmap::IndexMap;

use crate::node::NodeRef;

/// Collection of element rules
pub struct Rules {
    custom_rules: IndexMap<String, Rule>,
}

impl Rules {
    /// Create an empty rule set: only the built-in tag mapping applies
    pub fn new() -> Self {
        Self {
            custom_rules: IndexMap::new(),
        }
    }

    /// Create a rule set with the style-derived emphasis rules installed
    pub fn with_style_emphasis() -> Self {
        let mut rules = Self::new();
        for (key, rule) in style_emphasis_rules() {
            rules.add(key, rule);
        }
        rules
    }

    /// Add a rule. Re-using a key replaces that rule in place.
    pub fn add(&mut self, key: &str, rule: Rule) {
        self.custom_rules.insert(key.to_string(), rule);
    }

    /// Remove a rule by key
    pub fn remove(&mut self, key: &str) -> Option<Rule> {
        self.custom_rules.shift_remove(key)
    }

    /// Rule keys in the order they are consulted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.custom_rules.keys().map(String::as_str)
    }

    /// Find the emission for a node, if any rule matches
    pub fn for_node(&self, node: &NodeRef) -> Option<&Emission> {
        self.custom_rules
            .values()
            .find(|rule| rule.filter.matches(node))
            .map(|rule| &rule.emission)
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::with_style_emphasis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_empty_rules_match_nothing() {
        let node = Node::element("span");
        assert_eq!(Rules::new().for_node(&NodeRef::new(&node)), None);
    }

    #[test]
    fn test_rules_in_insertion_order() {
        let mut rules = Rules::new();
        rules.add("underline", Rule::for_tag("u", Emission::Emphasis));
        rules.add("any-u", Rule::for_tags(&["u", "ins"], Emission::Remove));

        let node = Node::element("u");
        assert_eq!(
            rules.for_node(&NodeRef::new(&node)),
            Some(&Emission::Emphasis)
        );

        rules.remove("underline");
        assert_eq!(rules.for_node(&NodeRef::new(&node)), Some(&Emission::Remove));
    }

    #[test]
    fn test_default_has_style_emphasis() {
        let rules = Rules::default();
        let keys: Vec<&str> = rules.keys().collect();
        assert_eq!(keys, vec!["span-bold-italic", "span-bold", "span-italic"]);

        let node = Node::element_with_attrs("span", vec![("style", "font-style: italic")]);
        assert_eq!(
            rules.for_node(&NodeRef::new(&node)),
            Some(&Emission::Emphasis)
        );
    }
}
