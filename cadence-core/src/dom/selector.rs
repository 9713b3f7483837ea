// Copyright 2025 Cadence Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Minimal CSS selector engine.
//!
//! Supported: selector groups (`a, b`), descendant combinators (whitespace),
//! and compound selectors made of a tag or `*`, `#id`, `.class` and
//! `[attribute]` presence tests. Anything else is an invalid selector.

use super::document::Element;
use super::DomError;

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<String>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !tag.eq_ignore_ascii_case(&element.tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| element.has_class(class))
            && self
                .attributes
                .iter()
                .all(|name| element.attributes.contains_key(name))
    }
}

/// A parsed selector group.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectorList {
    /// Each alternative is a descendant chain, outermost first.
    alternatives: Vec<Vec<Compound>>,
}

impl SelectorList {
    pub(crate) fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());

        let mut alternatives = Vec::new();
        for group in input.split(',') {
            let chain = group
                .split_whitespace()
                .map(parse_compound)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?;
            if chain.is_empty() {
                return Err(invalid());
            }
            alternatives.push(chain);
        }
        Ok(Self { alternatives })
    }

    /// Whether the element at `node` matches any alternative.
    pub(crate) fn matches(&self, elements: &[Element], node: usize) -> bool {
        self.alternatives
            .iter()
            .any(|chain| matches_chain(chain, elements, node))
    }
}

fn matches_chain(chain: &[Compound], elements: &[Element], node: usize) -> bool {
    let Some((subject, ancestors)) = chain.split_last() else {
        return false;
    };
    if !subject.matches(&elements[node]) {
        return false;
    }

    // Descendant-only chains can be matched greedily from the nearest ancestor.
    let mut cursor = elements[node].parent;
    for compound in ancestors.iter().rev() {
        loop {
            let Some(ancestor) = cursor else {
                return false;
            };
            cursor = elements[ancestor].parent;
            if compound.matches(&elements[ancestor]) {
                break;
            }
        }
    }
    true
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    (!ident.is_empty()).then_some(ident)
}

fn parse_compound(token: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut chars = token.chars().peekable();

    match chars.peek() {
        Some('*') => {
            chars.next();
            compound.tag = Some("*".to_string());
        }
        Some(&c) if is_ident_char(c) => compound.tag = take_ident(&mut chars),
        _ => {}
    }

    while let Some(c) = chars.next() {
        match c {
            '.' => compound.classes.push(take_ident(&mut chars)?),
            '#' => {
                if compound.id.is_some() {
                    return None;
                }
                compound.id = Some(take_ident(&mut chars)?);
            }
            '[' => {
                let name = take_ident(&mut chars)?;
                if chars.next() != Some(']') {
                    return None;
                }
                compound.attributes.push(name);
            }
            _ => return None,
        }
    }

    (!compound.is_empty()).then_some(compound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, id: Option<&str>, classes: &[&str], parent: Option<usize>) -> Element {
        let mut element = Element::new(tag);
        element.id = id.map(str::to_string);
        element.classes = classes.iter().map(|c| c.to_string()).collect();
        element.parent = parent;
        element
    }

    fn tree() -> Vec<Element> {
        let mut nav = element("nav", None, &["block-index-nav"], Some(0));
        nav.attributes.insert("role".into(), "navigation".into());
        let mut item = element("div", None, &["nav-item", "active"], Some(2));
        item.attributes.insert("data-index".into(), "0".into());
        vec![
            element("html", None, &[], None),
            element("div", Some("wrapper"), &["block"], Some(0)),
            nav,
            item,
        ]
    }

    #[test]
    fn test_compound_matching() {
        let elements = tree();
        let cases = [
            ("div", 3, true),
            ("DIV", 3, true),
            ("*", 0, true),
            (".nav-item.active", 3, true),
            (".nav-item.missing", 3, false),
            ("#wrapper", 1, true),
            ("div#wrapper.block", 1, true),
            ("[data-index]", 3, true),
            ("[role]", 3, false),
        ];
        for (selector, node, expected) in cases {
            let list = SelectorList::parse(selector).unwrap();
            assert_eq!(list.matches(&elements, node), expected, "{selector}");
        }
    }

    #[test]
    fn test_descendant_and_groups() {
        let elements = tree();
        assert!(SelectorList::parse(".block-index-nav .nav-item")
            .unwrap()
            .matches(&elements, 3));
        assert!(SelectorList::parse("html [data-index]")
            .unwrap()
            .matches(&elements, 3));
        assert!(!SelectorList::parse("#wrapper .nav-item")
            .unwrap()
            .matches(&elements, 3));
        assert!(SelectorList::parse("#wrapper .nav-item, nav .active")
            .unwrap()
            .matches(&elements, 3));
    }

    #[test]
    fn test_invalid_selectors() {
        for selector in ["", " ", "a,", ".", "#", "div > p", "a + b", "[data-index", "#a#b", ":hover"] {
            assert!(
                matches!(SelectorList::parse(selector), Err(DomError::InvalidSelector(_))),
                "{selector:?} should be rejected"
            );
        }
    }
}
