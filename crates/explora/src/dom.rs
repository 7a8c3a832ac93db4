// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backend-neutral element tree.
//!
//! Views render into an [`Element`] first. The browser backend mirrors the tree into
//! real DOM nodes, tests simply inspect it.

use std::borrow::Cow;
use std::fmt::{self, Display, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: &'static str,
    class: Option<Cow<'static, str>>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Element {
            tag,
            class: None,
            children: Vec::new(),
        }
    }

    pub fn class<C>(mut self, class: C) -> Self
    where
        C: Into<Cow<'static, str>>,
    {
        self.class = Some(class.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn text<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text<T>(&mut self, text: T)
    where
        T: Into<String>,
    {
        self.children.clear();
        self.children.push(Node::Text(text.into()));
    }

    /// First element with a matching tag, depth-first, including `self`.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }

        self.children.iter().find_map(|child| match child {
            Node::Element(el) => el.find(tag),
            Node::Text(_) => None,
        })
    }

    pub fn find_mut(&mut self, tag: &str) -> Option<&mut Element> {
        if self.tag == tag {
            return Some(self);
        }

        self.children.iter_mut().find_map(|child| match child {
            Node::Element(el) => el.find_mut(tag),
            Node::Text(_) => None,
        })
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(el) => el.collect_text(out),
                Node::Text(text) => out.push_str(text),
            }
        }
    }
}

/// Renders the tree as HTML.
impl Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}", self.tag)?;

        if let Some(class) = &self.class {
            f.write_str(" class=\"")?;
            escape(f, class)?;
            f.write_char('"')?;
        }

        f.write_char('>')?;

        for child in &self.children {
            match child {
                Node::Element(el) => Display::fmt(el, f)?,
                Node::Text(text) => escape(f, text)?,
            }
        }

        write!(f, "</{}>", self.tag)
    }
}

fn escape(f: &mut fmt::Formatter, text: &str) -> fmt::Result {
    for c in text.chars() {
        match c {
            '&' => f.write_str("&amp;")?,
            '<' => f.write_str("&lt;")?,
            '>' => f.write_str("&gt;")?,
            '"' => f.write_str("&quot;")?,
            c => f.write_char(c)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Element {
        Element::new("div")
            .class("box")
            .child(Element::new("button").text("count is ").text("3"))
    }

    #[test]
    fn html_output() {
        assert_eq!(
            tree().to_string(),
            r#"<div class="box"><button>count is 3</button></div>"#
        );
    }

    #[test]
    fn html_escapes_text_and_class() {
        let el = Element::new("p").class("a\"b").text("<x> & y");

        assert_eq!(
            el.to_string(),
            r#"<p class="a&quot;b">&lt;x&gt; &amp; y</p>"#
        );
    }

    #[test]
    fn find_and_text() {
        let tree = tree();
        let button = tree.find("button").unwrap();

        assert_eq!(button.text_content(), "count is 3");
        assert_eq!(tree.text_content(), "count is 3");
        assert!(tree.find("span").is_none());
    }

    #[test]
    fn set_text_replaces_children() {
        let mut tree = tree();

        tree.find_mut("button").unwrap().set_text("count is 4");

        assert_eq!(tree.find("button").unwrap().children().len(), 1);
        assert_eq!(tree.text_content(), "count is 4");
    }
}
