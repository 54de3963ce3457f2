//! The element handed to the exporter: the resume preview's markup plus the
//! attributes on its root node.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

const DEFAULT_TAG: &str = "div";

/// A snapshot of the preview element as the editor sees it.
///
/// `attributes` belong to the root node (`style`, `class`, `id`, ...).
/// `markup` is its inner HTML. `scroll_height` is the height the editor
/// measured, used only for logging against the captured raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceElement {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub markup: String,
    #[serde(default)]
    pub scroll_height: Option<u32>,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl SourceElement {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            tag: default_tag(),
            attributes: BTreeMap::new(),
            markup: markup.into(),
            scroll_height: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// An element with no markup has nothing mounted to capture.
    pub fn is_mounted(&self) -> bool {
        !self.markup.trim().is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Serializes the element, root attributes included, as HTML.
    ///
    /// The tag and attribute names are restricted to `[A-Za-z0-9-_:]`; invalid
    /// names are dropped and a bad tag falls back to `div`.
    pub fn outer_html(&self) -> String {
        let tag = if is_valid_name(&self.tag) {
            self.tag.as_str()
        } else {
            DEFAULT_TAG
        };

        let mut html = String::with_capacity(self.markup.len() + 64);
        html.push('<');
        html.push_str(tag);
        for (name, value) in &self.attributes {
            if !is_valid_name(name) {
                continue;
            }
            let _ = write!(html, " {}=\"{}\"", name, escape_attribute(value));
        }
        html.push('>');
        html.push_str(&self.markup);
        let _ = write!(html, "</{tag}>");
        html
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
