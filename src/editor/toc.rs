//! Table of contents of the active document.
//!
//! The rich editor reports a flat list of headings; the sidebar shows them as
//! a tree where every heading nests under the closest preceding heading of a
//! lower level.

use serde::{Deserialize, Serialize};

/// One heading as reported by the rich editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    pub content: String,
    pub lvl: u8,
    #[serde(default)]
    pub slug: String,
}

/// A heading with its nested sub-headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocNode {
    pub label: String,
    pub lvl: u8,
    pub slug: String,
    pub children: Vec<TocNode>,
}

impl TocNode {
    fn new(item: &TocItem) -> Self {
        Self {
            label: item.content.clone(),
            lvl: item.lvl,
            slug: item.slug.clone(),
            children: Vec::new(),
        }
    }
}

/// Build the heading tree from the flat list.
///
/// A heading becomes a child of the last open heading with a lower level;
/// headings of the same level are siblings.
pub fn list_to_tree(list: &[TocItem]) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    // Open headings from the root down to the most recent one
    let mut open: Vec<TocNode> = Vec::new();

    for item in list {
        while open.last().map_or(false, |node| node.lvl >= item.lvl) {
            close_last(&mut open, &mut roots);
        }
        open.push(TocNode::new(item));
    }
    while !open.is_empty() {
        close_last(&mut open, &mut roots);
    }

    roots
}

fn close_last(open: &mut Vec<TocNode>, roots: &mut Vec<TocNode>) {
    if let Some(node) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Document title used for exports.
///
/// The first level-1 heading within the first six headings wins; otherwise the
/// first heading with the lowest level among them.
pub fn document_title(list: &[TocItem]) -> String {
    let Some(first) = list.first() else {
        return String::new();
    };

    let mut title = first;
    for header in list.iter().take(6).skip(1) {
        if title.lvl == 1 {
            break;
        }
        if title.lvl > header.lvl {
            title = header;
        }
    }
    title.content.clone()
}
