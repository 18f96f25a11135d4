//! Selection analysis for the application menus.
//!
//! The rich editor reports the selection together with its chain of ancestor
//! blocks. From that the menu state is derived: which block types the
//! selection is inside and whether list, code or table commands apply.

use crate::string_utils::slice_utf16;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Selection Input
// ─────────────────────────────────────────────────────────────────────────────

/// Block containing one end of the selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectionBlock {
    pub text: String,
    pub function_type: Option<String>,
}

/// One end of the selection. `offset` counts UTF-16 code units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPoint {
    pub key: String,
    pub offset: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub block: SelectionBlock,
}

/// First child of a list block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AffiliationChild {
    pub is_loose_list_item: bool,
}

/// An ancestor block of the selection, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AffiliationBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub function_type: Option<String>,
    pub list_type: Option<String>,
    pub list_item_type: Option<String>,
    pub is_loose_list_item: bool,
    pub children: Vec<AffiliationChild>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionChange {
    pub start: SelectionPoint,
    pub end: SelectionPoint,
    pub affiliation: Vec<AffiliationBlock>,
}

/// An inline format active in the selection (`strong`, `em`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatItem {
    #[serde(rename = "type")]
    pub kind: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Menu State
// ─────────────────────────────────────────────────────────────────────────────

/// Flags that enable or check items of the paragraph and format menus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMenuState {
    pub is_disabled: bool,
    /// The selection spans more than one block
    pub is_multiline: bool,
    pub is_loose_list_item: bool,
    pub is_task_list: bool,
    /// Code-like block (code, math, html or front matter)
    pub is_code_fences: bool,
    /// A line inside a code block
    pub is_code_content: bool,
    pub is_table: bool,
    /// Block types the selection is inside, e.g. `ul: true`
    pub affiliation: BTreeMap<String, bool>,
}

static LIST_TYPE: OnceLock<Option<Regex>> = OnceLock::new();
static CODE_FENCE_TYPE: OnceLock<Option<Regex>> = OnceLock::new();
static HEADING_TYPE: OnceLock<Option<Regex>> = OnceLock::new();

fn is_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .map_err(|e| warn!("Invalid selection pattern '{}': {}", pattern, e))
            .ok()
    })
    .as_ref()
    .map_or(false, |re| re.is_match(text))
}

fn has_function_type(block: &SelectionBlock, function_type: &str) -> bool {
    block.function_type.as_deref() == Some(function_type)
}

/// Derive the menu state for a selection.
pub fn create_application_menu_state(selection: &SelectionChange) -> ApplicationMenuState {
    let SelectionChange {
        start,
        end,
        affiliation,
    } = selection;

    let mut state = ApplicationMenuState {
        is_multiline: start.key != end.key,
        ..Default::default()
    };

    // Code block like selection (code, math, table cells)
    let in_cells = has_function_type(&start.block, "cellContent")
        && has_function_type(&end.block, "cellContent");
    let start_in_code = has_function_type(&start.block, "codeContent");
    let end_in_code = has_function_type(&end.block, "codeContent");
    if in_cells
        || (start.kind == "span" && start_in_code)
        || (end.kind == "span" && end_in_code)
    {
        state.is_code_fences = true;
        if start_in_code || end_in_code {
            state.is_code_content = true;
        }
    }

    // List information from the nearest list or list item
    if let Some(list) = affiliation
        .first()
        .filter(|block| is_match(&LIST_TYPE, "ul|ol", &block.kind))
    {
        state.affiliation.insert(list.kind.clone(), true);
        state.is_loose_list_item = list
            .children
            .first()
            .map_or(false, |child| child.is_loose_list_item);
        state.is_task_list = list.list_type.as_deref() == Some("task");
    } else if let Some(item) = affiliation
        .get(1)
        .filter(|block| affiliation.len() >= 3 && block.kind == "li")
    {
        let list_type = if item.list_item_type.as_deref() == Some("order") {
            "ol"
        } else {
            "ul"
        };
        state.affiliation.insert(list_type.to_string(), true);
        state.is_loose_list_item = item.is_loose_list_item;
        state.is_task_list = item.list_item_type.as_deref() == Some("task");
    }

    // Three levels cover e.g. "ul -> li -> p"
    for block in affiliation.iter().take(3) {
        match (block.kind.as_str(), block.function_type.as_deref()) {
            ("pre", Some(function_type)) => {
                if is_match(
                    &CODE_FENCE_TYPE,
                    "frontmatter|html|multiplemath|code$",
                    function_type,
                ) {
                    state.is_code_fences = true;
                    state.affiliation.insert(function_type.to_string(), true);
                }
                break;
            }
            ("figure", Some(function_type)) => {
                if function_type == "table" {
                    state.is_table = true;
                    state.is_disabled = true;
                }
                break;
            }
            (kind, _) if state.is_multiline && is_match(&HEADING_TYPE, "^h[1-6]$", kind) => {
                state.affiliation.clear();
                break;
            }
            (kind, _) => {
                state.affiliation.entry(kind.to_string()).or_insert(true);
            }
        }
    }

    if state.affiliation.len() >= 2 {
        state.affiliation.remove("p");
    }
    if state.affiliation.contains_key("ul") || state.affiliation.contains_key("ol") {
        state.affiliation.remove("li");
    }

    state
}

/// Map each active inline format to `true` for the format menu.
pub fn create_selection_format_state(formats: &[FormatItem]) -> BTreeMap<String, bool> {
    formats
        .iter()
        .map(|format| (format.kind.clone(), true))
        .collect()
}

/// Text to put into the search box for a selection inside a single block.
pub fn search_value(selection: &SelectionChange) -> Option<String> {
    let SelectionChange { start, end, .. } = selection;
    if start.key != end.key || start.block.text.is_empty() {
        return None;
    }
    Some(slice_utf16(&start.block.text, start.offset, end.offset).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(key: &str, offset: usize, text: &str) -> SelectionPoint {
        SelectionPoint {
            key: key.to_string(),
            offset,
            kind: "text".to_string(),
            block: SelectionBlock {
                text: text.to_string(),
                function_type: None,
            },
        }
    }

    fn block(kind: &str) -> AffiliationBlock {
        AffiliationBlock {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    fn selection(affiliation: Vec<AffiliationBlock>) -> SelectionChange {
        SelectionChange {
            start: point("a", 0, "text"),
            end: point("a", 2, "text"),
            affiliation,
        }
    }

    #[test]
    fn test_plain_paragraph() {
        let state = create_application_menu_state(&selection(vec![block("p")]));
        assert!(!state.is_multiline);
        assert!(!state.is_code_fences);
        assert_eq!(state.affiliation.get("p"), Some(&true));
    }

    #[test]
    fn test_paragraph_inside_task_list_item() {
        let mut item = block("li");
        item.list_item_type = Some("task".to_string());
        item.is_loose_list_item = true;
        let state =
            create_application_menu_state(&selection(vec![block("p"), item, block("ul")]));

        assert!(state.is_task_list);
        assert!(state.is_loose_list_item);
        // "p" and "li" are dropped once the list type is known
        assert_eq!(state.affiliation.keys().collect::<Vec<_>>(), vec!["ul"]);
    }

    #[test]
    fn test_ordered_list_selected() {
        let mut list = block("ol");
        list.children.push(AffiliationChild {
            is_loose_list_item: true,
        });
        let state = create_application_menu_state(&selection(vec![list]));
        assert_eq!(state.affiliation.get("ol"), Some(&true));
        assert!(state.is_loose_list_item);
        assert!(!state.is_task_list);
    }

    #[test]
    fn test_code_block() {
        let mut sel = selection(vec![
            AffiliationBlock {
                kind: "pre".to_string(),
                function_type: Some("fencecode".to_string()),
                ..Default::default()
            },
            block("figure"),
        ]);
        sel.start.kind = "span".to_string();
        sel.start.block.function_type = Some("codeContent".to_string());

        let state = create_application_menu_state(&sel);
        assert!(state.is_code_fences);
        assert!(state.is_code_content);
        assert_eq!(state.affiliation.get("fencecode"), Some(&true));
        assert!(!state.affiliation.contains_key("figure"));
    }

    #[test]
    fn test_table_disables_menu() {
        let mut sel = selection(vec![
            block("td"),
            AffiliationBlock {
                kind: "figure".to_string(),
                function_type: Some("table".to_string()),
                ..Default::default()
            },
        ]);
        sel.start.block.function_type = Some("cellContent".to_string());
        sel.end.block.function_type = Some("cellContent".to_string());

        let state = create_application_menu_state(&sel);
        assert!(state.is_table);
        assert!(state.is_disabled);
        assert!(state.is_code_fences);
        assert!(!state.is_code_content);
    }

    #[test]
    fn test_multiline_heading_clears_affiliation() {
        let mut sel = selection(vec![block("p"), block("h2")]);
        sel.end.key = "b".to_string();
        let state = create_application_menu_state(&sel);
        assert!(state.is_multiline);
        assert!(state.affiliation.is_empty());
    }

    #[test]
    fn test_same_input_same_output() {
        let sel = selection(vec![block("p"), block("blockquote")]);
        assert_eq!(
            create_application_menu_state(&sel),
            create_application_menu_state(&sel)
        );
    }

    #[test]
    fn test_selection_format_state() {
        let formats = vec![
            FormatItem {
                kind: "strong".to_string(),
            },
            FormatItem {
                kind: "em".to_string(),
            },
        ];
        let state = create_selection_format_state(&formats);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("strong"), Some(&true));
    }

    #[test]
    fn test_search_value() {
        let mut sel = selection(vec![]);
        sel.start = point("a", 4, "Hei på deg");
        sel.end = point("a", 6, "Hei på deg");
        assert_eq!(search_value(&sel).as_deref(), Some("på"));

        sel.end.key = "b".to_string();
        assert_eq!(search_value(&sel), None);
    }

    #[test]
    fn test_decode_selection_json() {
        let json = r#"{
            "start": {"key": "k1", "offset": 0, "type": "text", "block": {"text": "abc", "functionType": "paragraphContent"}},
            "end": {"key": "k1", "offset": 3, "type": "text", "block": {"text": "abc"}},
            "affiliation": [{"type": "p"}, {"type": "li", "listItemType": "order", "isLooseListItem": false}, {"type": "ol"}]
        }"#;
        let sel: SelectionChange = serde_json::from_str(json).unwrap();
        let state = create_application_menu_state(&sel);
        assert_eq!(state.affiliation.keys().collect::<Vec<_>>(), vec!["ol"]);
    }
}
