//! Tree view state shared by the file tree and the node tree.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Focus, expansion and selection of a tree view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeViewState {
    pub focused_item: Option<String>,
    pub expanded_items_obj: HashSet<String>,
    pub selected_items: Vec<String>,
    pub selected_items_obj: HashSet<String>,
}

/// Uid changes a view state must absorb
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStateUpdate {
    pub deleted_uids: Vec<String>,
    pub converted_uids: Vec<(String, String)>,
}

impl ViewStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.deleted_uids.is_empty() && self.converted_uids.is_empty()
    }
}

impl TreeViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `uid` was already focused
    pub fn focus(&mut self, uid: &str) -> bool {
        if self.focused_item.as_deref() == Some(uid) {
            return false;
        }
        self.focused_item = Some(uid.to_string());
        true
    }

    /// Replace the selection. Returns false if it is unchanged.
    pub fn select(&mut self, uids: &[String]) -> bool {
        let mut ordered = Vec::with_capacity(uids.len());
        let mut set = HashSet::with_capacity(uids.len());
        for uid in uids {
            if set.insert(uid.clone()) {
                ordered.push(uid.clone());
            }
        }

        if set == self.selected_items_obj {
            return false;
        }
        self.selected_items = ordered;
        self.selected_items_obj = set;
        true
    }

    pub fn expand(&mut self, uids: &[String]) {
        self.expanded_items_obj.extend(uids.iter().cloned());
    }

    pub fn collapse(&mut self, uids: &[String]) {
        for uid in uids {
            self.expanded_items_obj.remove(uid);
        }
    }

    pub fn is_selected(&self, uid: &str) -> bool {
        self.selected_items_obj.contains(uid)
    }

    pub fn is_expanded(&self, uid: &str) -> bool {
        self.expanded_items_obj.contains(uid)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True if focus, expansion or selection mentions `uid`
    pub fn references(&self, uid: &str) -> bool {
        self.focused_item.as_deref() == Some(uid)
            || self.expanded_items_obj.contains(uid)
            || self.selected_items_obj.contains(uid)
    }

    /// Every uid the state mentions
    pub fn referenced_uids(&self) -> HashSet<String> {
        let mut uids: HashSet<String> = self.expanded_items_obj.iter().cloned().collect();
        uids.extend(self.selected_items.iter().cloned());
        uids.extend(self.focused_item.iter().cloned());
        uids
    }

    /// Drop every reference to `deleted`
    pub fn remove_uids(&mut self, deleted: &[String]) {
        if deleted.is_empty() {
            return;
        }
        let deleted: HashSet<&str> = deleted.iter().map(String::as_str).collect();

        if self
            .focused_item
            .as_deref()
            .is_some_and(|uid| deleted.contains(uid))
        {
            self.focused_item = None;
        }
        self.expanded_items_obj.retain(|uid| !deleted.contains(uid.as_str()));
        self.selected_items.retain(|uid| !deleted.contains(uid.as_str()));
        self.selected_items_obj.retain(|uid| !deleted.contains(uid.as_str()));
    }

    /// Rename uids. All pairs are resolved against the state before the
    /// call, so chains and swaps map correctly.
    pub fn convert_uids(&mut self, pairs: &[(String, String)]) {
        if pairs.is_empty() {
            return;
        }
        let map: HashMap<&str, &str> = pairs
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
            .collect();
        let remap = |uid: &String| -> String {
            map.get(uid.as_str())
                .map(|new| new.to_string())
                .unwrap_or_else(|| uid.clone())
        };

        self.focused_item = self.focused_item.as_ref().map(remap);
        self.expanded_items_obj = self.expanded_items_obj.iter().map(remap).collect();

        let mut seen = HashSet::with_capacity(self.selected_items.len());
        self.selected_items = self
            .selected_items
            .iter()
            .map(remap)
            .filter(|uid| seen.insert(uid.clone()))
            .collect();
        self.selected_items_obj = seen;
    }

    /// Apply conversions first, then deletions
    pub fn apply(&mut self, update: &ViewStateUpdate) {
        self.convert_uids(&update.converted_uids);
        self.remove_uids(&update.deleted_uids);
    }

    /// Drop references for which `exists` returns false
    pub fn retain_existing(&mut self, exists: impl Fn(&str) -> bool) {
        let missing: Vec<String> = self
            .referenced_uids()
            .into_iter()
            .filter(|uid| !exists(uid))
            .collect();
        self.remove_uids(&missing);
    }
}
