//! Sibling grouping policy for cluster page menus.
//!
//! A page whose menu entry has a parent id is rendered inside the shared tab
//! shell together with every entry under the same parent, the page itself
//! included. Pages without a menu entry, or whose entry has no parent, render
//! directly.

use crate::extension::model::MenuEntry;

/// Menu entries sharing the parent of `page_id`'s entry, in declaration
/// order. Empty when the page has no entry or the entry has no parent.
pub fn sibling_entries<'a>(menus: &'a [MenuEntry], page_id: &str) -> Vec<&'a MenuEntry> {
    let parent_id = menus
        .iter()
        .find(|entry| entry.target_page_id == page_id)
        .and_then(|entry| entry.parent_id.as_deref());

    let Some(parent_id) = parent_id else {
        return vec![];
    };
    menus
        .iter()
        .filter(|entry| entry.parent_id.as_deref() == Some(parent_id))
        .collect()
}

/// Page ids of [`sibling_entries`].
pub fn sibling_page_ids(menus: &[MenuEntry], page_id: &str) -> Vec<String> {
    sibling_entries(menus, page_id)
        .into_iter()
        .map(|entry| entry.target_page_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{sibling_entries, sibling_page_ids};
    use crate::extension::model::MenuEntry;

    fn menus() -> Vec<MenuEntry> {
        vec![
            MenuEntry::new("overview", "Overview"),
            MenuEntry::new("settings", "Settings").with_parent("overview"),
            MenuEntry::new("logs", "Logs"),
            MenuEntry::new("advanced", "Advanced").with_parent("overview"),
            MenuEntry::new("events", "Events").with_parent("logs"),
        ]
    }

    #[test]
    fn groups_entries_sharing_a_parent_in_declaration_order() {
        assert_eq!(sibling_page_ids(&menus(), "settings"), vec!["settings", "advanced"]);
        assert_eq!(sibling_page_ids(&menus(), "advanced"), vec!["settings", "advanced"]);
        assert_eq!(sibling_page_ids(&menus(), "events"), vec!["events"]);
    }

    #[test]
    fn no_parent_or_no_entry_means_no_siblings() {
        assert!(sibling_page_ids(&menus(), "overview").is_empty());
        assert!(sibling_page_ids(&menus(), "unlisted").is_empty());
        assert!(sibling_page_ids(&[], "settings").is_empty());
    }

    #[test]
    fn is_idempotent() {
        let menus = menus();
        let first = sibling_page_ids(&menus, "settings");
        let second = sibling_page_ids(&menus, "settings");
        assert_eq!(first, second);
        assert_eq!(sibling_entries(&menus, "settings")[1].title, "Advanced");
    }
}
