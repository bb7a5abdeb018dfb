// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::EntityRef;

/// One selectable item in a combobox. Entity lookups and fixed code
/// lists both collapse onto this shape at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboOption {
    pub key: String,
    pub primary_label: String,
    pub secondary_label: Option<String>,
}

impl ComboOption {
    pub fn entity(entity: &EntityRef) -> Self {
        Self {
            key: entity.id.clone(),
            primary_label: entity.display_name.clone(),
            secondary_label: entity.display_id.clone(),
        }
    }

    pub fn code(code: &str, name: &str) -> Self {
        Self {
            key: code.to_owned(),
            primary_label: name.to_owned(),
            secondary_label: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboboxKey {
    Down,
    Up,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboboxCommand {
    Focus,
    /// Blur is delivered by the host *after* any pending click-selection
    /// for the same input cycle, so a selection always lands first.
    Blur,
    Input(String),
    /// Select by index into the currently filtered list.
    Select(usize),
    Clear,
    Key(ComboboxKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboboxEvent {
    /// Carries the selected key; the empty string is the explicit
    /// "cleared" sentinel.
    SelectionChanged(String),
}

/// Searchable-selection state machine. The host owns the actual
/// selection; `selected_key` here is a mirror the host refreshes after
/// every `SelectionChanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combobox {
    options: Vec<ComboOption>,
    search_text: String,
    open: bool,
    focused: Option<usize>,
    selected_key: Option<String>,
}

impl Combobox {
    pub fn new(options: Vec<ComboOption>) -> Self {
        Self {
            options,
            search_text: String::new(),
            open: false,
            focused: None,
            selected_key: None,
        }
    }

    /// Replaces the option list (lookups load asynchronously after the
    /// widget exists). Focus is re-clamped against the new filtered
    /// list; a selected key absent from the new list is kept and simply
    /// displays as empty until the list catches up.
    pub fn set_options(&mut self, options: Vec<ComboOption>) {
        self.options = options;
        self.clamp_focus();
    }

    pub fn set_selected_key(&mut self, key: Option<&str>) {
        self.selected_key = key.filter(|value| !value.is_empty()).map(str::to_owned);
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selected_key.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    pub fn options(&self) -> &[ComboOption] {
        &self.options
    }

    /// Case-insensitive substring match over primary OR secondary label.
    /// An empty search returns the full list in input order.
    pub fn filtered(&self) -> Vec<&ComboOption> {
        let term = self.search_text.to_lowercase();
        if term.is_empty() {
            return self.options.iter().collect();
        }
        self.options
            .iter()
            .filter(|option| {
                option.primary_label.to_lowercase().contains(&term)
                    || option
                        .secondary_label
                        .as_ref()
                        .is_some_and(|label| label.to_lowercase().contains(&term))
            })
            .collect()
    }

    /// Closed-state display text. Never consults `search_text`; an
    /// unresolvable selected key degrades to empty.
    pub fn display_value(&self) -> String {
        let Some(key) = self.selected_key.as_deref() else {
            return String::new();
        };
        let Some(option) = self.options.iter().find(|option| option.key == key) else {
            return String::new();
        };
        match &option.secondary_label {
            Some(secondary) => format!("{} ({secondary})", option.primary_label),
            None => option.primary_label.clone(),
        }
    }

    pub fn dispatch(&mut self, command: ComboboxCommand) -> Vec<ComboboxEvent> {
        match command {
            ComboboxCommand::Focus => {
                self.open = true;
                self.focused = None;
                Vec::new()
            }
            ComboboxCommand::Blur => {
                self.open = false;
                if self.selected_key.is_none() {
                    self.search_text.clear();
                }
                Vec::new()
            }
            ComboboxCommand::Input(text) => {
                self.search_text = text;
                self.open = true;
                self.focused = None;
                Vec::new()
            }
            ComboboxCommand::Select(index) => self.select_filtered(index).into_iter().collect(),
            ComboboxCommand::Clear => {
                self.search_text.clear();
                self.focused = None;
                vec![ComboboxEvent::SelectionChanged(String::new())]
            }
            ComboboxCommand::Key(key) => self.handle_key(key).into_iter().collect(),
        }
    }

    fn handle_key(&mut self, key: ComboboxKey) -> Option<ComboboxEvent> {
        let filtered_len = self.filtered().len();
        match key {
            ComboboxKey::Down => {
                self.open = true;
                if filtered_len > 0 {
                    self.focused = Some(match self.focused {
                        Some(index) => (index + 1).min(filtered_len - 1),
                        None => 0,
                    });
                }
                None
            }
            ComboboxKey::Up => {
                if filtered_len > 0 {
                    self.focused = Some(match self.focused {
                        Some(index) => index.saturating_sub(1),
                        None => 0,
                    });
                }
                None
            }
            ComboboxKey::Enter => {
                let index = self.focused?;
                self.select_filtered(index)
            }
            ComboboxKey::Escape => {
                self.open = false;
                self.focused = None;
                None
            }
        }
    }

    fn select_filtered(&mut self, index: usize) -> Option<ComboboxEvent> {
        let key = self.filtered().get(index).map(|option| option.key.clone())?;
        self.search_text.clear();
        self.open = false;
        self.focused = None;
        Some(ComboboxEvent::SelectionChanged(key))
    }

    fn clamp_focus(&mut self) {
        let filtered_len = self.filtered().len();
        self.focused = match self.focused {
            Some(_) if filtered_len == 0 => None,
            Some(index) => Some(index.min(filtered_len - 1)),
            None => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{Combobox, ComboboxCommand, ComboboxEvent, ComboboxKey, ComboOption};

    fn entity_options() -> Vec<ComboOption> {
        vec![
            ComboOption {
                key: "A1".to_owned(),
                primary_label: "Acme".to_owned(),
                secondary_label: Some("001".to_owned()),
            },
            ComboOption {
                key: "B2".to_owned(),
                primary_label: "Bolt".to_owned(),
                secondary_label: Some("002".to_owned()),
            },
        ]
    }

    #[test]
    fn empty_search_returns_all_options_in_input_order() {
        let combobox = Combobox::new(entity_options());
        let keys: Vec<&str> = combobox
            .filtered()
            .iter()
            .map(|option| option.key.as_str())
            .collect();
        assert_eq!(keys, vec!["A1", "B2"]);
    }

    #[test]
    fn filter_matches_primary_or_secondary_label() {
        let mut combobox = Combobox::new(entity_options());

        combobox.dispatch(ComboboxCommand::Input("00".to_owned()));
        assert_eq!(combobox.filtered().len(), 2);

        combobox.dispatch(ComboboxCommand::Input("acme".to_owned()));
        let filtered = combobox.filtered();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].key, "A1");
    }

    #[test]
    fn absent_secondary_label_never_matches() {
        let mut combobox = Combobox::new(vec![ComboOption::code("USD", "US Dollar")]);
        combobox.dispatch(ComboboxCommand::Input("usd".to_owned()));
        assert!(combobox.filtered().is_empty());

        combobox.dispatch(ComboboxCommand::Input("dollar".to_owned()));
        assert_eq!(combobox.filtered().len(), 1);
    }

    #[test]
    fn select_then_blur_shows_display_value() {
        let mut combobox = Combobox::new(entity_options());
        combobox.dispatch(ComboboxCommand::Focus);
        combobox.dispatch(ComboboxCommand::Input("acme".to_owned()));

        let events = combobox.dispatch(ComboboxCommand::Select(0));
        assert_eq!(
            events,
            vec![ComboboxEvent::SelectionChanged("A1".to_owned())]
        );
        assert!(!combobox.is_open());
        assert_eq!(combobox.search_text(), "");

        // Host reflects the selection back, then delivers the blur.
        combobox.set_selected_key(Some("A1"));
        combobox.dispatch(ComboboxCommand::Blur);
        assert_eq!(combobox.display_value(), "Acme (001)");
    }

    #[test]
    fn blur_without_selection_clears_abandoned_search() {
        let mut combobox = Combobox::new(entity_options());
        combobox.dispatch(ComboboxCommand::Focus);
        combobox.dispatch(ComboboxCommand::Input("zzz".to_owned()));
        combobox.dispatch(ComboboxCommand::Blur);

        assert!(!combobox.is_open());
        assert_eq!(combobox.search_text(), "");
    }

    #[test]
    fn blur_with_selection_keeps_search_text() {
        let mut combobox = Combobox::new(entity_options());
        combobox.set_selected_key(Some("B2"));
        combobox.dispatch(ComboboxCommand::Input("bo".to_owned()));
        combobox.dispatch(ComboboxCommand::Blur);
        assert_eq!(combobox.search_text(), "bo");
    }

    #[test]
    fn clear_emits_empty_sentinel_and_leaves_dropdown_open() {
        let mut combobox = Combobox::new(entity_options());
        combobox.set_selected_key(Some("A1"));
        combobox.dispatch(ComboboxCommand::Focus);

        let events = combobox.dispatch(ComboboxCommand::Clear);
        assert_eq!(
            events,
            vec![ComboboxEvent::SelectionChanged(String::new())]
        );
        assert!(combobox.is_open());
    }

    #[test]
    fn arrow_navigation_clamps_to_filtered_bounds() {
        let mut combobox = Combobox::new(entity_options());

        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));
        assert!(combobox.is_open());
        assert_eq!(combobox.focused_index(), Some(0));

        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));
        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));
        assert_eq!(combobox.focused_index(), Some(1));

        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Up));
        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Up));
        assert_eq!(combobox.focused_index(), Some(0));
    }

    #[test]
    fn arrow_keys_on_empty_filtered_list_leave_focus_unset() {
        let mut combobox = Combobox::new(entity_options());
        combobox.dispatch(ComboboxCommand::Input("nothing".to_owned()));

        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));
        assert_eq!(combobox.focused_index(), None);

        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Up));
        assert_eq!(combobox.focused_index(), None);
    }

    #[test]
    fn enter_selects_the_focused_filtered_option() {
        let mut combobox = Combobox::new(entity_options());
        combobox.dispatch(ComboboxCommand::Input("bolt".to_owned()));
        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));

        let events = combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Enter));
        assert_eq!(
            events,
            vec![ComboboxEvent::SelectionChanged("B2".to_owned())]
        );
    }

    #[test]
    fn enter_without_focus_is_a_no_op() {
        let mut combobox = Combobox::new(entity_options());
        let events = combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Enter));
        assert!(events.is_empty());
    }

    #[test]
    fn escape_closes_without_touching_search_or_selection() {
        let mut combobox = Combobox::new(entity_options());
        combobox.set_selected_key(Some("A1"));
        combobox.dispatch(ComboboxCommand::Input("bo".to_owned()));

        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Escape));
        assert!(!combobox.is_open());
        assert_eq!(combobox.focused_index(), None);
        assert_eq!(combobox.search_text(), "bo");
        assert_eq!(combobox.selected_key(), Some("A1"));
    }

    #[test]
    fn stale_selected_key_displays_as_empty() {
        let mut combobox = Combobox::new(Vec::new());
        combobox.set_selected_key(Some("A1"));
        assert_eq!(combobox.display_value(), "");

        // The lookup finishes later; display resolves on the same key.
        combobox.set_options(entity_options());
        assert_eq!(combobox.display_value(), "Acme (001)");
    }

    #[test]
    fn narrowing_the_option_list_reclamps_focus() {
        let mut combobox = Combobox::new(entity_options());
        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));
        combobox.dispatch(ComboboxCommand::Key(ComboboxKey::Down));
        assert_eq!(combobox.focused_index(), Some(1));

        combobox.set_options(vec![ComboOption::code("EUR", "Euro")]);
        assert_eq!(combobox.focused_index(), Some(0));

        combobox.set_options(Vec::new());
        assert_eq!(combobox.focused_index(), None);
    }

    #[test]
    fn display_without_secondary_label_is_primary_only() {
        let mut combobox = Combobox::new(vec![ComboOption::code("EUR", "Euro")]);
        combobox.set_selected_key(Some("EUR"));
        assert_eq!(combobox.display_value(), "Euro");
    }
}
