use crate::catalog::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Categories,
    Actions,
}

/// Pure navigation state. Selection indices are always clamped to the bounds
/// of their current lists, never wrapped; callers pass the list lengths in so
/// this stays free of catalog I/O.
#[derive(Debug, Clone)]
pub struct NavState {
    pub active_pane: Pane,
    pub selected_category: usize,
    pub selected_action: usize,
    pub search_mode: bool,
    pub search_term: String,
    pub search_results: Vec<Action>,
    pub scroll_offset: usize,
}

impl Default for NavState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active_pane: Pane::Categories,
            selected_category: 0,
            selected_action: 0,
            search_mode: false,
            search_term: String::new(),
            search_results: Vec::new(),
            scroll_offset: 0,
        }
    }

    pub fn clamp(&mut self, category_len: usize, action_len: usize) {
        self.selected_category = clamp_index(self.selected_category, category_len);
        self.selected_action = clamp_index(self.selected_action, action_len);
    }

    /// Returns true when the category selection actually moved, which means
    /// the caller must reload the action list.
    pub fn category_up(&mut self, len: usize) -> bool {
        let before = self.selected_category;
        self.selected_category = clamp_index(before.saturating_sub(1), len);
        self.after_category_move(before)
    }

    pub fn category_down(&mut self, len: usize) -> bool {
        let before = self.selected_category;
        self.selected_category = clamp_index(before + 1, len);
        self.after_category_move(before)
    }

    fn after_category_move(&mut self, before: usize) -> bool {
        if self.selected_category == before {
            return false;
        }
        self.selected_action = 0;
        self.scroll_offset = 0;
        true
    }

    pub fn action_up(&mut self, len: usize) {
        self.selected_action = clamp_index(self.selected_action.saturating_sub(1), len);
    }

    pub fn action_down(&mut self, len: usize) {
        self.selected_action = clamp_index(self.selected_action + 1, len);
    }

    /// Left always returns focus to the category pane.
    pub fn focus_left(&mut self) {
        self.active_pane = Pane::Categories;
    }

    /// Right only moves focus when there is at least one action to land on.
    pub fn focus_right(&mut self, action_len: usize) -> bool {
        if self.active_pane == Pane::Categories && action_len > 0 {
            self.active_pane = Pane::Actions;
            return true;
        }
        false
    }

    pub fn enter_search(&mut self) {
        self.search_mode = true;
        self.search_term.clear();
        self.search_results.clear();
        self.selected_action = 0;
    }

    /// Escape: discard results and resume normal browsing at the top of the
    /// current action list.
    pub fn exit_search(&mut self) {
        self.search_mode = false;
        self.search_term.clear();
        self.search_results.clear();
        self.selected_action = 0;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_term.push(c);
    }

    pub fn pop_search_char(&mut self) {
        self.search_term.pop();
    }

    /// Highlighted entry of the list the actions pane currently shows.
    #[must_use]
    pub fn highlighted<'a>(&'a self, actions: &'a [Action]) -> Option<&'a Action> {
        let list = if self.search_mode {
            &self.search_results[..]
        } else {
            actions
        };
        list.get(self.selected_action)
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}
