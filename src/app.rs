use anyhow::Result;
use tracing::{info, warn};

use crate::catalog::{self, Action, ActionRef, Catalog, Category};
use crate::config::Config;
use crate::input::{Key, KeySource};
use crate::nav::{NavState, Pane};
use crate::overlay::{self, CancelToken, ExecPlan};
use crate::render::{self, RenderState, Surface, View};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Owns every piece of menu state and drives the input loop. No globals: the
/// catalog, config, navigation and render snapshot all live here.
pub struct App {
    catalog: Catalog,
    config: Config,
    theme: Theme,
    nav: NavState,
    categories: Vec<Category>,
    actions: Vec<Action>,
    favorites: Vec<ActionRef>,
    category_width: u16,
    /// Previous-frame snapshot; `None` forces the next draw to be full.
    prev: Option<RenderState>,
}

impl App {
    /// # Errors
    /// Returns error if the catalog or config cannot be loaded.
    pub fn new(catalog: Catalog) -> Result<Self> {
        let config = Config::load_or_init(&catalog.config_path())?;
        let theme = Theme::builtin(config.theme);
        let categories = catalog.load_categories()?;
        let category_width = render::category_width(&categories, config.category_width_override);
        let mut app = Self {
            catalog,
            config,
            theme,
            nav: NavState::new(),
            categories,
            actions: Vec::new(),
            favorites: Vec::new(),
            category_width,
            prev: None,
        };
        app.reload_actions();
        Ok(app)
    }

    /// The blocking input loop: draw, read one key, dispatch. Returns on `q`.
    ///
    /// # Errors
    /// Returns error if terminal I/O or the key source fails.
    pub fn run<S: Surface, K: KeySource>(&mut self, surface: &mut S, keys: &mut K) -> Result<()> {
        loop {
            self.draw(surface)?;
            let key = keys.next_key()?;
            let flow = if self.nav.search_mode {
                self.handle_search_key(surface, keys, key)?
            } else {
                self.handle_normal_key(surface, keys, key)?
            };
            if flow == Flow::Quit {
                info!("quit");
                return Ok(());
            }
        }
    }

    fn draw<S: Surface>(&mut self, surface: &mut S) -> Result<()> {
        let status = self.status_line();
        let view = View {
            theme: &self.theme,
            categories: &self.categories,
            actions: self.visible_actions(),
            favorites: &self.favorites,
            nav: &self.nav,
            category_width: self.category_width,
            status: &status,
        };
        match self.prev {
            None => render::draw_full(surface, &view),
            Some(prev) => render::draw_incremental(surface, prev, &view),
        }
        surface.flush()?;
        self.prev = Some(RenderState::of(&self.nav));
        Ok(())
    }

    fn visible_actions(&self) -> &[Action] {
        if self.nav.search_mode {
            &self.nav.search_results
        } else {
            &self.actions
        }
    }

    /// Deliberately independent of the selected action index, so that an
    /// action-only selection change does not invalidate the status line.
    fn status_line(&self) -> String {
        if self.nav.search_mode {
            return format!(
                "/{}  {} matches | Enter runs, Esc leaves search",
                self.nav.search_term,
                self.nav.search_results.len()
            );
        }
        let category = self
            .categories
            .get(self.nav.selected_category)
            .map(|c| c.display_name.as_str())
            .unwrap_or("");
        format!(
            "{category}: {} actions | theme {} | */fav  /search  ?help  q quit",
            self.actions.len(),
            self.theme.name.as_str()
        )
    }

    fn reload_actions(&mut self) {
        if let Some(category) = self.categories.get(self.nav.selected_category) {
            self.actions = self.catalog.load_actions(category);
        } else {
            self.actions = Vec::new();
        }
        self.favorites = self.catalog.favorites();
        // In search mode the actions pane shows the result list, so the
        // selection must be clamped against that, not the category's list.
        let visible_len = if self.nav.search_mode {
            self.nav.search_results.len()
        } else {
            self.actions.len()
        };
        self.nav.clamp(self.categories.len(), visible_len);
    }

    fn handle_normal_key<S: Surface, K: KeySource>(
        &mut self,
        surface: &mut S,
        keys: &mut K,
        key: Key,
    ) -> Result<Flow> {
        match key {
            Key::Up => match self.nav.active_pane {
                Pane::Categories => {
                    if self.nav.category_up(self.categories.len()) {
                        self.reload_actions();
                    }
                }
                Pane::Actions => self.nav.action_up(self.actions.len()),
            },
            Key::Down => match self.nav.active_pane {
                Pane::Categories => {
                    if self.nav.category_down(self.categories.len()) {
                        self.reload_actions();
                    }
                }
                Pane::Actions => self.nav.action_down(self.actions.len()),
            },
            Key::Left => self.nav.focus_left(),
            Key::Right => {
                self.nav.focus_right(self.actions.len());
            }
            Key::Enter => {
                if self.nav.active_pane == Pane::Actions {
                    self.execute_highlighted(surface, keys)?;
                }
            }
            Key::Char('*') => self.toggle_favorite()?,
            Key::Char('/') => {
                self.nav.enter_search();
                self.prev = None;
            }
            Key::Char('?') => self.show_help(surface, keys)?,
            Key::Char('t') => self.cycle_theme()?,
            Key::Char('q') => return Ok(Flow::Quit),
            Key::Resize => {
                surface.refresh_size();
                self.prev = None;
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn handle_search_key<S: Surface, K: KeySource>(
        &mut self,
        surface: &mut S,
        keys: &mut K,
        key: Key,
    ) -> Result<Flow> {
        match key {
            Key::Esc => {
                self.nav.exit_search();
                self.prev = None;
            }
            Key::Backspace => {
                self.nav.pop_search_char();
                self.recompute_search();
            }
            Key::Enter => {
                // Runs the highlighted hit, then search mode resumes as-is.
                if !self.nav.search_results.is_empty() {
                    self.execute_highlighted(surface, keys)?;
                }
            }
            Key::Up => self.nav.action_up(self.nav.search_results.len()),
            Key::Down => self.nav.action_down(self.nav.search_results.len()),
            Key::Char(c) if !c.is_control() => {
                self.nav.push_search_char(c);
                self.recompute_search();
            }
            Key::Resize => {
                surface.refresh_size();
                self.prev = None;
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    /// Full recompute on every keystroke; the catalog is small enough that an
    /// index is not worth carrying.
    fn recompute_search(&mut self) {
        self.nav.search_results =
            catalog::search_actions(&self.catalog, &self.categories, &self.nav.search_term);
        self.nav.selected_action = 0;
        // List contents changed, not just the selection; repaint the pane.
        self.prev = None;
    }

    /// Only meaningful with the actions pane focused; the categories pane has
    /// no highlighted action to toggle.
    fn toggle_favorite(&mut self) -> Result<()> {
        if self.nav.active_pane != Pane::Actions {
            return Ok(());
        }
        let Some(action) = self.nav.highlighted(&self.actions) else {
            return Ok(());
        };
        let reference = action.reference.clone();
        self.catalog.toggle_favorite(&reference)?;
        // A toggle inside the Favorites view changes the list itself.
        self.reload_actions();
        self.prev = None;
        Ok(())
    }

    fn show_help<S: Surface, K: KeySource>(&mut self, surface: &mut S, keys: &mut K) -> Result<()> {
        render::draw_help(surface, &self.theme);
        surface.flush()?;
        let _ = keys.next_key()?;
        self.prev = None;
        Ok(())
    }

    fn cycle_theme(&mut self) -> Result<()> {
        self.config.theme = self.config.theme.cycle();
        self.theme = Theme::builtin(self.config.theme);
        self.config.save(&self.catalog.config_path())?;
        self.prev = None;
        Ok(())
    }

    /// The full execution path: dependency check, optional confirmation,
    /// recent recording, supervised run, dismissal.
    fn execute_highlighted<S: Surface, K: KeySource>(
        &mut self,
        surface: &mut S,
        keys: &mut K,
    ) -> Result<()> {
        let Some(action) = self.nav.highlighted(self.visible_actions()).cloned() else {
            return Ok(());
        };
        self.prev = None;
        match overlay::plan(&action, &self.config) {
            ExecPlan::Blocked(missing) => {
                warn!(action = %action.reference, ?missing, "blocked on dependencies");
                overlay::draw_blocked(surface, &self.theme, &missing);
                let _ = keys.next_key()?;
                return Ok(());
            }
            ExecPlan::NeedsConfirm => {
                overlay::draw_confirm(surface, &self.theme, &action);
                if !matches!(keys.next_key()?, Key::Char('y' | 'Y')) {
                    return Ok(());
                }
            }
            ExecPlan::Ready => {}
        }

        // Recorded before the overlay runs, whatever the eventual outcome.
        self.catalog.record_recent(&action.reference)?;

        let mut job = match overlay::spawn_job(&action) {
            Ok(job) => job,
            Err(e) => {
                warn!(action = %action.reference, error = %e, "spawn failed");
                overlay::draw_blocked(surface, &self.theme, &[format!("spawn failed: {e}")]);
                let _ = keys.next_key()?;
                return Ok(());
            }
        };
        let token = CancelToken::new();
        let outcome = overlay::supervise(surface, &self.theme, &action, &mut job, &token, |t| {
            keys.poll_key(t)
        });
        info!(action = %action.reference, ?outcome, "job finished");
        if self.config.auto_save_logs {
            if let Err(e) = job.save_log(&self.catalog.logs_dir(), &action.reference.unit_stem) {
                warn!(error = %e, "saving log failed");
            }
        }
        overlay::wait_for_dismissal(keys)?;

        // The Recent view (and favorites markers) may have changed underneath.
        self.reload_actions();
        Ok(())
    }
}
