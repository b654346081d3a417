use std::io::{self, Write};

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType};

use crate::catalog::{Action, ActionRef, Category};
use crate::nav::{NavState, Pane};
use crate::theme::Theme;

/// First list row, counted from the top of the terminal.
pub const LIST_START_ROW: u16 = 5;

const TITLE_ROW: u16 = 0;
const SUBTITLE_ROW: u16 = 1;
const TOP_SEP_ROW: u16 = 2;
const HEADER_ROW: u16 = 3;

/// Rows reserved at the bottom: separator, preview, status.
const BOTTOM_RESERVED: u16 = 4;

pub const MIN_CATEGORY_WIDTH: u16 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Option<Color>,
    pub bold: bool,
}

impl CellStyle {
    #[must_use]
    pub fn fg(color: Color) -> Self {
        Self {
            fg: color,
            bg: None,
            bold: false,
        }
    }

    #[must_use]
    pub fn on(mut self, bg: Color) -> Self {
        self.bg = Some(bg);
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Where styled text lands. The terminal implementation queues cursor moves;
/// the buffer implementation records cells so rendering is testable without a
/// terminal.
pub trait Surface {
    /// (width, height)
    fn size(&self) -> (u16, u16);
    fn put(&mut self, row: u16, col: u16, text: &str, style: CellStyle);
    fn clear_all(&mut self);
    /// Re-query the backing size after a resize event; no-op off-terminal.
    fn refresh_size(&mut self) {}
    /// # Errors
    /// Returns error when the backing writer fails.
    fn flush(&mut self) -> Result<()>;
}

/// Cursor-addressed stdout surface.
pub struct TermSurface {
    out: io::Stdout,
    width: u16,
    height: u16,
}

impl TermSurface {
    /// # Errors
    /// Returns error if the terminal size cannot be queried.
    pub fn new() -> Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self {
            out: io::stdout(),
            width,
            height,
        })
    }
}

impl Surface for TermSurface {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn refresh_size(&mut self) {
        if let Ok((w, h)) = terminal::size() {
            self.width = w;
            self.height = h;
        }
    }

    fn put(&mut self, row: u16, col: u16, text: &str, style: CellStyle) {
        if row >= self.height || col >= self.width {
            return;
        }
        let _ = queue!(self.out, MoveTo(col, row), SetForegroundColor(style.fg));
        if let Some(bg) = style.bg {
            let _ = queue!(self.out, SetBackgroundColor(bg));
        }
        if style.bold {
            let _ = queue!(self.out, SetAttribute(Attribute::Bold));
        }
        let max = (self.width - col) as usize;
        let clipped: String = text.chars().take(max).collect();
        let _ = queue!(self.out, Print(clipped), ResetColor);
        if style.bold {
            let _ = queue!(self.out, SetAttribute(Attribute::Reset));
        }
    }

    fn clear_all(&mut self) {
        let _ = queue!(self.out, Clear(ClearType::All));
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// In-memory cell grid used by the tests to compare incremental redraws
/// against full redraws of the same state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSurface {
    width: u16,
    height: u16,
    cells: Vec<(char, CellStyle)>,
}

impl BufferSurface {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let blank = (' ', CellStyle::fg(Color::Reset));
        Self {
            width,
            height,
            cells: vec![blank; width as usize * height as usize],
        }
    }

    #[must_use]
    pub fn row_text(&self, row: u16) -> String {
        let start = row as usize * self.width as usize;
        self.cells[start..start + self.width as usize]
            .iter()
            .map(|(c, _)| *c)
            .collect()
    }

    #[must_use]
    pub fn cell(&self, row: u16, col: u16) -> (char, CellStyle) {
        self.cells[row as usize * self.width as usize + col as usize]
    }
}

impl Surface for BufferSurface {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn put(&mut self, row: u16, col: u16, text: &str, style: CellStyle) {
        if row >= self.height {
            return;
        }
        for (i, c) in text.chars().enumerate() {
            let col = col as usize + i;
            if col >= self.width as usize {
                break;
            }
            self.cells[row as usize * self.width as usize + col] = (c, style);
        }
    }

    fn clear_all(&mut self) {
        let blank = (' ', CellStyle::fg(Color::Reset));
        self.cells.fill(blank);
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Previous-frame snapshot; purely a repaint optimization, not domain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    pub selected_category: usize,
    pub selected_action: usize,
    pub active_pane: Pane,
}

impl RenderState {
    #[must_use]
    pub fn of(nav: &NavState) -> Self {
        Self {
            selected_category: nav.selected_category,
            selected_action: nav.selected_action,
            active_pane: nav.active_pane,
        }
    }
}

/// Screen regions invalidated by a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dirty {
    CategoryRows { old: usize, new: usize },
    /// Whole actions pane including preview and status; a category change
    /// implies a brand new action list.
    ActionsPane,
    ActionRows { old: usize, new: usize },
    Preview,
    PaneHeaders,
    StatusLine,
}

/// Minimal repaint set between two frames. Selection styling deliberately does
/// not depend on the focused pane, so a focus change only invalidates the two
/// pane headers.
#[must_use]
pub fn diff(prev: RenderState, curr: RenderState) -> Vec<Dirty> {
    let mut out = Vec::new();
    if prev.selected_category != curr.selected_category {
        out.push(Dirty::CategoryRows {
            old: prev.selected_category,
            new: curr.selected_category,
        });
        out.push(Dirty::ActionsPane);
        out.push(Dirty::StatusLine);
    } else if prev.selected_action != curr.selected_action {
        out.push(Dirty::ActionRows {
            old: prev.selected_action,
            new: curr.selected_action,
        });
        out.push(Dirty::Preview);
    }
    if prev.active_pane != curr.active_pane {
        out.push(Dirty::PaneHeaders);
    }
    out
}

/// Everything the renderer is allowed to see. Handed in by the app; the
/// renderer never reaches into the catalog store itself.
pub struct View<'a> {
    pub theme: &'a Theme,
    pub categories: &'a [Category],
    /// The list the actions pane shows: the current category's actions, or the
    /// search results while searching.
    pub actions: &'a [Action],
    pub favorites: &'a [ActionRef],
    pub nav: &'a NavState,
    pub category_width: u16,
    pub status: &'a str,
}

/// Width of the category pane: computed once per catalog load.
#[must_use]
pub fn category_width(categories: &[Category], override_width: u16) -> u16 {
    if override_width > 0 {
        return override_width;
    }
    let longest = categories
        .iter()
        .map(|c| c.display_name.chars().count())
        .max()
        .unwrap_or(0);
    (longest as u16 + 4).max(MIN_CATEGORY_WIDTH)
}

pub fn draw_full(surface: &mut impl Surface, view: &View) {
    surface.clear_all();
    let theme = view.theme;

    surface.put(
        TITLE_ROW,
        1,
        concat!("OPSDECK v", env!("CARGO_PKG_VERSION")),
        CellStyle::fg(theme.text_primary).bold(),
    );
    surface.put(
        SUBTITLE_ROW,
        1,
        "categorized shell actions, press ? for help",
        CellStyle::fg(theme.text_muted),
    );
    draw_separator(surface, view, TOP_SEP_ROW);
    draw_pane_headers(surface, view);
    draw_vertical_separator(surface, view);
    for idx in 0..view.categories.len() {
        draw_category_row(surface, view, idx);
    }
    draw_actions_pane(surface, view);
    let (_, height) = surface.size();
    if height > BOTTOM_RESERVED {
        draw_separator(surface, view, height - 4);
    }
}

/// Repaints only the regions `diff` marks dirty. Must produce cell-identical
/// results to a full redraw of the same state.
pub fn draw_incremental(surface: &mut impl Surface, prev: RenderState, view: &View) {
    let curr = RenderState::of(view.nav);
    for dirty in diff(prev, curr) {
        match dirty {
            Dirty::CategoryRows { old, new } => {
                draw_category_row(surface, view, old);
                draw_category_row(surface, view, new);
            }
            Dirty::ActionsPane => draw_actions_pane(surface, view),
            Dirty::ActionRows { old, new } => {
                draw_action_row(surface, view, old);
                draw_action_row(surface, view, new);
            }
            Dirty::Preview => draw_preview(surface, view),
            Dirty::PaneHeaders => draw_pane_headers(surface, view),
            Dirty::StatusLine => draw_status(surface, view),
        }
    }
}

/// All action rows (blanking stale ones), preview and status.
pub fn draw_actions_pane(surface: &mut impl Surface, view: &View) {
    let (_, height) = surface.size();
    let visible = height.saturating_sub(LIST_START_ROW + BOTTOM_RESERVED) as usize;
    for slot in 0..visible {
        if slot < view.actions.len() {
            draw_action_row(surface, view, slot);
        } else {
            blank_action_row(surface, view, slot);
        }
    }
    draw_preview(surface, view);
    draw_status(surface, view);
}

fn list_row(index: usize, surface_height: u16) -> Option<u16> {
    let row = LIST_START_ROW + index as u16;
    // Long lists are clipped at the window; no scrolling within the pane.
    if row + BOTTOM_RESERVED >= surface_height {
        return None;
    }
    Some(row)
}

fn draw_category_row(surface: &mut impl Surface, view: &View, index: usize) {
    let (_, height) = surface.size();
    let Some(row) = list_row(index, height) else {
        return;
    };
    let Some(category) = view.categories.get(index) else {
        return;
    };
    let theme = view.theme;
    let selected = index == view.nav.selected_category;
    let style = if selected {
        CellStyle::fg(theme.selection_fg).on(theme.selection_bg)
    } else {
        CellStyle::fg(theme.text_primary)
    };
    let text = pad_clip(
        &format!(" {}", category.display_name),
        view.category_width as usize,
    );
    surface.put(row, 0, &text, style);
}

fn draw_action_row(surface: &mut impl Surface, view: &View, index: usize) {
    let (width, height) = surface.size();
    let Some(row) = list_row(index, height) else {
        return;
    };
    let Some(action) = view.actions.get(index) else {
        return;
    };
    let theme = view.theme;
    let col = view.category_width + 1;
    let avail = width.saturating_sub(col) as usize;
    if avail < 4 {
        return;
    }
    let selected = index == view.nav.selected_action;
    let base = if selected {
        CellStyle::fg(theme.selection_fg).on(theme.selection_bg)
    } else {
        CellStyle::fg(theme.text_primary)
    };

    // Two reserved glyph columns: destructive warning, then favorite.
    let danger = if action.destructive { "!" } else { " " };
    let favorite = if view.favorites.contains(&action.reference) {
        "*"
    } else {
        " "
    };
    let mut danger_style = base;
    danger_style.fg = theme.accent_danger;
    let mut favorite_style = base;
    favorite_style.fg = theme.favorite;

    surface.put(row, col, danger, danger_style);
    surface.put(row, col + 1, favorite, favorite_style);
    let text = pad_clip(
        &format!(" {}", action.description),
        avail.saturating_sub(2),
    );
    surface.put(row, col + 2, &text, base);
}

fn blank_action_row(surface: &mut impl Surface, view: &View, index: usize) {
    let (width, height) = surface.size();
    let Some(row) = list_row(index, height) else {
        return;
    };
    let col = view.category_width + 1;
    let blank = " ".repeat(width.saturating_sub(col) as usize);
    surface.put(row, col, &blank, CellStyle::fg(view.theme.text_primary));
}

fn draw_pane_headers(surface: &mut impl Surface, view: &View) {
    let theme = view.theme;
    let focused = CellStyle::fg(theme.header_focus_fg)
        .on(theme.header_focus_bg)
        .bold();
    let unfocused = CellStyle::fg(theme.header_fg);
    let (cat_style, act_style) = match view.nav.active_pane {
        Pane::Categories => (focused, unfocused),
        Pane::Actions => (unfocused, focused),
    };
    let cat_text = pad_clip(" Categories", view.category_width as usize);
    surface.put(HEADER_ROW, 0, &cat_text, cat_style);
    let header = if view.nav.search_mode {
        " Search results"
    } else {
        " Actions"
    };
    surface.put(HEADER_ROW, view.category_width + 1, header, act_style);
}

fn draw_preview(surface: &mut impl Surface, view: &View) {
    let (width, height) = surface.size();
    if height < BOTTOM_RESERVED {
        return;
    }
    let row = height - 3;
    let text = view
        .nav
        .highlighted(view.actions)
        .map(|a| a.long_description.as_str())
        .unwrap_or("");
    let line = pad_clip(&format!(" {text}"), width as usize);
    surface.put(row, 0, &line, CellStyle::fg(view.theme.text_muted));
}

fn draw_status(surface: &mut impl Surface, view: &View) {
    let (width, height) = surface.size();
    if height < 2 {
        return;
    }
    let row = height - 2;
    let theme = view.theme;
    let line = pad_clip(&format!(" {}", view.status), width as usize);
    surface.put(
        row,
        0,
        &line,
        CellStyle::fg(theme.status_fg).on(theme.status_bg),
    );
}

fn draw_separator(surface: &mut impl Surface, view: &View, row: u16) {
    let (width, _) = surface.size();
    let line = "─".repeat(width as usize);
    surface.put(row, 0, &line, CellStyle::fg(view.theme.border));
}

fn draw_vertical_separator(surface: &mut impl Surface, view: &View) {
    let (_, height) = surface.size();
    let style = CellStyle::fg(view.theme.border);
    let bottom = height.saturating_sub(BOTTOM_RESERVED);
    for row in HEADER_ROW..bottom {
        surface.put(row, view.category_width, "│", style);
    }
}

/// Modal help overlay; render-only, any key dismisses it and the caller does a
/// full redraw afterwards.
pub fn draw_help(surface: &mut impl Surface, theme: &Theme) {
    const LINES: [&str; 11] = [
        "  Up/Down   move selection",
        "  Left      focus categories",
        "  Right     focus actions",
        "  Enter     run highlighted action",
        "  *         toggle favorite",
        "  /         search descriptions",
        "  t         cycle theme",
        "  ?         this help",
        "  q         quit",
        "",
        "  any key to close",
    ];
    let (width, height) = surface.size();
    let box_w: u16 = 40;
    let box_h: u16 = LINES.len() as u16 + 2;
    if width < box_w + 2 || height < box_h + 2 {
        return;
    }
    let left = (width - box_w) / 2;
    let top = (height - box_h) / 2;
    let border = CellStyle::fg(theme.border);
    let text = CellStyle::fg(theme.text_primary);

    surface.put(top, left, &frame_line("┌", "─", "┐", box_w), border);
    for (i, line) in LINES.iter().enumerate() {
        let row = top + 1 + i as u16;
        surface.put(row, left, "│", border);
        surface.put(row, left + 1, &pad_clip(line, box_w as usize - 2), text);
        surface.put(row, left + box_w - 1, "│", border);
    }
    surface.put(
        top + box_h - 1,
        left,
        &frame_line("└", "─", "┘", box_w),
        border,
    );
}

pub(crate) fn frame_line(left: &str, fill: &str, right: &str, width: u16) -> String {
    let mut s = String::with_capacity(width as usize);
    s.push_str(left);
    for _ in 0..width.saturating_sub(2) {
        s.push_str(fill);
    }
    s.push_str(right);
    s
}

/// Truncates to `width` chars and pads with spaces so stale characters from a
/// previous, longer string are erased.
#[must_use]
pub fn pad_clip(text: &str, width: usize) -> String {
    let mut s: String = text.chars().take(width).collect();
    while s.chars().count() < width {
        s.push(' ');
    }
    s
}
