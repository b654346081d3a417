use std::path::PathBuf;

use pretty_assertions::assert_eq;

use opsdeck::catalog::{Action, ActionRef, Category};
use opsdeck::nav::{NavState, Pane};
use opsdeck::render::{
    self, category_width, diff, pad_clip, BufferSurface, Dirty, RenderState, View,
};
use opsdeck::theme::Theme;

fn category(name: &str, key: &str) -> Category {
    Category {
        display_name: name.to_string(),
        storage_key: key.to_string(),
        synthetic: None,
    }
}

fn action(key: &str, stem: &str, description: &str, destructive: bool) -> Action {
    Action {
        description: description.to_string(),
        source_file: PathBuf::from(format!("/tmp/{key}/{stem}.sh")),
        destructive,
        dependencies: Vec::new(),
        long_description: format!("long description of {description}"),
        reference: ActionRef {
            category_key: key.to_string(),
            unit_stem: stem.to_string(),
        },
    }
}

fn fixtures() -> (Theme, Vec<Category>, Vec<Action>) {
    let theme = Theme::builtin_dark();
    let categories = vec![
        category("System", "system"),
        category("Applications", "apps"),
    ];
    let actions = vec![
        action("system", "show_info", "Show System Information", false),
        action("system", "wipe_tmp", "Wipe temp files", true),
        action("system", "uptime", "Show uptime", false),
    ];
    (theme, categories, actions)
}

fn dump(surface: &BufferSurface, height: u16) -> String {
    (0..height)
        .map(|r| surface.row_text(r))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn category_width_is_longest_name_plus_padding_with_a_floor() {
    let cats = vec![category("Applications", "apps"), category("Net", "net")];
    assert_eq!(category_width(&cats, 0), 12 + 4);

    let small = vec![category("Net", "net")];
    assert_eq!(category_width(&small, 0), 16);

    // Explicit override wins.
    assert_eq!(category_width(&cats, 30), 30);
}

#[test]
fn diff_reports_minimal_dirty_regions() {
    let base = RenderState {
        selected_category: 0,
        selected_action: 1,
        active_pane: Pane::Actions,
    };

    assert!(diff(base, base).is_empty());

    let action_moved = RenderState {
        selected_action: 2,
        ..base
    };
    assert_eq!(
        diff(base, action_moved),
        vec![Dirty::ActionRows { old: 1, new: 2 }, Dirty::Preview]
    );

    let category_moved = RenderState {
        selected_category: 1,
        selected_action: 0,
        ..base
    };
    assert_eq!(
        diff(base, category_moved),
        vec![
            Dirty::CategoryRows { old: 0, new: 1 },
            Dirty::ActionsPane,
            Dirty::StatusLine,
        ]
    );

    let pane_switched = RenderState {
        active_pane: Pane::Categories,
        ..base
    };
    assert_eq!(diff(base, pane_switched), vec![Dirty::PaneHeaders]);
}

#[test]
fn incremental_action_move_matches_full_redraw() {
    let (theme, categories, actions) = fixtures();
    let width = category_width(&categories, 0);
    let favorites = vec![actions[2].reference.clone()];
    let status = "System: 3 actions";

    let mut nav = NavState::new();
    nav.active_pane = Pane::Actions;
    nav.selected_action = 0;

    let mut incremental = BufferSurface::new(80, 24);
    {
        let view = View {
            theme: &theme,
            categories: &categories,
            actions: &actions,
            favorites: &favorites,
            nav: &nav,
            category_width: width,
            status,
        };
        render::draw_full(&mut incremental, &view);
    }
    let prev = RenderState::of(&nav);

    nav.action_down(actions.len());
    let view = View {
        theme: &theme,
        categories: &categories,
        actions: &actions,
        favorites: &favorites,
        nav: &nav,
        category_width: width,
        status,
    };
    render::draw_incremental(&mut incremental, prev, &view);

    let mut full = BufferSurface::new(80, 24);
    render::draw_full(&mut full, &view);

    assert_eq!(incremental, full);
}

#[test]
fn incremental_category_move_matches_full_redraw() {
    let (theme, categories, actions) = fixtures();
    let width = category_width(&categories, 0);
    let favorites = Vec::new();
    let other_actions = vec![action("apps", "list", "List installed apps", false)];

    let mut nav = NavState::new();
    let mut incremental = BufferSurface::new(80, 24);
    {
        let view = View {
            theme: &theme,
            categories: &categories,
            actions: &actions,
            favorites: &favorites,
            nav: &nav,
            category_width: width,
            status: "System: 3 actions",
        };
        render::draw_full(&mut incremental, &view);
    }
    let prev = RenderState::of(&nav);

    // Moving the category selection swaps in a fresh action list.
    nav.category_down(categories.len());
    let view = View {
        theme: &theme,
        categories: &categories,
        actions: &other_actions,
        favorites: &favorites,
        nav: &nav,
        category_width: width,
        status: "Applications: 1 actions",
    };
    render::draw_incremental(&mut incremental, prev, &view);

    let mut full = BufferSurface::new(80, 24);
    render::draw_full(&mut full, &view);

    assert_eq!(incremental, full);
}

#[test]
fn incremental_pane_switch_matches_full_redraw() {
    let (theme, categories, actions) = fixtures();
    let width = category_width(&categories, 0);
    let favorites = Vec::new();
    let status = "System: 3 actions";

    let mut nav = NavState::new();
    let mut incremental = BufferSurface::new(80, 24);
    {
        let view = View {
            theme: &theme,
            categories: &categories,
            actions: &actions,
            favorites: &favorites,
            nav: &nav,
            category_width: width,
            status,
        };
        render::draw_full(&mut incremental, &view);
    }
    let prev = RenderState::of(&nav);

    nav.focus_right(actions.len());
    let view = View {
        theme: &theme,
        categories: &categories,
        actions: &actions,
        favorites: &favorites,
        nav: &nav,
        category_width: width,
        status,
    };
    render::draw_incremental(&mut incremental, prev, &view);

    let mut full = BufferSurface::new(80, 24);
    render::draw_full(&mut full, &view);

    assert_eq!(incremental, full);
}

#[test]
fn action_rows_carry_destructive_and_favorite_markers() {
    let (theme, categories, actions) = fixtures();
    let width = category_width(&categories, 0);
    let favorites = vec![actions[2].reference.clone()];
    let nav = NavState::new();
    let view = View {
        theme: &theme,
        categories: &categories,
        actions: &actions,
        favorites: &favorites,
        nav: &nav,
        category_width: width,
        status: "",
    };
    let mut surface = BufferSurface::new(80, 24);
    render::draw_full(&mut surface, &view);

    let marker_col = width + 1;
    // Row 6 holds the second action (destructive).
    assert_eq!(surface.cell(6, marker_col).0, '!');
    // Row 7 holds the third action (favorited).
    assert_eq!(surface.cell(7, marker_col + 1).0, '*');
    // First action: neither marker.
    assert_eq!(surface.cell(5, marker_col).0, ' ');
    assert_eq!(surface.cell(5, marker_col + 1).0, ' ');

    let screen = dump(&surface, 24);
    assert!(screen.contains("Show System Information"));
    assert!(screen.contains("long description of Show System Information"));
}

#[test]
fn long_lists_are_clipped_at_the_window() {
    let (theme, categories, _) = fixtures();
    let width = category_width(&categories, 0);
    let many: Vec<Action> = (0..40)
        .map(|i| action("system", &format!("u{i}"), &format!("unit number {i}"), false))
        .collect();
    let nav = NavState::new();
    let view = View {
        theme: &theme,
        categories: &categories,
        actions: &many,
        favorites: &[],
        nav: &nav,
        category_width: width,
        status: "",
    };
    let mut surface = BufferSurface::new(80, 12);
    render::draw_full(&mut surface, &view);

    let screen = dump(&surface, 12);
    assert!(screen.contains("unit number 0"));
    // Rows past the visible window are simply not drawn.
    assert!(!screen.contains("unit number 30"));
}

#[test]
fn pad_clip_truncates_and_erases() {
    assert_eq!(pad_clip("abcdef", 4), "abcd");
    assert_eq!(pad_clip("ab", 4), "ab  ");
    assert_eq!(pad_clip("", 3), "   ");
}
