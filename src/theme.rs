use crossterm::style::Color;

/// Built-in theme identifiers, cycled with the `t` key and persisted in the
/// user config as `current_theme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Dark,
    Light,
    HighContrast,
}

impl ThemeName {
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            ThemeName::Dark => ThemeName::Light,
            ThemeName::Light => ThemeName::HighContrast,
            ThemeName::HighContrast => ThemeName::Dark,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
            ThemeName::HighContrast => "high-contrast",
        }
    }

    /// Unknown names fall back to the dark theme.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => ThemeName::Light,
            "high-contrast" | "high_contrast" => ThemeName::HighContrast,
            _ => ThemeName::Dark,
        }
    }
}

/// Resolved color tokens for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub name: ThemeName,

    pub text_primary: Color,
    pub text_muted: Color,
    pub border: Color,

    pub header_fg: Color,
    pub header_focus_fg: Color,
    pub header_focus_bg: Color,

    pub selection_fg: Color,
    pub selection_bg: Color,

    pub status_fg: Color,
    pub status_bg: Color,

    pub accent_success: Color,
    pub accent_warning: Color,
    pub accent_danger: Color,
    pub favorite: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::builtin(ThemeName::Dark)
    }
}

impl Theme {
    #[must_use]
    pub fn builtin(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::builtin_dark(),
            ThemeName::Light => Self::builtin_light(),
            ThemeName::HighContrast => Self::builtin_high_contrast(),
        }
    }

    #[must_use]
    pub fn builtin_dark() -> Self {
        Self {
            name: ThemeName::Dark,
            text_primary: Color::White,
            text_muted: Color::Grey,
            border: Color::DarkGrey,

            header_fg: Color::Grey,
            header_focus_fg: Color::White,
            header_focus_bg: Color::Rgb { r: 24, g: 24, b: 24 },

            selection_fg: Color::Black,
            selection_bg: Color::Cyan,

            status_fg: Color::White,
            status_bg: Color::Rgb { r: 24, g: 24, b: 24 },

            accent_success: Color::Green,
            accent_warning: Color::Yellow,
            accent_danger: Color::Red,
            favorite: Color::Yellow,
        }
    }

    #[must_use]
    pub fn builtin_light() -> Self {
        Self {
            name: ThemeName::Light,
            text_primary: Color::Black,
            text_muted: Color::DarkGrey,
            border: Color::Grey,

            header_fg: Color::DarkGrey,
            header_focus_fg: Color::Black,
            header_focus_bg: Color::Rgb {
                r: 230,
                g: 230,
                b: 230,
            },

            selection_fg: Color::White,
            selection_bg: Color::DarkBlue,

            status_fg: Color::Black,
            status_bg: Color::Rgb {
                r: 230,
                g: 230,
                b: 230,
            },

            accent_success: Color::DarkGreen,
            accent_warning: Color::DarkYellow,
            accent_danger: Color::DarkRed,
            favorite: Color::DarkYellow,
        }
    }

    #[must_use]
    pub fn builtin_high_contrast() -> Self {
        Self {
            name: ThemeName::HighContrast,
            text_primary: Color::White,
            text_muted: Color::White,
            border: Color::White,

            header_fg: Color::White,
            header_focus_fg: Color::Black,
            header_focus_bg: Color::White,

            selection_fg: Color::Black,
            selection_bg: Color::White,

            status_fg: Color::Black,
            status_bg: Color::White,

            accent_success: Color::Green,
            accent_warning: Color::Yellow,
            accent_danger: Color::Red,
            favorite: Color::Yellow,
        }
    }
}
