//! Centralized theming for the genwatch TUI
//!
//! Single source of truth for all colors and styles used by the panes.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;
use std::sync::RwLock;

use crate::config::ThemeVariant;

/// Global theme variant storage
static THEME_VARIANT: RwLock<ThemeVariant> = RwLock::new(ThemeVariant::Modern);

/// Initialize the theme variant (call once at startup)
pub fn init_theme(variant: ThemeVariant) {
    if let Ok(mut guard) = THEME_VARIANT.write() {
        *guard = variant;
    }
}

pub fn current_theme() -> ThemeVariant {
    THEME_VARIANT.read().map(|g| *g).unwrap_or_default()
}

/// Catppuccin Mocha palette for the Modern theme
#[allow(dead_code)]
mod catppuccin {
    use super::Color;

    pub const BASE: Color = Color::Rgb(30, 30, 46); // #1e1e2e
    pub const MANTLE: Color = Color::Rgb(24, 24, 37); // #181825
    pub const SURFACE0: Color = Color::Rgb(49, 50, 68); // #313244
    pub const SURFACE1: Color = Color::Rgb(69, 71, 90); // #45475a
    pub const TEXT: Color = Color::Rgb(205, 214, 244); // #cdd6f4
    pub const SUBTEXT1: Color = Color::Rgb(186, 194, 222); // #bac2de
    pub const OVERLAY0: Color = Color::Rgb(108, 112, 134); // #6c7086
    pub const LAVENDER: Color = Color::Rgb(180, 190, 254); // #b4befe
    pub const BLUE: Color = Color::Rgb(137, 180, 250); // #89b4fa
    pub const GREEN: Color = Color::Rgb(166, 227, 161); // #a6e3a1
    pub const YELLOW: Color = Color::Rgb(249, 226, 175); // #f9e2af
    pub const PEACH: Color = Color::Rgb(250, 179, 135); // #fab387
    pub const RED: Color = Color::Rgb(243, 139, 168); // #f38ba8
    pub const MAUVE: Color = Color::Rgb(203, 166, 247); // #cba6f7
}

/// Tokyo Night palette
/// Official colors from https://github.com/folke/tokyonight.nvim
#[allow(dead_code)]
mod tokyo_night {
    use super::Color;

    pub const BG: Color = Color::Rgb(26, 27, 38); // #1a1b26
    pub const BG_DARK: Color = Color::Rgb(22, 22, 30); // #16161e
    pub const BG_HIGHLIGHT: Color = Color::Rgb(41, 46, 66); // #292e42
    pub const FG: Color = Color::Rgb(192, 202, 245); // #c0caf5
    pub const FG_DARK: Color = Color::Rgb(169, 177, 214); // #a9b1d6
    pub const COMMENT: Color = Color::Rgb(86, 95, 137); // #565f89
    pub const BLUE: Color = Color::Rgb(122, 162, 247); // #7aa2f7
    pub const CYAN: Color = Color::Rgb(125, 207, 255); // #7dcfff
    pub const GREEN: Color = Color::Rgb(158, 206, 106); // #9ece6a
    pub const YELLOW: Color = Color::Rgb(224, 175, 104); // #e0af68
    pub const ORANGE: Color = Color::Rgb(255, 158, 100); // #ff9e64
    pub const RED: Color = Color::Rgb(247, 118, 142); // #f7768e
    pub const MAGENTA: Color = Color::Rgb(187, 154, 247); // #bb9af7
    pub const BORDER: Color = Color::Rgb(59, 66, 97); // #3b4261
}

pub mod borders {
    use super::*;

    /// Border type for panes (rounded for RGB themes)
    pub fn pane() -> BorderType {
        match current_theme() {
            ThemeVariant::Modern | ThemeVariant::TokyoNight => BorderType::Rounded,
            ThemeVariant::Dark | ThemeVariant::HighContrast => BorderType::Plain,
        }
    }
}

/// Colors that vary by theme
pub mod colors {
    use super::*;

    pub fn bg_selection() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::SURFACE1,
            ThemeVariant::TokyoNight => tokyo_night::BG_HIGHLIGHT,
            ThemeVariant::Dark | ThemeVariant::HighContrast => Color::LightBlue,
        }
    }

    pub fn bg_status() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::MANTLE,
            ThemeVariant::TokyoNight => tokyo_night::BG_DARK,
            ThemeVariant::Dark => Color::DarkGray,
            ThemeVariant::HighContrast => Color::Black,
        }
    }

    pub fn bg_error() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::RED,
            ThemeVariant::TokyoNight => tokyo_night::RED,
            _ => Color::Red,
        }
    }

    pub fn fg_primary() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::TEXT,
            ThemeVariant::TokyoNight => tokyo_night::FG,
            _ => Color::White,
        }
    }

    pub fn fg_secondary() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::SUBTEXT1,
            ThemeVariant::TokyoNight => tokyo_night::FG_DARK,
            ThemeVariant::Dark => Color::Gray,
            ThemeVariant::HighContrast => Color::White,
        }
    }

    pub fn fg_muted() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::OVERLAY0,
            ThemeVariant::TokyoNight => tokyo_night::COMMENT,
            ThemeVariant::Dark | ThemeVariant::HighContrast => Color::Gray,
        }
    }

    pub fn fg_accent() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::BLUE,
            ThemeVariant::TokyoNight => tokyo_night::BLUE,
            ThemeVariant::Dark => Color::Cyan,
            ThemeVariant::HighContrast => Color::LightCyan,
        }
    }

    pub fn fg_warning() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::YELLOW,
            ThemeVariant::TokyoNight => tokyo_night::YELLOW,
            ThemeVariant::Dark => Color::Yellow,
            ThemeVariant::HighContrast => Color::LightYellow,
        }
    }

    /// Marks the entry the primary pane is showing
    pub fn active_marker() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::MAUVE,
            ThemeVariant::TokyoNight => tokyo_night::MAGENTA,
            ThemeVariant::Dark => Color::Magenta,
            ThemeVariant::HighContrast => Color::LightMagenta,
        }
    }

    pub fn batch_badge() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::PEACH,
            ThemeVariant::TokyoNight => tokyo_night::ORANGE,
            ThemeVariant::Dark => Color::Yellow,
            ThemeVariant::HighContrast => Color::LightYellow,
        }
    }

    pub fn border() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::SURFACE0,
            ThemeVariant::TokyoNight => tokyo_night::BORDER,
            ThemeVariant::Dark => Color::DarkGray,
            ThemeVariant::HighContrast => Color::Gray,
        }
    }

    pub fn border_focused() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::LAVENDER,
            ThemeVariant::TokyoNight => tokyo_night::CYAN,
            ThemeVariant::Dark => Color::Cyan,
            ThemeVariant::HighContrast => Color::LightCyan,
        }
    }

    pub fn status_ok() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::GREEN,
            ThemeVariant::TokyoNight => tokyo_night::GREEN,
            ThemeVariant::Dark => Color::Green,
            ThemeVariant::HighContrast => Color::LightGreen,
        }
    }

    pub fn status_failed() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::RED,
            ThemeVariant::TokyoNight => tokyo_night::RED,
            ThemeVariant::Dark => Color::Red,
            ThemeVariant::HighContrast => Color::LightRed,
        }
    }

    pub fn bg_main() -> Color {
        match current_theme() {
            ThemeVariant::Modern => catppuccin::BASE,
            ThemeVariant::TokyoNight => tokyo_night::BG,
            // Basic themes use terminal default
            _ => Color::Reset,
        }
    }
}

/// UI symbols
pub mod symbols {
    pub const ACTIVE: &str = "▌";
    pub const INACTIVE: &str = " ";
    pub const VIDEO: &str = "▶";
    pub const IMAGE: &str = "◼";
    pub const POSTER_READY: &str = "●";
    pub const POSTER_LOADING: &str = "◌";
    pub const POSTER_MISSING: &str = "○";
    pub const SCROLL_THUMB: &str = "┃";
    pub const SCROLL_TRACK: &str = "│";
    pub const IDLE: &str = "○";
    pub const RUNNING: &str = "●";
}

/// Pre-composed styles for common UI elements
pub struct Theme;

impl Theme {
    pub fn text() -> Style {
        Style::default()
            .fg(colors::fg_primary())
            .bg(colors::bg_main())
    }

    pub fn text_secondary() -> Style {
        Style::default()
            .fg(colors::fg_secondary())
            .bg(colors::bg_main())
    }

    pub fn text_muted() -> Style {
        Style::default()
            .fg(colors::fg_muted())
            .bg(colors::bg_main())
    }

    pub fn text_accent() -> Style {
        Style::default()
            .fg(colors::fg_accent())
            .bg(colors::bg_main())
    }

    pub fn status_bar() -> Style {
        Style::default()
            .bg(colors::bg_status())
            .fg(colors::fg_primary())
    }

    pub fn error_bar() -> Style {
        Style::default()
            .bg(colors::bg_error())
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    }

    pub fn help_key() -> Style {
        Style::default()
            .fg(colors::fg_accent())
            .add_modifier(Modifier::BOLD)
    }

    pub fn help_desc() -> Style {
        Style::default().fg(colors::fg_muted())
    }

    pub fn border() -> Style {
        Style::default().fg(colors::border())
    }

    pub fn border_focused() -> Style {
        Style::default().fg(colors::border_focused())
    }

    pub fn main_bg() -> Style {
        Style::default().bg(colors::bg_main())
    }

    pub fn active_marker() -> Style {
        Style::default()
            .fg(colors::active_marker())
            .add_modifier(Modifier::BOLD)
    }

    pub fn batch_badge() -> Style {
        Style::default()
            .fg(colors::batch_badge())
            .add_modifier(Modifier::BOLD)
    }

    /// Primary-pane row briefly highlighted after a jump
    pub fn highlight() -> Style {
        Style::default()
            .bg(colors::bg_selection())
            .fg(colors::fg_warning())
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_running() -> Style {
        Style::default()
            .fg(colors::fg_warning())
            .bg(colors::bg_status())
    }

    pub fn status_ok() -> Style {
        Style::default()
            .fg(colors::status_ok())
            .bg(colors::bg_main())
    }

    pub fn status_failed() -> Style {
        Style::default()
            .fg(colors::status_failed())
            .bg(colors::bg_main())
    }

    pub fn status_muted() -> Style {
        Style::default()
            .fg(colors::fg_muted())
            .bg(colors::bg_status())
    }
}

/// Apply the selection background to a style when `selected`
pub fn with_selection_bg(style: Style, selected: bool) -> Style {
    if selected {
        style.bg(colors::bg_selection())
    } else {
        style
    }
}
