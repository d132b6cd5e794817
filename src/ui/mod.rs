mod app;
mod history;
mod navigator;
mod status_bar;
pub mod theme;
mod widgets;

pub use app::render;

/// Rows of one pane's content area for a terminal of the given height:
/// everything except the status bar, the hint bar and the pane borders.
pub fn pane_rows(height: u16) -> usize {
    height.saturating_sub(4) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pane_rows() {
        assert_eq!(pane_rows(40), 36);
        assert_eq!(pane_rows(4), 0);
        assert_eq!(pane_rows(2), 0);
    }
}
