/// Viewport width, in logical pixels, at or below which selecting a
/// conversation also closes the sidebar.
pub const NARROW_VIEWPORT_WIDTH: u16 = 768;

pub fn is_narrow(viewport_width: u16, threshold: u16) -> bool {
    viewport_width <= threshold
}

/// Visibility of the navigation panel and its overlay. Presentational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sidebar {
    open: bool,
    overlay: bool,
}

impl Sidebar {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn overlay_active(&self) -> bool {
        self.overlay
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.overlay = !self.overlay;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.overlay = false;
    }

    pub fn close_if_narrow(&mut self, viewport_width: u16, threshold: u16) {
        if is_narrow(viewport_width, threshold) {
            self.close();
        }
    }
}
