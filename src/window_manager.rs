//! Window Manager: owns the single main [`Window`] and an ordered list of
//! floating windows; z-order composition. `spec.md` §3 (WindowManager) and
//! §4.E.

use crate::window::Window;

/// Holds the main window plus floating windows in paint order. Composition
/// order is main first, then floating in list order — later items paint
/// over earlier ones (testable property 4, z-order). Floating windows are
/// never reordered by this core.
pub struct WindowManager {
    main: Window,
    floating: Vec<Window>,
}

impl std::fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager").field("floating_count", &self.floating.len()).finish_non_exhaustive()
    }
}

impl WindowManager {
    pub fn new(main: Window) -> Self {
        Self { main, floating: Vec::new() }
    }

    pub fn main(&self) -> &Window {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Window {
        &mut self.main
    }

    /// Append a floating window and return its index for later lookup.
    pub fn create_floating_window(&mut self, window: Window) -> usize {
        self.floating.push(window);
        self.floating.len() - 1
    }

    pub fn floating(&self, index: usize) -> Option<&Window> {
        self.floating.get(index)
    }

    pub fn floating_mut(&mut self, index: usize) -> Option<&mut Window> {
        self.floating.get_mut(index)
    }

    pub fn floating_windows(&self) -> &[Window] {
        &self.floating
    }

    pub fn floating_windows_mut(&mut self) -> &mut [Window] {
        &mut self.floating
    }

    /// Render main then floating windows in list order; later floating
    /// windows paint over the output of earlier ones since each writes
    /// absolute cursor-positioned escape sequences directly into `out`.
    pub fn render_all(&self, out: &mut Vec<u8>) {
        self.main.render(out);
        for win in &self.floating {
            win.render(out);
        }
    }

    /// Render only the main window, omitting floating windows — used when
    /// leaving the overlay (`spec.md` §4.G `renderMainWindowOnly`).
    pub fn render_main_only(&self, out: &mut Vec<u8>) {
        self.main.render(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::PtyHandle;

    fn spawnable_pty() -> Option<PtyHandle> {
        PtyHandle::spawn(5, 20).ok()
    }

    #[test]
    fn z_order_later_floating_window_paints_last() {
        // Testable property 4: for overlapping rectangles, the last-rendered
        // floating window's cells are the ones that appear last in the
        // output byte stream at the overlap.
        let Some(first_pty) = spawnable_pty() else { return };
        let Some(second_pty) = spawnable_pty() else { return };
        let mut mgr = WindowManager::new(Window::main(80, 24));

        let mut first = Window::floating(0, 0, 10, 5, "first", first_pty);
        first.set_visible(true);
        first.screen_mut().feed(b"AAA");
        mgr.create_floating_window(first);

        let mut second = Window::floating(0, 0, 10, 5, "second", second_pty);
        second.set_visible(true);
        second.screen_mut().feed(b"BBB");
        mgr.create_floating_window(second);

        let mut out = Vec::new();
        mgr.render_all(&mut out);
        let text = String::from_utf8_lossy(&out);
        // Both windows draw the same absolute cells; the later one's bytes
        // must come after the earlier one's in the stream, so it is what a
        // terminal actually displays at the overlap.
        let first_pos = text.find("AAA").expect("first window content present");
        let second_pos = text.find("BBB").expect("second window content present");
        assert!(second_pos > first_pos, "later floating window must paint after the earlier one");
    }

    #[test]
    fn create_floating_window_appends_and_returns_index() {
        let Some(pty) = spawnable_pty() else { return };
        let mut mgr = WindowManager::new(Window::main(80, 24));
        let idx = mgr.create_floating_window(Window::floating(2, 2, 20, 5, "a", pty));
        assert_eq!(idx, 0);
        assert!(mgr.floating(0).is_some());
    }

    #[test]
    fn render_main_only_omits_floating() {
        let Some(pty) = spawnable_pty() else { return };
        let mut mgr = WindowManager::new(Window::main(80, 24));
        let mut floating = Window::floating(2, 2, 20, 5, "a", pty);
        floating.set_visible(true);
        mgr.create_floating_window(floating);

        let mut all = Vec::new();
        mgr.render_all(&mut all);
        let mut main_only = Vec::new();
        mgr.render_main_only(&mut main_only);

        assert_ne!(all, main_only);
    }
}
