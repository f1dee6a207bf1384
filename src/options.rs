//! Controller configuration

use vello::kurbo::Rect;

/// Options for a [`crate::WebViewController`].
#[derive(Debug, Clone)]
pub struct WebViewOptions {
    /// Open an independent popup panel at construction instead of waiting
    /// for a platform window to attach.
    pub popup: bool,
    pub popup_title: String,
    pub popup_bounds: Rect,
    /// Let a freshly attached panel take key focus without a focus event.
    pub activate_on_attach: bool,
    /// How far (in logical pixels) the pointer may travel between press and
    /// release for the pair to still count as a click.
    pub click_slop: f64,
}

impl Default for WebViewOptions {
    fn default() -> Self {
        Self {
            popup: false,
            popup_title: String::new(),
            popup_bounds: Rect::new(0.0, 0.0, 800.0, 600.0),
            activate_on_attach: false,
            click_slop: 0.0,
        }
    }
}

impl WebViewOptions {
    /// Options for a WebView shown in its own popup panel.
    pub fn popup(title: impl Into<String>, bounds: Rect) -> Self {
        Self {
            popup: true,
            popup_title: title.into(),
            popup_bounds: bounds,
            ..Default::default()
        }
    }

    pub fn with_activate_on_attach(mut self, activate: bool) -> Self {
        self.activate_on_attach = activate;
        self
    }

    pub fn with_click_slop(mut self, slop: f64) -> Self {
        self.click_slop = slop.max(0.0);
        self
    }
}
