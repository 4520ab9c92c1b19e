//! Fire-and-forget seam to whatever renders menus and HUD text. Every call
//! tolerates a missing element; the core never fails because the UI is gone.

use tracing::debug;

pub trait UiSurface: Send + Sync {
    fn toggle_visibility(&self, element: &str);
    fn set_text(&self, element: &str, text: &str);
    fn notify(&self, title: &str, body: &str);
}

/// UI sink that drops everything. Used by satellite windows and tests.
pub struct NullUi;

impl UiSurface for NullUi {
    fn toggle_visibility(&self, _element: &str) {}
    fn set_text(&self, _element: &str, _text: &str) {}
    fn notify(&self, _title: &str, _body: &str) {}
}

/// UI sink that logs instead of rendering; the demo binary's "screen".
pub struct TraceUi;

impl UiSurface for TraceUi {
    fn toggle_visibility(&self, element: &str) {
        debug!(element, "ui toggle");
    }

    fn set_text(&self, element: &str, text: &str) {
        debug!(element, text, "ui text");
    }

    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "notification");
    }
}
