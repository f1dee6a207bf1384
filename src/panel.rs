//! Hosting panel
//!
//! The native window a WebView's engine draws into. It is owned exclusively by
//! the controller and only ever seen by the engine (to bind to it) and by the
//! draw path (to place rendered output). Nothing here leaks into dispatch.

use raw_window_handle::RawWindowHandle;
use tracing::{debug, info};
use vello::kurbo::{Affine, Rect, Size};
use vello::Scene;

use crate::engine::RenderingEngine;
use crate::error::EngineError;
use crate::window::WindowId;

/// Unique identifier for a hosting panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelId(u64);

impl PanelId {
    fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Placement {
    Embedded {
        parent: WindowId,
        parent_handle: Option<RawWindowHandle>,
    },
    Popup {
        title: String,
    },
}

#[derive(Debug)]
pub struct HostPanel {
    id: PanelId,
    placement: Placement,
    bounds: Rect,
    visible: bool,
    /// Whether the panel may become the key (input) window.
    active: bool,
}

impl HostPanel {
    pub(crate) fn embedded(
        parent: WindowId,
        parent_handle: Option<RawWindowHandle>,
        bounds: Rect,
        active: bool,
    ) -> Self {
        let panel = Self {
            id: PanelId::next(),
            placement: Placement::Embedded {
                parent,
                parent_handle,
            },
            bounds,
            visible: true,
            active,
        };
        info!(panel = ?panel.id, ?parent, ?bounds, "Hosting panel created");
        panel
    }

    pub(crate) fn popup(title: String, bounds: Rect, active: bool) -> Self {
        let panel = Self {
            id: PanelId::next(),
            placement: Placement::Popup { title },
            bounds,
            visible: true,
            active,
        };
        info!(panel = ?panel.id, ?bounds, "Popup panel created");
        panel
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    /// The platform window this panel is embedded in, if any.
    pub fn parent(&self) -> Option<WindowId> {
        match &self.placement {
            Placement::Embedded { parent, .. } => Some(*parent),
            Placement::Popup { .. } => None,
        }
    }

    pub fn parent_handle(&self) -> Option<RawWindowHandle> {
        match &self.placement {
            Placement::Embedded { parent_handle, .. } => *parent_handle,
            Placement::Popup { .. } => None,
        }
    }

    pub fn is_popup(&self) -> bool {
        matches!(self.placement, Placement::Popup { .. })
    }

    pub fn title(&self) -> Option<&str> {
        match &self.placement {
            Placement::Popup { title } => Some(title),
            Placement::Embedded { .. } => None,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn can_become_key(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_title(&mut self, new_title: String) {
        if let Placement::Popup { title } = &mut self.placement {
            *title = new_title;
        }
    }

    /// Returns `false` when `bounds` is already applied.
    pub(crate) fn set_bounds(&mut self, bounds: Rect) -> bool {
        if self.bounds == bounds {
            return false;
        }
        debug!(panel = ?self.id, ?bounds, "Panel bounds updated");
        self.bounds = bounds;
        true
    }

    /// Render the engine's document into `surface` at `rect`.
    ///
    /// The engine lays out at the panel's current size; its output goes through
    /// a scratch scene that lives only for this call. Returns the transform the
    /// output was placed with, or `None` when there was nothing to draw.
    pub(crate) fn render_into<E: RenderingEngine + ?Sized>(
        &self,
        engine: &mut E,
        surface: &mut Scene,
        rect: Rect,
        flipped: bool,
    ) -> Result<Option<Affine>, EngineError> {
        let viewport = self.bounds.size();
        if viewport.area() <= 0.0 || rect.area() <= 0.0 {
            return Ok(None);
        }

        let mut layer = Scene::new();
        engine.render(&mut layer, viewport)?;
        let transform = placement_transform(rect, viewport, flipped);
        surface.append(&layer, Some(transform));
        Ok(Some(transform))
    }

    pub(crate) fn release(mut self) {
        self.visible = false;
        self.active = false;
        info!(panel = ?self.id, "Hosting panel released");
    }
}

/// Transform mapping a top-left-origin `viewport` onto `dest`.
///
/// With `flipped` the y axis is mirrored so the top of the viewport lands on
/// `dest.y1`, for surfaces whose origin is the bottom-left corner. An empty
/// viewport axis is not scaled.
pub fn placement_transform(dest: Rect, viewport: Size, flipped: bool) -> Affine {
    let scale = |extent: f64, span: f64| if span > 0.0 { extent / span } else { 1.0 };
    let sx = scale(dest.width(), viewport.width);
    let sy = scale(dest.height(), viewport.height);
    if flipped {
        Affine::translate((dest.x0, dest.y1)) * Affine::scale_non_uniform(sx, -sy)
    } else {
        Affine::translate((dest.x0, dest.y0)) * Affine::scale_non_uniform(sx, sy)
    }
}
