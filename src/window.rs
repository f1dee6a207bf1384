//! Platform windows
//!
//! [`PlatformWindow`] is the drawable surface a host supplies. The baseview
//! adapter in this module opens such a window, translates baseview's
//! callbacks into typed events and dispatches them to a sink built on the
//! window thread.

use baseview::{
    EventStatus as BvEventStatus, Size, Window, WindowHandle, WindowHandler, WindowOpenOptions,
};
use raw_window_handle::{
    HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle,
};
use dpi::LogicalSize;
use tracing::{debug, info};
use vello::kurbo::{Point, Rect};
use vello::Scene;

use crate::event::{DrawRequest, Event};
use crate::sink::{dispatch, EventSink, EventStatus};
use crate::translate::EventTranslator;

/// Unique identifier for a platform window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    /// Create a new unique WindowId.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

/// A native drawable surface supplied by the host.
pub trait PlatformWindow {
    fn id(&self) -> WindowId;

    /// Bounds in logical units.
    fn bounds(&self) -> Rect;

    fn is_visible(&self) -> bool;

    /// The native handle, when the window has one.
    fn raw_window_handle(&self) -> Option<RawWindowHandle>;
}

/// A baseview window as seen by event sinks.
#[derive(Debug)]
pub struct BaseviewWindow {
    id: WindowId,
    bounds: Rect,
    scale_factor: f64,
    visible: bool,
    handle: Option<RawWindowHandle>,
    display: Option<RawDisplayHandle>,
}

impl BaseviewWindow {
    fn new(window: &Window, size: Size) -> Self {
        Self::from_parts(
            Rect::from_origin_size(Point::ZERO, (size.width, size.height)),
            1.0,
            Some(window.raw_window_handle()),
            Some(window.raw_display_handle()),
        )
    }

    pub(crate) fn from_parts(
        bounds: Rect,
        scale_factor: f64,
        handle: Option<RawWindowHandle>,
        display: Option<RawDisplayHandle>,
    ) -> Self {
        Self {
            id: WindowId::new(),
            bounds,
            scale_factor,
            visible: true,
            handle,
            display,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn raw_display_handle(&self) -> Option<RawDisplayHandle> {
        self.display
    }

    /// Size of the drawable area in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let logical = LogicalSize::new(self.bounds.width(), self.bounds.height());
        let physical = logical.to_physical::<u32>(self.scale_factor);
        (physical.width, physical.height)
    }
}

impl PlatformWindow for BaseviewWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn raw_window_handle(&self) -> Option<RawWindowHandle> {
        self.handle
    }
}

/// Shows a composed frame on screen.
///
/// Drawing goes into a vello [`Scene`] in logical units.
/// [`crate::GpuPresenter`] shows it on the window's GPU surface; hosts with
/// their own renderer can supply a closure instead.
pub trait FramePresenter {
    fn present(&mut self, scene: &Scene, window: &BaseviewWindow);

    /// The window's size or scale changed.
    #[allow(unused_variables)]
    fn resize(&mut self, window: &BaseviewWindow) {}
}

impl<F> FramePresenter for F
where
    F: FnMut(&Scene, &BaseviewWindow),
{
    fn present(&mut self, scene: &Scene, window: &BaseviewWindow) {
        self(scene, window)
    }
}

/// Handle to a baseview window driving an event sink
pub struct WebViewWindowHandle {
    inner: WindowHandle,
}

impl WebViewWindowHandle {
    /// Ask the window to close. The sink receives `Detached` first.
    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

/// Opens baseview windows whose events go to an [`EventSink`]
pub struct WebViewWindow;

impl WebViewWindow {
    /// Open a window parented to another window (for plugin UIs)
    ///
    /// `build_sink` and `build_presenter` run on the window thread, so
    /// neither the sink nor the presenter needs to be `Send`.
    pub fn open_parented<P, B, S, Q, F>(
        parent: &P,
        options: WindowOpenOptions,
        build_sink: B,
        build_presenter: Q,
    ) -> WebViewWindowHandle
    where
        P: HasRawWindowHandle,
        B: FnOnce() -> S + Send + 'static,
        S: EventSink<BaseviewWindow> + 'static,
        Q: FnOnce() -> F + Send + 'static,
        F: FramePresenter + 'static,
    {
        let size = options.size;
        let inner = Window::open_parented(parent, options, move |window| {
            SinkHandler::new(window, size, build_sink(), build_presenter())
        });
        WebViewWindowHandle { inner }
    }

    /// Open a standalone window (for testing)
    ///
    /// Note: This blocks the current thread until the window is closed.
    pub fn open_blocking<B, S, Q, F>(options: WindowOpenOptions, build_sink: B, build_presenter: Q)
    where
        B: FnOnce() -> S + Send + 'static,
        S: EventSink<BaseviewWindow> + 'static,
        Q: FnOnce() -> F + Send + 'static,
        F: FramePresenter + 'static,
    {
        let size = options.size;
        Window::open_blocking(options, move |window| {
            SinkHandler::new(window, size, build_sink(), build_presenter())
        });
    }
}

/// Window handler bridging baseview callbacks to an event sink
///
/// `Attached` is sent on the first frame, once the native window exists, and
/// `Detached` when baseview reports `WillClose`.
struct SinkHandler<S, F> {
    sink: S,
    presenter: F,
    translator: EventTranslator,
    window: BaseviewWindow,
    attached: bool,
    closed: bool,
    /// Reused between frames; reset before every draw.
    scene: Scene,
}

impl<S, F> SinkHandler<S, F>
where
    S: EventSink<BaseviewWindow>,
    F: FramePresenter,
{
    fn new(window: &mut Window, size: Size, sink: S, presenter: F) -> Self {
        Self {
            sink,
            presenter,
            translator: EventTranslator::new(1.0),
            window: BaseviewWindow::new(window, size),
            attached: false,
            closed: false,
            scene: Scene::new(),
        }
    }

    fn ensure_attached(&mut self) {
        if self.attached || self.closed {
            return;
        }
        self.attached = true;
        let status = dispatch(&mut self.sink, Event::Attached, &mut self.window);
        info!(window = ?self.window.id, consumed = status.is_consumed(), "Window attached");
    }

    fn detach(&mut self) -> EventStatus {
        if !self.attached {
            return EventStatus::Ignored;
        }
        self.attached = false;
        self.closed = true;
        self.window.visible = false;
        let status = dispatch(&mut self.sink, Event::Detached, &mut self.window);
        info!(window = ?self.window.id, "Window detached");
        status
    }

    fn render_frame(&mut self) {
        self.scene.reset();
        let rect = Rect::from_origin_size(Point::ZERO, self.window.bounds.size());
        let request = DrawRequest {
            surface: &mut self.scene,
            rect,
            flipped: false,
        };
        let status = dispatch(&mut self.sink, Event::DrawRequest(request), &mut self.window);
        if status.is_consumed() {
            self.presenter.present(&self.scene, &self.window);
        }
    }
}

impl<S, F> WindowHandler for SinkHandler<S, F>
where
    S: EventSink<BaseviewWindow>,
    F: FramePresenter,
{
    fn on_frame(&mut self, window: &mut Window) {
        self.window.handle = Some(window.raw_window_handle());
        self.window.display = Some(window.raw_display_handle());
        self.ensure_attached();
        if self.attached {
            self.render_frame();
        }
    }

    fn on_event(&mut self, _window: &mut Window, event: baseview::Event) -> BvEventStatus {
        let Some(event) = self.translator.translate(&event) else {
            return BvEventStatus::Ignored;
        };

        let status = match event {
            Event::Detached => self.detach(),
            Event::Resized(bounds) => {
                self.window.bounds = bounds;
                self.window.scale_factor = self.translator.scale_factor();
                debug!(window = ?self.window.id, ?bounds, "Window resized");
                self.presenter.resize(&self.window);
                dispatch(&mut self.sink, Event::Resized(bounds), &mut self.window)
            }
            event => dispatch(&mut self.sink, event, &mut self.window),
        };

        if status.is_consumed() {
            BvEventStatus::Captured
        } else {
            BvEventStatus::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_size_follows_scale() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 300.0);
        let mut window = BaseviewWindow::from_parts(bounds, 1.0, None, None);
        assert_eq!(window.physical_size(), (400, 300));

        window.scale_factor = 2.0;
        assert_eq!(window.physical_size(), (800, 600));
        assert_eq!(window.raw_window_handle(), None);
        assert_eq!(window.raw_display_handle(), None);
    }

    #[test]
    fn test_window_ids_are_unique() {
        assert_ne!(WindowId::new(), WindowId::new());
    }
}
