//! WebView controller
//!
//! Owns one rendering engine and the panel that hosts it, follows a platform
//! window through attach and detach, and turns typed events into engine calls.
//!
//! Lifecycle: `Unattached -> Attaching -> Attached -> Detaching -> Unattached`.
//! The engine lives as long as the controller; the hosting panel lives only
//! while a platform window is attached (or while a popup panel is open), so a
//! document survives the host rebuilding or reparenting its window.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, info, trace, warn};
use url::Url;
use vello::kurbo::{Affine, Point, Rect};

use crate::engine::{
    EngineInput, FrameEventQueue, FrameId, FrameNotification, LoadedFrame, RenderingEngine,
    ScriptContext, WindowObject,
};
use crate::error::{EngineError, WebViewError};
use crate::event::{
    DrawRequest, KeyEvent, MouseButton, MouseButtonEvent, MouseButtons, MouseMoveEvent,
    MouseScrollEvent,
};
use crate::host::{BrowserHost, PageControl, PageHost};
use crate::options::WebViewOptions;
use crate::panel::HostPanel;
use crate::sink::{EventSink, EventStatus};
use crate::window::{PlatformWindow, WindowId};

/// Attachment state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    Attaching,
    Attached,
    Detaching,
}

#[derive(Debug)]
enum PendingLoad {
    Uri(Url),
    Html(String),
}

#[derive(Debug, Clone, Copy)]
struct Press {
    button: MouseButton,
    position: Point,
}

pub struct WebViewController<E: RenderingEngine> {
    /// `None` only when the engine failed to initialize.
    engine: Option<E>,
    frame_events: FrameEventQueue,
    page_host: Rc<PageHost>,
    options: WebViewOptions,
    state: AttachState,
    /// The attached platform window. A relation, never ownership.
    window: Option<WindowId>,
    panel: Option<HostPanel>,
    /// Bounds a window reported before it attached.
    pending_bounds: Option<(WindowId, Rect)>,
    /// Last load requested while unhosted; replayed once on attach.
    pending_load: Option<PendingLoad>,
    page_loaded: bool,
    buttons: MouseButtons,
    press: Option<Press>,
    /// Transform of the last frame placed on a host surface.
    placement: Option<Affine>,
    /// Frame whose closing was already reported by `close_page`.
    closed_frame: Option<FrameId>,
    /// Closings delivered while `close_page` is draining the queue.
    closing_reports: Option<Vec<FrameId>>,
    pumping: bool,
}

impl<E: RenderingEngine> WebViewController<E> {
    /// Create a controller for the plugin whose page context is `host`.
    ///
    /// `init` builds the engine and receives the queue it must post frame
    /// notifications to. If it fails the controller is still usable, but
    /// every load reports [`WebViewError::EngineUnavailable`].
    pub fn new<F>(host: Rc<dyn BrowserHost>, options: WebViewOptions, init: F) -> Self
    where
        F: FnOnce(FrameEventQueue) -> Result<E, EngineError>,
    {
        let frame_events = FrameEventQueue::new();
        let engine = match init(frame_events.clone()) {
            Ok(engine) => Some(engine),
            Err(err) => {
                error!(%err, "Rendering engine unavailable");
                None
            }
        };

        let mut controller = Self {
            engine,
            frame_events,
            page_host: Rc::new(PageHost::new(host)),
            options,
            state: AttachState::Unattached,
            window: None,
            panel: None,
            pending_bounds: None,
            pending_load: None,
            page_loaded: false,
            buttons: MouseButtons::empty(),
            press: None,
            placement: None,
            closed_frame: None,
            closing_reports: None,
            pumping: false,
        };

        if controller.options.popup {
            let title = controller.options.popup_title.clone();
            let bounds = controller.options.popup_bounds;
            if let Err(err) = controller.open_popup(title, bounds) {
                warn!(%err, "Could not open popup panel");
            }
        }

        controller
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == AttachState::Attached
    }

    pub fn is_page_loaded(&self) -> bool {
        self.page_loaded
    }

    pub fn attached_window(&self) -> Option<WindowId> {
        self.window
    }

    pub fn panel(&self) -> Option<&HostPanel> {
        self.panel.as_ref()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn options(&self) -> &WebViewOptions {
        &self.options
    }

    pub fn mouse_buttons(&self) -> MouseButtons {
        self.buttons
    }

    pub fn has_pending_load(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Where the last drawn frame landed on the host's surface, mapping
    /// document coordinates to surface coordinates.
    pub fn last_placement(&self) -> Option<Affine> {
        self.placement
    }

    /// The page context of the document inside this WebView.
    pub fn page_host(&self) -> Rc<PageHost> {
        Rc::clone(&self.page_host)
    }

    /// The embedding plugin's host bridge.
    pub fn parent_host(&self) -> Rc<dyn BrowserHost> {
        self.page_host.parent()
    }

    /// Another handle to the queue the engine posts frame notifications to.
    pub fn frame_events(&self) -> FrameEventQueue {
        self.frame_events.clone()
    }

    pub fn load_uri(&mut self, uri: &Url) -> Result<(), WebViewError> {
        self.load(PendingLoad::Uri(uri.clone()))
    }

    /// Parse `uri` and load it.
    pub fn load_uri_str(&mut self, uri: &str) -> Result<(), WebViewError> {
        let uri = Url::parse(uri)?;
        self.load(PendingLoad::Uri(uri))
    }

    pub fn load_html(&mut self, markup: &str) -> Result<(), WebViewError> {
        self.load(PendingLoad::Html(markup.to_owned()))
    }

    /// Tear down the current document.
    ///
    /// Exactly one frame-closing notification reaches the host, whether or
    /// not the engine reports one itself and whether or not anything had
    /// finished loading. The controller can navigate again afterwards.
    pub fn close_page(&mut self) {
        self.pending_load = None;
        if self.engine.is_none() {
            warn!("close_page without a rendering engine");
            return;
        }

        // Settle what the engine reported before the close.
        self.pump_frame_events();
        let current = self.page_host.current_frame().map(|loaded| loaded.frame);
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let frame = current.unwrap_or_else(|| engine.main_frame());
        info!(?frame, "Closing page");
        engine.close();

        self.closed_frame = None;
        let outer = self.closing_reports.replace(Vec::new());
        self.pump_frame_events();
        let reported = std::mem::replace(&mut self.closing_reports, outer).unwrap_or_default();
        if !reported.contains(&frame) {
            self.on_frame_closing(frame);
        }
        self.closed_frame = Some(frame);
    }

    /// Open an independent popup panel for the engine.
    ///
    /// Popup mode and attachment to a platform window exclude each other.
    pub fn open_popup(
        &mut self,
        title: impl Into<String>,
        bounds: Rect,
    ) -> Result<(), WebViewError> {
        if self.state != AttachState::Unattached {
            return Err(WebViewError::PopupWhileAttached);
        }
        let engine = self.engine.as_mut().ok_or(WebViewError::EngineUnavailable)?;
        let title = title.into();

        match self.panel.as_mut() {
            Some(panel) => {
                panel.set_title(title);
                if panel.set_bounds(bounds) {
                    engine.set_viewport(bounds.size());
                }
                return Ok(());
            }
            None => {
                let panel = HostPanel::popup(title, bounds, self.options.activate_on_attach);
                engine.attach_host(&panel);
                engine.set_viewport(bounds.size());
                self.panel = Some(panel);
            }
        }

        self.flush_pending_load();
        self.pump_frame_events();
        Ok(())
    }

    /// Close the popup panel. Returns `false` if none was open.
    pub fn close_popup(&mut self) -> bool {
        if !self.is_popup() {
            return false;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.detach_host();
        }
        if let Some(panel) = self.panel.take() {
            panel.release();
        }
        true
    }

    pub fn is_popup(&self) -> bool {
        self.panel.as_ref().is_some_and(HostPanel::is_popup)
    }

    /// Deliver queued engine notifications. Returns how many were delivered.
    ///
    /// Called after loads, attach and every draw; hosts whose engine reports
    /// outside of those calls should call it from their event loop.
    pub fn pump_frame_events(&mut self) -> usize {
        if self.pumping {
            return 0;
        }
        self.pumping = true;
        let mut delivered = 0;
        while let Some(notification) = self.frame_events.pop() {
            match notification {
                FrameNotification::Loaded(loaded) => {
                    self.on_frame_loaded(loaded.context, loaded.window, loaded.frame)
                }
                FrameNotification::Closing(frame) => self.on_frame_closing(frame),
            }
            delivered += 1;
        }
        self.pumping = false;
        delivered
    }

    /// A document finished loading. The host may navigate from inside the
    /// notification.
    pub fn on_frame_loaded(
        &mut self,
        context: ScriptContext,
        window: WindowObject,
        frame: FrameId,
    ) {
        info!(?frame, "Frame loaded");
        self.page_loaded = true;
        self.closed_frame = None;
        let loaded = LoadedFrame {
            context,
            window,
            frame,
        };
        let page_host = Rc::clone(&self.page_host);
        page_host.frame_loaded(self, &loaded);
    }

    pub fn on_frame_closing(&mut self, frame: FrameId) {
        if self.closed_frame == Some(frame) {
            debug!(?frame, "Frame closing already reported");
            return;
        }
        info!(?frame, "Frame closing");
        if let Some(reports) = self.closing_reports.as_mut() {
            reports.push(frame);
        }
        let page_host = Rc::clone(&self.page_host);
        page_host.frame_closing(frame);
        self.page_loaded = page_host.is_loaded();
    }

    fn load(&mut self, request: PendingLoad) -> Result<(), WebViewError> {
        if self.engine.is_none() {
            return Err(WebViewError::EngineUnavailable);
        }
        if !self.is_hosted() {
            debug!(?request, "Deferring load until attached");
            if self.pending_load.replace(request).is_some() {
                debug!("Replaced an earlier deferred load");
            }
            return Ok(());
        }
        self.forward_load(&request)?;
        self.pump_frame_events();
        Ok(())
    }

    fn forward_load(&mut self, request: &PendingLoad) -> Result<(), WebViewError> {
        let engine = self.engine.as_mut().ok_or(WebViewError::EngineUnavailable)?;
        match request {
            PendingLoad::Uri(uri) => engine.load_uri(uri)?,
            PendingLoad::Html(markup) => engine.load_html(markup)?,
        }
        Ok(())
    }

    fn flush_pending_load(&mut self) {
        if let Some(request) = self.pending_load.take() {
            debug!(?request, "Replaying deferred load");
            if let Err(err) = self.forward_load(&request) {
                error!(%err, "Deferred load failed");
                let page_host = Rc::clone(&self.page_host);
                page_host.load_failed(&err);
            }
        }
    }

    /// Loads go straight to the engine while a panel is up and no transition
    /// is in progress.
    fn is_hosted(&self) -> bool {
        self.panel.is_some()
            && matches!(self.state, AttachState::Attached | AttachState::Unattached)
    }

    fn from_attached<W: PlatformWindow + ?Sized>(&self, window: &W) -> bool {
        self.state == AttachState::Attached && self.window == Some(window.id())
    }

    fn forward_input(&mut self, input: EngineInput) -> Option<bool> {
        let engine = self.engine.as_mut()?;
        trace!(?input, "Forwarding input");
        Some(engine.dispatch_input(&input))
    }

    fn window_attached<W: PlatformWindow + ?Sized>(&mut self, window: &W) -> EventStatus {
        if self.state != AttachState::Unattached {
            lifecycle_violation(format_args!(
                "attach from {:?} while {:?}",
                window.id(),
                self.state
            ));
            return EventStatus::Ignored;
        }
        if self.is_popup() {
            warn!(window = ?window.id(), "Popup panel is open; ignoring attach");
            return EventStatus::Ignored;
        }

        self.state = AttachState::Attaching;
        let bounds = match self.pending_bounds.take() {
            Some((id, bounds)) if id == window.id() => bounds,
            _ => window.bounds(),
        };
        let panel = HostPanel::embedded(
            window.id(),
            window.raw_window_handle(),
            bounds,
            self.options.activate_on_attach,
        );
        if let Some(engine) = self.engine.as_mut() {
            engine.attach_host(&panel);
            engine.set_viewport(bounds.size());
        }
        self.panel = Some(panel);
        self.window = Some(window.id());
        self.state = AttachState::Attached;
        info!(window = ?window.id(), ?bounds, "WebView attached");

        self.flush_pending_load();
        self.pump_frame_events();
        EventStatus::Captured
    }

    fn window_detached<W: PlatformWindow + ?Sized>(&mut self, window: &W) -> EventStatus {
        if self.state != AttachState::Attached {
            lifecycle_violation(format_args!(
                "detach from {:?} while {:?}",
                window.id(),
                self.state
            ));
            return EventStatus::Ignored;
        }
        if self.window != Some(window.id()) {
            lifecycle_violation(format_args!(
                "detach from {:?} while attached to {:?}",
                window.id(),
                self.window
            ));
            return EventStatus::Ignored;
        }

        self.state = AttachState::Detaching;
        if let Some(engine) = self.engine.as_mut() {
            engine.detach_host();
        }
        if let Some(panel) = self.panel.take() {
            panel.release();
        }
        self.window = None;
        self.pending_bounds = None;
        self.placement = None;
        self.buttons = MouseButtons::empty();
        self.press = None;
        self.state = AttachState::Unattached;
        info!(window = ?window.id(), "WebView detached");
        EventStatus::Captured
    }

    fn window_resized<W: PlatformWindow + ?Sized>(
        &mut self,
        bounds: Rect,
        window: &W,
    ) -> EventStatus {
        if self.state == AttachState::Unattached {
            debug!(window = ?window.id(), ?bounds, "Remembering bounds until attached");
            self.pending_bounds = Some((window.id(), bounds));
            return EventStatus::Captured;
        }
        if !self.from_attached(window) {
            return EventStatus::Ignored;
        }
        if let Some(panel) = self.panel.as_mut() {
            if panel.set_bounds(bounds) {
                if let Some(engine) = self.engine.as_mut() {
                    engine.set_viewport(bounds.size());
                }
            }
        }
        EventStatus::Captured
    }

    fn draw<W: PlatformWindow + ?Sized>(
        &mut self,
        request: DrawRequest<'_>,
        window: &W,
    ) -> EventStatus {
        if !self.from_attached(window) {
            trace!(window = ?window.id(), "Draw while not attached");
            return EventStatus::Ignored;
        }
        let (Some(panel), Some(engine)) = (self.panel.as_ref(), self.engine.as_mut()) else {
            return EventStatus::Ignored;
        };
        let DrawRequest {
            surface,
            rect,
            flipped,
        } = request;
        let status = match panel.render_into(engine, surface, rect, flipped) {
            Ok(placement) => {
                if placement.is_some() {
                    self.placement = placement;
                }
                EventStatus::Captured
            }
            Err(err) => {
                error!(%err, "Failed to render WebView");
                EventStatus::Ignored
            }
        };
        self.pump_frame_events();
        status
    }

    fn accepts_input<W: PlatformWindow + ?Sized>(&self, window: &W) -> bool {
        self.engine.is_some() && self.from_attached(window)
    }

    fn mouse_down(&mut self, event: &MouseButtonEvent) -> EventStatus {
        self.buttons |= event.button.mask();
        self.press = Some(Press {
            button: event.button,
            position: event.position,
        });
        self.forward_input(EngineInput::MouseDown {
            button: event.button,
            position: event.position,
            buttons: self.buttons,
            modifiers: event.modifiers,
        });
        EventStatus::Captured
    }

    fn mouse_up(&mut self, event: &MouseButtonEvent) -> EventStatus {
        self.buttons.remove(event.button.mask());
        self.forward_input(EngineInput::MouseUp {
            button: event.button,
            position: event.position,
            buttons: self.buttons,
            modifiers: event.modifiers,
        });

        if let Some(press) = self.press.filter(|press| press.button == event.button) {
            self.press = None;
            if (event.position - press.position).hypot() <= self.options.click_slop {
                self.forward_input(EngineInput::Click {
                    button: event.button,
                    position: event.position,
                    modifiers: event.modifiers,
                });
            }
        }
        EventStatus::Captured
    }

    fn mouse_move(&mut self, event: &MouseMoveEvent) -> EventStatus {
        if let Some(press) = self.press {
            if (event.position - press.position).hypot() > self.options.click_slop {
                self.press = None;
            }
        }
        self.forward_input(EngineInput::MouseMove {
            position: event.position,
            buttons: self.buttons,
            modifiers: event.modifiers,
        });
        EventStatus::Captured
    }

    fn key(&mut self, input: EngineInput) -> EventStatus {
        // Unconsumed keys go back to the host for default handling.
        EventStatus::from(self.forward_input(input).unwrap_or(false))
    }

    fn focus_changed(&mut self, focused: bool) -> EventStatus {
        if let Some(panel) = self.panel.as_mut() {
            panel.set_active(focused);
        }
        self.forward_input(EngineInput::Focus(focused));
        EventStatus::Captured
    }
}

#[track_caller]
fn lifecycle_violation(message: fmt::Arguments<'_>) {
    if cfg!(debug_assertions) {
        panic!("WebView lifecycle violation: {message}");
    }
    warn!("WebView lifecycle violation: {message}");
}

impl<E, W> EventSink<W> for WebViewController<E>
where
    E: RenderingEngine,
    W: PlatformWindow + ?Sized,
{
    fn on_mouse_down(&mut self, event: &MouseButtonEvent, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.mouse_down(event)
    }

    fn on_mouse_up(&mut self, event: &MouseButtonEvent, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.mouse_up(event)
    }

    fn on_mouse_move(&mut self, event: &MouseMoveEvent, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.mouse_move(event)
    }

    fn on_mouse_scroll(&mut self, event: &MouseScrollEvent, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.forward_input(EngineInput::Scroll {
            position: event.position,
            delta: event.delta,
            modifiers: event.modifiers,
        });
        EventStatus::Captured
    }

    fn on_mouse_entered(&mut self, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.forward_input(EngineInput::MouseEntered {
            buttons: self.buttons,
        });
        EventStatus::Captured
    }

    fn on_mouse_exited(&mut self, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.forward_input(EngineInput::MouseExited {
            buttons: self.buttons,
        });
        EventStatus::Captured
    }

    fn on_key_down(&mut self, event: &KeyEvent, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.key(EngineInput::KeyDown(event.clone()))
    }

    fn on_key_up(&mut self, event: &KeyEvent, window: &mut W) -> EventStatus {
        if !self.accepts_input(window) {
            return EventStatus::Ignored;
        }
        self.key(EngineInput::KeyUp(event.clone()))
    }

    fn on_focus_changed(&mut self, focused: bool, window: &mut W) -> EventStatus {
        if !self.from_attached(window) {
            return EventStatus::Ignored;
        }
        self.focus_changed(focused)
    }

    fn on_window_attached(&mut self, window: &mut W) -> EventStatus {
        self.window_attached(window)
    }

    fn on_window_detached(&mut self, window: &mut W) -> EventStatus {
        self.window_detached(window)
    }

    fn on_window_resized(&mut self, bounds: Rect, window: &mut W) -> EventStatus {
        self.window_resized(bounds, window)
    }

    fn on_draw(&mut self, request: DrawRequest<'_>, window: &mut W) -> EventStatus {
        self.draw(request, window)
    }
}

impl<E: RenderingEngine> PageControl for WebViewController<E> {
    fn load_uri(&mut self, uri: &Url) -> Result<(), WebViewError> {
        WebViewController::load_uri(self, uri)
    }

    fn load_html(&mut self, markup: &str) -> Result<(), WebViewError> {
        WebViewController::load_html(self, markup)
    }

    fn close_page(&mut self) {
        WebViewController::close_page(self)
    }

    fn is_attached(&self) -> bool {
        WebViewController::is_attached(self)
    }
}

impl<E: RenderingEngine> Drop for WebViewController<E> {
    fn drop(&mut self) {
        if let Some(panel) = self.panel.take() {
            if let Some(engine) = self.engine.as_mut() {
                engine.detach_host();
            }
            panel.release();
        }
    }
}

impl<E: RenderingEngine> fmt::Debug for WebViewController<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebViewController")
            .field("state", &self.state)
            .field("window", &self.window)
            .field("panel", &self.panel)
            .field("page_loaded", &self.page_loaded)
            .field("engine", &self.engine.is_some())
            .finish_non_exhaustive()
    }
}
