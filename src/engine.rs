//! Rendering engine seam
//!
//! The web-rendering engine is an external collaborator. The controller drives
//! it through [`RenderingEngine`]; the engine reports frame lifecycle back by
//! posting onto the [`FrameEventQueue`] it receives at construction. The queue
//! is drained by the controller on the UI thread, which keeps every state
//! change on a single writer even when the engine calls back mid-operation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use keyboard_types::Modifiers;
use url::Url;
use vello::kurbo::{Point, Size};
use vello::Scene;

use crate::error::EngineError;
use crate::event::{KeyEvent, MouseButton, MouseButtons, ScrollDelta};
use crate::panel::HostPanel;

/// Identity of one document frame inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

impl FrameId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to the script execution context of a loaded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptContext(usize);

impl ScriptContext {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Opaque handle to the global `window` object of a loaded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowObject(usize);

impl WindowObject {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> usize {
        self.0
    }
}

/// Script-visible state of a frame that finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedFrame {
    pub context: ScriptContext,
    pub window: WindowObject,
    pub frame: FrameId,
}

/// Engine-driven frame lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameNotification {
    Loaded(LoadedFrame),
    /// The frame is being torn down; its script context may already be gone.
    Closing(FrameId),
}

/// Single-writer queue of frame notifications.
///
/// Cloned handles share one queue. Borrows are held only for the duration of
/// a push or pop, so engines may post from inside any controller call.
#[derive(Debug, Clone, Default)]
pub struct FrameEventQueue {
    inner: Rc<RefCell<VecDeque<FrameNotification>>>,
}

impl FrameEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, notification: FrameNotification) {
        self.inner.borrow_mut().push_back(notification);
    }

    pub fn post_frame_loaded(&self, context: ScriptContext, window: WindowObject, frame: FrameId) {
        self.post(FrameNotification::Loaded(LoadedFrame {
            context,
            window,
            frame,
        }));
    }

    pub fn post_frame_closing(&self, frame: FrameId) {
        self.post(FrameNotification::Closing(frame));
    }

    pub(crate) fn pop(&self) -> Option<FrameNotification> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

/// Input forwarded to the engine's input model.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineInput {
    MouseDown {
        button: MouseButton,
        position: Point,
        buttons: MouseButtons,
        modifiers: Modifiers,
    },
    MouseUp {
        button: MouseButton,
        position: Point,
        buttons: MouseButtons,
        modifiers: Modifiers,
    },
    /// Synthesized from a press and release of the same button in place.
    Click {
        button: MouseButton,
        position: Point,
        modifiers: Modifiers,
    },
    MouseMove {
        position: Point,
        buttons: MouseButtons,
        modifiers: Modifiers,
    },
    Scroll {
        position: Point,
        delta: ScrollDelta,
        modifiers: Modifiers,
    },
    /// `buttons` is non-empty when the pointer enters with a button held.
    MouseEntered {
        buttons: MouseButtons,
    },
    MouseExited {
        buttons: MouseButtons,
    },
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    Focus(bool),
}

/// A web-rendering engine instance owned by a WebView controller.
///
/// All methods are called on the UI thread. Frame lifecycle callbacks go
/// through the [`FrameEventQueue`] handed to the engine's constructor.
pub trait RenderingEngine {
    /// The top-level frame of the current document.
    fn main_frame(&self) -> FrameId;

    fn load_uri(&mut self, uri: &Url) -> Result<(), EngineError>;

    fn load_html(&mut self, markup: &str) -> Result<(), EngineError>;

    /// Tear down the current document.
    fn close(&mut self);

    /// Bind the engine's output to a hosting panel.
    fn attach_host(&mut self, panel: &HostPanel);

    /// Unbind from the hosting panel. The document stays alive.
    fn detach_host(&mut self);

    /// Lay the document out for a new viewport size.
    fn set_viewport(&mut self, size: Size);

    /// Draw the document into `target` with the origin at the top-left corner
    /// of a `viewport`-sized area.
    fn render(&mut self, target: &mut Scene, viewport: Size) -> Result<(), EngineError>;

    /// Returns `true` if the engine consumed the input.
    fn dispatch_input(&mut self, input: &EngineInput) -> bool;
}
