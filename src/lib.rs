//! WebView Baseview
//!
//! This crate embeds a web-rendering engine inside plugin windows (CLAP,
//! VST3 and similar hosts) and routes the window's input, paint and lifecycle
//! events to it through a typed dispatch layer.
//!
//! # Architecture
//!
//! - [`Event`] values describe one occurrence each (mouse, key, focus,
//!   attach/detach, resize, draw).
//! - [`EventSink`] is the handler table: one method per variant, generic over
//!   the [`PlatformWindow`] type the events come from. [`dispatch`] resolves
//!   an event with a single exhaustive match.
//! - [`WebViewController`] owns a [`RenderingEngine`] and the [`HostPanel`]
//!   it is hosted in, and follows the attach/detach lifecycle of the platform
//!   window. The engine outlives detaches, so a document survives the host
//!   rebuilding its window.
//! - [`BrowserHost`] is the embedding page's script context; it hears about
//!   frames loading and closing.
//! - [`WebViewWindow`] opens a baseview window and feeds its events to any
//!   sink, usually a controller. Composed frames go to a [`FramePresenter`];
//!   [`GpuPresenter`] draws them with vello on the window's wgpu surface.
//!
//! Everything runs on the host's UI thread. Engines report frame lifecycle
//! through a [`FrameEventQueue`] which the controller drains.
//!
//! # Usage
//!
//! ```ignore
//! use std::rc::Rc;
//! use webview_baseview::{GpuPresenter, WebViewController, WebViewOptions, WebViewWindow};
//!
//! WebViewWindow::open_parented(
//!     &parent_handle,
//!     window_options,
//!     move || {
//!         let mut webview = WebViewController::new(
//!             Rc::new(PluginHost::default()),
//!             WebViewOptions::default(),
//!             MyEngine::new,
//!         );
//!         webview.load_html("<p>hi</p>").ok();
//!         webview
//!     },
//!     GpuPresenter::new,
//! );
//! ```

mod controller;
mod engine;
mod error;
mod event;
mod host;
mod options;
mod panel;
mod render;
mod sink;
mod translate;
mod window;

pub use baseview::{Size, WindowOpenOptions, WindowScalePolicy};
pub use controller::{AttachState, WebViewController};
pub use engine::{
    EngineInput, FrameEventQueue, FrameId, FrameNotification, LoadedFrame, RenderingEngine,
    ScriptContext, WindowObject,
};
pub use error::{EngineError, PresentError, WebViewError};
pub use event::{
    DrawRequest, Event, EventKind, KeyEvent, MouseButton, MouseButtonEvent, MouseButtons,
    MouseMoveEvent, MouseScrollEvent, ScrollDelta,
};
pub use host::{BrowserHost, PageControl, PageHost};
pub use options::WebViewOptions;
pub use panel::{placement_transform, HostPanel, PanelId};
pub use render::GpuPresenter;
pub use sink::{dispatch, EventSink, EventStatus};
pub use translate::EventTranslator;
pub use window::{
    BaseviewWindow, FramePresenter, PlatformWindow, WebViewWindow, WebViewWindowHandle, WindowId,
};

pub use url::Url;
pub use vello::kurbo;
