//! End-to-end lifecycle scenarios driven through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use vello::Scene;
use webview_baseview::kurbo::{Point, Rect, Size};
use webview_baseview::{
    dispatch, AttachState, BrowserHost, DrawRequest, EngineError, EngineInput, Event,
    EventStatus, FrameEventQueue, FrameId, HostPanel, LoadedFrame, MouseButton,
    MouseButtonEvent, PageControl, PlatformWindow, RenderingEngine, ScriptContext, Url,
    WebViewController, WebViewOptions, WindowId, WindowObject,
};

/// Everything the engine saw, shared so it can be inspected after the
/// controller takes ownership of the engine.
#[derive(Default)]
struct Journal {
    engines_created: usize,
    loads: Vec<String>,
    hosted_by: Vec<Option<WindowId>>,
    detaches: usize,
    renders: Vec<Size>,
    inputs: Vec<EngineInput>,
}

struct JournalEngine {
    journal: Rc<RefCell<Journal>>,
    frames: FrameEventQueue,
    next_frame: u64,
}

impl JournalEngine {
    fn loaded(&mut self) {
        let raw = self.next_frame;
        self.next_frame += 1;
        self.frames.post_frame_loaded(
            ScriptContext::from_raw(raw as usize),
            WindowObject::from_raw(raw as usize),
            FrameId::from_raw(raw),
        );
    }
}

impl RenderingEngine for JournalEngine {
    fn main_frame(&self) -> FrameId {
        FrameId::from_raw(0)
    }

    fn load_uri(&mut self, uri: &Url) -> Result<(), EngineError> {
        self.journal.borrow_mut().loads.push(uri.to_string());
        self.loaded();
        Ok(())
    }

    fn load_html(&mut self, markup: &str) -> Result<(), EngineError> {
        self.journal.borrow_mut().loads.push(markup.to_owned());
        self.loaded();
        Ok(())
    }

    fn close(&mut self) {}

    fn attach_host(&mut self, panel: &HostPanel) {
        self.journal.borrow_mut().hosted_by.push(panel.parent());
    }

    fn detach_host(&mut self) {
        self.journal.borrow_mut().detaches += 1;
    }

    fn set_viewport(&mut self, _size: Size) {}

    fn render(&mut self, _target: &mut Scene, viewport: Size) -> Result<(), EngineError> {
        self.journal.borrow_mut().renders.push(viewport);
        Ok(())
    }

    fn dispatch_input(&mut self, input: &EngineInput) -> bool {
        self.journal.borrow_mut().inputs.push(input.clone());
        true
    }
}

#[derive(Default)]
struct PluginHost {
    loaded: RefCell<Vec<LoadedFrame>>,
    closing: RefCell<Vec<FrameId>>,
}

impl BrowserHost for PluginHost {
    fn frame_loaded(&self, _page: &mut dyn PageControl, frame: &LoadedFrame) {
        self.loaded.borrow_mut().push(*frame);
    }

    fn frame_closing(&self, frame: FrameId) {
        self.closing.borrow_mut().push(frame);
    }
}

struct HostWindow {
    id: WindowId,
    bounds: Rect,
}

impl HostWindow {
    fn new(width: f64, height: f64) -> Self {
        Self {
            id: WindowId::new(),
            bounds: Rect::new(0.0, 0.0, width, height),
        }
    }
}

impl PlatformWindow for HostWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn is_visible(&self) -> bool {
        true
    }

    fn raw_window_handle(&self) -> Option<raw_window_handle::RawWindowHandle> {
        None
    }
}

fn webview() -> (
    WebViewController<JournalEngine>,
    Rc<RefCell<Journal>>,
    Rc<PluginHost>,
) {
    let journal = Rc::new(RefCell::new(Journal::default()));
    let host = Rc::new(PluginHost::default());
    let engine_journal = Rc::clone(&journal);
    let controller = WebViewController::new(host.clone(), WebViewOptions::default(), |frames| {
        engine_journal.borrow_mut().engines_created += 1;
        Ok(JournalEngine {
            journal: engine_journal,
            frames,
            next_frame: 1,
        })
    });
    (controller, journal, host)
}

fn button(kind: MouseButton, x: f64, y: f64) -> MouseButtonEvent {
    MouseButtonEvent {
        button: kind,
        position: Point::new(x, y),
        modifiers: keyboard_types::Modifiers::empty(),
    }
}

#[test]
fn load_before_attach_reaches_engine_on_attach() {
    let (mut webview, journal, host) = webview();
    let mut window = HostWindow::new(400.0, 300.0);

    webview.load_html("<p>hi</p>").unwrap();
    assert!(journal.borrow().loads.is_empty());
    assert!(host.loaded.borrow().is_empty());

    let status = dispatch(&mut webview, Event::Attached, &mut window);
    assert_eq!(status, EventStatus::Captured);
    assert_eq!(journal.borrow().loads, vec!["<p>hi</p>".to_owned()]);
    assert_eq!(host.loaded.borrow().len(), 1);
    assert!(webview.is_page_loaded());
}

#[test]
fn engine_survives_reparenting() {
    let (mut webview, journal, _host) = webview();
    let mut first = HostWindow::new(400.0, 300.0);
    let mut second = HostWindow::new(640.0, 480.0);

    dispatch(&mut webview, Event::Attached, &mut first);
    webview.load_uri_str("https://example.com/plugin").unwrap();
    dispatch(&mut webview, Event::Detached, &mut first);
    assert_eq!(webview.state(), AttachState::Unattached);
    assert!(webview.is_page_loaded());

    dispatch(&mut webview, Event::Attached, &mut second);
    assert_eq!(webview.attached_window(), Some(second.id));

    let mut scene = Scene::new();
    let rect = second.bounds;
    let request = DrawRequest {
        surface: &mut scene,
        rect,
        flipped: true,
    };
    assert_eq!(
        dispatch(&mut webview, Event::DrawRequest(request), &mut second),
        EventStatus::Captured
    );

    let journal = journal.borrow();
    assert_eq!(journal.engines_created, 1);
    assert_eq!(journal.hosted_by, vec![Some(first.id), Some(second.id)]);
    assert_eq!(journal.detaches, 1);
    assert_eq!(journal.loads.len(), 1);
    assert_eq!(journal.renders, vec![Size::new(640.0, 480.0)]);
}

#[test]
fn press_and_release_in_place_is_one_click() {
    let (mut webview, journal, _host) = webview();
    let mut window = HostWindow::new(200.0, 200.0);
    dispatch(&mut webview, Event::Attached, &mut window);

    dispatch(&mut webview, Event::MouseDown(button(MouseButton::Left, 10.0, 10.0)), &mut window);
    dispatch(&mut webview, Event::MouseUp(button(MouseButton::Left, 10.0, 10.0)), &mut window);

    let journal = journal.borrow();
    let clicks = journal
        .inputs
        .iter()
        .filter(|input| matches!(input, EngineInput::Click { .. }))
        .count();
    assert_eq!(clicks, 1);
    assert!(matches!(
        journal.inputs.as_slice(),
        [
            EngineInput::MouseDown { .. },
            EngineInput::MouseUp { .. },
            EngineInput::Click { .. }
        ]
    ));
}

#[test]
fn close_page_reports_the_loaded_frame() {
    let (mut webview, _journal, host) = webview();
    let mut window = HostWindow::new(200.0, 200.0);
    dispatch(&mut webview, Event::Attached, &mut window);
    webview.load_html("<p>bye</p>").unwrap();

    let frame = webview.page_host().current_frame().unwrap().frame;
    webview.close_page();

    assert_eq!(*host.closing.borrow(), vec![frame]);
    assert!(!webview.is_page_loaded());
    assert!(webview.page_host().script_context().is_none());
}

#[test]
fn dropping_attached_controller_unhosts_engine() {
    let (mut webview, journal, _host) = webview();
    let mut window = HostWindow::new(200.0, 200.0);
    dispatch(&mut webview, Event::Attached, &mut window);
    drop(webview);
    assert_eq!(journal.borrow().detaches, 1);
}
