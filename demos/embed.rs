//! Opens a standalone window hosting a toy rendering engine
//!
//! Run with: cargo run --example embed

use std::rc::Rc;

use vello::kurbo::{Affine, Point, Rect, RoundedRect};
use vello::peniko::{Color, Fill};
use vello::Scene;
use webview_baseview::{
    BrowserHost, EngineError, EngineInput, FrameEventQueue, FrameId, GpuPresenter, HostPanel,
    LoadedFrame, PageControl, RenderingEngine, ScriptContext, Size, Url, WebViewController,
    WebViewError, WebViewOptions, WebViewWindow, WindowObject, WindowOpenOptions,
    WindowScalePolicy,
};

/// Stand-in engine: paints a page background and a button that toggles
/// colour when clicked.
struct ToyEngine {
    frames: FrameEventQueue,
    next_frame: u64,
    viewport: vello::kurbo::Size,
    pressed: bool,
    hosted: bool,
}

impl ToyEngine {
    fn new(frames: FrameEventQueue) -> Result<Self, EngineError> {
        Ok(Self {
            frames,
            next_frame: 1,
            viewport: vello::kurbo::Size::ZERO,
            pressed: false,
            hosted: false,
        })
    }

    fn button(&self) -> Rect {
        let center = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        Rect::from_center_size(center, (160.0, 48.0))
    }

    fn finish_load(&mut self) {
        let frame = self.next_frame;
        self.next_frame += 1;
        self.frames.post_frame_loaded(
            ScriptContext::from_raw(frame as usize),
            WindowObject::from_raw(frame as usize),
            FrameId::from_raw(frame),
        );
    }
}

impl RenderingEngine for ToyEngine {
    fn main_frame(&self) -> FrameId {
        FrameId::from_raw(0)
    }

    fn load_uri(&mut self, uri: &Url) -> Result<(), EngineError> {
        println!("Loading {uri}");
        self.finish_load();
        Ok(())
    }

    fn load_html(&mut self, markup: &str) -> Result<(), EngineError> {
        println!("Loading {} bytes of markup", markup.len());
        self.finish_load();
        Ok(())
    }

    fn close(&mut self) {
        self.frames
            .post_frame_closing(FrameId::from_raw(self.next_frame - 1));
    }

    fn attach_host(&mut self, panel: &HostPanel) {
        println!("Hosted in panel {:?}", panel.id());
        self.hosted = true;
    }

    fn detach_host(&mut self) {
        self.hosted = false;
    }

    fn set_viewport(&mut self, size: vello::kurbo::Size) {
        self.viewport = size;
    }

    fn render(
        &mut self,
        target: &mut Scene,
        viewport: vello::kurbo::Size,
    ) -> Result<(), EngineError> {
        if !self.hosted {
            return Err(EngineError::Render("not hosted".into()));
        }
        let page = Rect::from_origin_size(Point::ZERO, viewport);
        target.fill(
            Fill::NonZero,
            Affine::IDENTITY,
            Color::from_rgb8(0xf4, 0xf1, 0xea),
            None,
            &page,
        );
        let color = if self.pressed {
            Color::from_rgb8(0xd9, 0x48, 0x2b)
        } else {
            Color::from_rgb8(0x2b, 0x6c, 0xd9)
        };
        let button = RoundedRect::from_rect(self.button(), 8.0);
        target.fill(Fill::NonZero, Affine::IDENTITY, color, None, &button);
        Ok(())
    }

    fn dispatch_input(&mut self, input: &EngineInput) -> bool {
        match input {
            EngineInput::Click { position, .. } if self.button().contains(*position) => {
                self.pressed = !self.pressed;
                true
            }
            EngineInput::KeyDown(_) | EngineInput::KeyUp(_) => false,
            _ => true,
        }
    }
}

/// Prints the page lifecycle.
struct PluginHost;

impl BrowserHost for PluginHost {
    fn frame_loaded(&self, page: &mut dyn PageControl, frame: &LoadedFrame) {
        println!(
            "Frame {:?} loaded (attached: {})",
            frame.frame,
            page.is_attached()
        );
    }

    fn frame_closing(&self, frame: FrameId) {
        println!("Frame {frame:?} closing");
    }

    fn load_failed(&self, error: &WebViewError) {
        eprintln!("Load failed: {error}");
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    println!("Opening window...");

    let options = WindowOpenOptions {
        title: "WebView Baseview Example".into(),
        size: Size::new(400.0, 300.0),
        scale: WindowScalePolicy::SystemScaleFactor,
    };

    // This blocks until the window is closed
    WebViewWindow::open_blocking(
        options,
        || {
            let mut webview = WebViewController::new(
                Rc::new(PluginHost),
                WebViewOptions::default().with_click_slop(4.0),
                ToyEngine::new,
            );
            // Deferred until the window attaches.
            if let Err(err) = webview.load_html("<button>Toggle</button>") {
                eprintln!("Load failed: {err}");
            }
            webview
        },
        GpuPresenter::new,
    );

    println!("Window closed.");
}
