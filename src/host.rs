//! Browser host bridge
//!
//! [`BrowserHost`] is the embedding page's script context, shared between the
//! plugin core and the WebView controller. [`PageHost`] is the controller's own
//! view of the page inside its WebView: it remembers the script context of the
//! frame that is currently loaded and forwards every notification to the
//! parent host.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;
use url::Url;

use crate::engine::{FrameId, LoadedFrame, ScriptContext, WindowObject};
use crate::error::WebViewError;

/// Page operations a host may invoke while it is being notified.
pub trait PageControl {
    fn load_uri(&mut self, uri: &Url) -> Result<(), WebViewError>;

    fn load_html(&mut self, markup: &str) -> Result<(), WebViewError>;

    fn close_page(&mut self);

    fn is_attached(&self) -> bool;
}

/// Receiver of script-visible page lifecycle.
///
/// Methods take `&self`: the bridge is shared through `Rc` and may be
/// notified re-entrantly, for example when `frame_loaded` closes the page.
pub trait BrowserHost {
    /// A frame finished loading. `page` may be used to navigate again.
    fn frame_loaded(&self, page: &mut dyn PageControl, frame: &LoadedFrame);

    /// A frame is being torn down. Only its identity is still meaningful.
    fn frame_closing(&self, frame: FrameId);

    /// A load accepted while the WebView was unhosted failed when it was
    /// replayed. Loads made while hosted report errors to their caller instead.
    #[allow(unused_variables)]
    fn load_failed(&self, error: &WebViewError) {}
}

pub struct PageHost {
    parent: Rc<dyn BrowserHost>,
    current: Cell<Option<LoadedFrame>>,
}

impl PageHost {
    pub fn new(parent: Rc<dyn BrowserHost>) -> Self {
        Self {
            parent,
            current: Cell::new(None),
        }
    }

    /// The host this page reports to.
    pub fn parent(&self) -> Rc<dyn BrowserHost> {
        Rc::clone(&self.parent)
    }

    pub fn current_frame(&self) -> Option<LoadedFrame> {
        self.current.get()
    }

    pub fn script_context(&self) -> Option<ScriptContext> {
        self.current.get().map(|frame| frame.context)
    }

    pub fn window_object(&self) -> Option<WindowObject> {
        self.current.get().map(|frame| frame.window)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.get().is_some()
    }
}

impl BrowserHost for PageHost {
    fn frame_loaded(&self, page: &mut dyn PageControl, frame: &LoadedFrame) {
        self.current.set(Some(*frame));
        self.parent.frame_loaded(page, frame);
    }

    fn frame_closing(&self, frame: FrameId) {
        match self.current.get() {
            Some(current) if current.frame == frame => self.current.set(None),
            Some(current) => {
                debug!(closing = ?frame, current = ?current.frame, "Non-current frame closing");
            }
            None => {}
        }
        self.parent.frame_closing(frame);
    }

    fn load_failed(&self, error: &WebViewError) {
        self.parent.load_failed(error);
    }
}

impl fmt::Debug for PageHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHost")
            .field("current", &self.current.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Log {
        loaded: RefCell<Vec<FrameId>>,
        closing: RefCell<Vec<FrameId>>,
    }

    impl BrowserHost for Log {
        fn frame_loaded(&self, _page: &mut dyn PageControl, frame: &LoadedFrame) {
            self.loaded.borrow_mut().push(frame.frame);
        }

        fn frame_closing(&self, frame: FrameId) {
            self.closing.borrow_mut().push(frame);
        }
    }

    struct NoPage;

    impl PageControl for NoPage {
        fn load_uri(&mut self, _uri: &Url) -> Result<(), WebViewError> {
            Ok(())
        }

        fn load_html(&mut self, _markup: &str) -> Result<(), WebViewError> {
            Ok(())
        }

        fn close_page(&mut self) {}

        fn is_attached(&self) -> bool {
            false
        }
    }

    fn frame(raw: u64) -> LoadedFrame {
        LoadedFrame {
            context: ScriptContext::from_raw(raw as usize * 10),
            window: WindowObject::from_raw(raw as usize * 100),
            frame: FrameId::from_raw(raw),
        }
    }

    #[test]
    fn test_page_host_tracks_current_frame() {
        let log = Rc::new(Log::default());
        let page = PageHost::new(log.clone());
        assert!(!page.is_loaded());

        page.frame_loaded(&mut NoPage, &frame(1));
        assert_eq!(page.script_context(), Some(ScriptContext::from_raw(10)));
        assert_eq!(page.window_object(), Some(WindowObject::from_raw(100)));

        // A subframe closing leaves the main frame's context alone.
        page.frame_closing(FrameId::from_raw(2));
        assert!(page.is_loaded());

        page.frame_closing(FrameId::from_raw(1));
        assert!(!page.is_loaded());

        assert_eq!(*log.loaded.borrow(), vec![FrameId::from_raw(1)]);
        assert_eq!(
            *log.closing.borrow(),
            vec![FrameId::from_raw(2), FrameId::from_raw(1)]
        );
    }
}
