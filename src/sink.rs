//! Event sink and dispatch
//!
//! [`EventSink`] is the per-type handler table: one method per [`Event`]
//! variant, generic over the window type the handler expects events from.
//! Methods a sink does not override report [`EventStatus::Ignored`] and do
//! nothing. [`dispatch`] routes an event through a single exhaustive match, so
//! a new variant does not compile until it has a handler slot.

use tracing::trace;
use vello::kurbo::Rect;

use crate::event::{
    DrawRequest, Event, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseScrollEvent,
};
use crate::window::PlatformWindow;

/// Whether a handler consumed an event.
///
/// Adapters use this to decide whether the platform should still process the
/// event natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Captured,
    Ignored,
}

impl EventStatus {
    pub fn is_consumed(self) -> bool {
        self == EventStatus::Captured
    }
}

impl From<bool> for EventStatus {
    fn from(consumed: bool) -> Self {
        if consumed {
            EventStatus::Captured
        } else {
            EventStatus::Ignored
        }
    }
}

#[allow(unused_variables)]
pub trait EventSink<W: PlatformWindow + ?Sized> {
    fn on_mouse_down(&mut self, event: &MouseButtonEvent, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_mouse_up(&mut self, event: &MouseButtonEvent, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_mouse_move(&mut self, event: &MouseMoveEvent, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_mouse_scroll(&mut self, event: &MouseScrollEvent, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_mouse_entered(&mut self, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_mouse_exited(&mut self, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_key_down(&mut self, event: &KeyEvent, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_key_up(&mut self, event: &KeyEvent, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_focus_changed(&mut self, focused: bool, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_window_attached(&mut self, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_window_detached(&mut self, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_window_resized(&mut self, bounds: Rect, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }

    fn on_draw(&mut self, request: DrawRequest<'_>, window: &mut W) -> EventStatus {
        EventStatus::Ignored
    }
}

/// Deliver one event from `window` to `sink`.
pub fn dispatch<S, W>(sink: &mut S, event: Event<'_>, window: &mut W) -> EventStatus
where
    S: EventSink<W> + ?Sized,
    W: PlatformWindow + ?Sized,
{
    let kind = event.kind();
    let status = match event {
        Event::MouseDown(ev) => sink.on_mouse_down(&ev, window),
        Event::MouseUp(ev) => sink.on_mouse_up(&ev, window),
        Event::MouseMove(ev) => sink.on_mouse_move(&ev, window),
        Event::MouseScroll(ev) => sink.on_mouse_scroll(&ev, window),
        Event::MouseEntered => sink.on_mouse_entered(window),
        Event::MouseExited => sink.on_mouse_exited(window),
        Event::KeyDown(ev) => sink.on_key_down(&ev, window),
        Event::KeyUp(ev) => sink.on_key_up(&ev, window),
        Event::FocusChanged(focused) => sink.on_focus_changed(focused, window),
        Event::Attached => sink.on_window_attached(window),
        Event::Detached => sink.on_window_detached(window),
        Event::Resized(bounds) => sink.on_window_resized(bounds, window),
        Event::DrawRequest(request) => sink.on_draw(request, window),
    };
    trace!(?kind, window = ?window.id(), consumed = status.is_consumed(), "dispatched");
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, MouseButton};
    use crate::window::WindowId;
    use keyboard_types::{Code, Key, Location, Modifiers};
    use raw_window_handle::RawWindowHandle;
    use vello::kurbo::Point;
    use vello::Scene;

    struct TestWindow {
        id: WindowId,
    }

    impl PlatformWindow for TestWindow {
        fn id(&self) -> WindowId {
            self.id
        }

        fn bounds(&self) -> Rect {
            Rect::new(0.0, 0.0, 100.0, 100.0)
        }

        fn is_visible(&self) -> bool {
            true
        }

        fn raw_window_handle(&self) -> Option<RawWindowHandle> {
            None
        }
    }

    /// Registers every variant and records which handler ran.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<EventKind>,
    }

    impl<W: PlatformWindow + ?Sized> EventSink<W> for Recorder {
        fn on_mouse_down(&mut self, _: &MouseButtonEvent, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::MouseDown);
            EventStatus::Captured
        }
        fn on_mouse_up(&mut self, _: &MouseButtonEvent, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::MouseUp);
            EventStatus::Captured
        }
        fn on_mouse_move(&mut self, _: &MouseMoveEvent, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::MouseMove);
            EventStatus::Captured
        }
        fn on_mouse_scroll(&mut self, _: &MouseScrollEvent, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::MouseScroll);
            EventStatus::Captured
        }
        fn on_mouse_entered(&mut self, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::MouseEntered);
            EventStatus::Captured
        }
        fn on_mouse_exited(&mut self, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::MouseExited);
            EventStatus::Captured
        }
        fn on_key_down(&mut self, _: &KeyEvent, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::KeyDown);
            EventStatus::Captured
        }
        fn on_key_up(&mut self, _: &KeyEvent, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::KeyUp);
            EventStatus::Captured
        }
        fn on_focus_changed(&mut self, _: bool, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::FocusChanged);
            EventStatus::Captured
        }
        fn on_window_attached(&mut self, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::Attached);
            EventStatus::Captured
        }
        fn on_window_detached(&mut self, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::Detached);
            EventStatus::Captured
        }
        fn on_window_resized(&mut self, _: Rect, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::Resized);
            EventStatus::Captured
        }
        fn on_draw(&mut self, _: DrawRequest<'_>, _: &mut W) -> EventStatus {
            self.calls.push(EventKind::DrawRequest);
            EventStatus::Captured
        }
    }

    /// Only cares about key presses.
    #[derive(Default)]
    struct KeysOnly {
        presses: usize,
    }

    impl EventSink<TestWindow> for KeysOnly {
        fn on_key_down(&mut self, _: &KeyEvent, _: &mut TestWindow) -> EventStatus {
            self.presses += 1;
            EventStatus::Captured
        }
    }

    fn key() -> KeyEvent {
        KeyEvent {
            key: Key::Enter,
            code: Code::Enter,
            location: Location::Standard,
            modifiers: Modifiers::empty(),
            repeat: false,
        }
    }

    fn press() -> MouseButtonEvent {
        MouseButtonEvent {
            button: MouseButton::Left,
            position: Point::new(1.0, 2.0),
            modifiers: Modifiers::empty(),
        }
    }

    #[test]
    fn test_every_variant_reaches_exactly_one_handler() {
        let mut window = TestWindow { id: WindowId::new() };
        let mut sink = Recorder::default();
        let mut scene = Scene::new();

        let events = vec![
            Event::MouseDown(press()),
            Event::MouseUp(press()),
            Event::MouseMove(MouseMoveEvent {
                position: Point::ZERO,
                modifiers: Modifiers::empty(),
            }),
            Event::MouseScroll(MouseScrollEvent {
                position: Point::ZERO,
                delta: crate::event::ScrollDelta::Lines(vello::kurbo::Vec2::new(0.0, 1.0)),
                modifiers: Modifiers::empty(),
            }),
            Event::MouseEntered,
            Event::MouseExited,
            Event::KeyDown(key()),
            Event::KeyUp(key()),
            Event::FocusChanged(true),
            Event::Attached,
            Event::Detached,
            Event::Resized(Rect::new(0.0, 0.0, 5.0, 5.0)),
            Event::DrawRequest(DrawRequest {
                surface: &mut scene,
                rect: Rect::new(0.0, 0.0, 5.0, 5.0),
                flipped: false,
            }),
        ];

        let kinds: Vec<EventKind> = events.iter().map(|event| event.kind()).collect();
        for event in events {
            assert_eq!(dispatch(&mut sink, event, &mut window), EventStatus::Captured);
        }
        assert_eq!(sink.calls, kinds);
    }

    #[test]
    fn test_unregistered_variant_is_ignored() {
        let mut window = TestWindow { id: WindowId::new() };
        let mut sink = KeysOnly::default();

        assert_eq!(
            dispatch(&mut sink, Event::MouseDown(press()), &mut window),
            EventStatus::Ignored
        );
        assert_eq!(
            dispatch(&mut sink, Event::KeyUp(key()), &mut window),
            EventStatus::Ignored
        );
        assert_eq!(
            dispatch(&mut sink, Event::Attached, &mut window),
            EventStatus::Ignored
        );
        assert_eq!(sink.presses, 0);

        assert_eq!(
            dispatch(&mut sink, Event::KeyDown(key()), &mut window),
            EventStatus::Captured
        );
        assert_eq!(sink.presses, 1);
    }

    #[test]
    fn test_dispatch_through_trait_object_window() {
        let mut window = TestWindow { id: WindowId::new() };
        let window: &mut dyn PlatformWindow = &mut window;
        let mut sink = Recorder::default();

        let status = dispatch(&mut sink, Event::FocusChanged(false), window);
        assert!(status.is_consumed());
        assert_eq!(sink.calls, vec![EventKind::FocusChanged]);
    }

    #[test]
    fn test_status_from_bool() {
        assert_eq!(EventStatus::from(true), EventStatus::Captured);
        assert_eq!(EventStatus::from(false), EventStatus::Ignored);
        assert!(!EventStatus::Ignored.is_consumed());
    }
}
