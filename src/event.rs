//! Typed plugin events
//!
//! Every occurrence a platform window can report is one variant of [`Event`].
//! Events are built by a platform adapter, borrowed by [`crate::sink::dispatch`]
//! for exactly one call and then dropped.

use std::fmt;

use bitflags::bitflags;
use keyboard_types::{Code, Key, KeyboardEvent, Location, Modifiers};
use vello::kurbo::{Point, Rect, Vec2};
use vello::Scene;

/// A mouse button as reported by the platform window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u8),
}

bitflags! {
    /// Buttons currently held down.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
        const BACK = 1 << 3;
        const FORWARD = 1 << 4;
        const OTHER = 1 << 5;
    }
}

impl MouseButton {
    /// The bit this button occupies in [`MouseButtons`].
    pub fn mask(self) -> MouseButtons {
        match self {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Right => MouseButtons::RIGHT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::Back => MouseButtons::BACK,
            MouseButton::Forward => MouseButtons::FORWARD,
            MouseButton::Other(_) => MouseButtons::OTHER,
        }
    }
}

/// Button press or release at a position in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub position: Point,
    pub modifiers: Modifiers,
}

/// Pointer motion to a position in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMoveEvent {
    pub position: Point,
    pub modifiers: Modifiers,
}

/// Wheel or trackpad scroll amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollDelta {
    Lines(Vec2),
    Pixels(Vec2),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseScrollEvent {
    pub position: Point,
    pub delta: ScrollDelta,
    pub modifiers: Modifiers,
}

/// A key transition. Whether it is a press or a release is carried by the
/// [`Event`] variant, not by the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub code: Code,
    pub location: Location,
    pub modifiers: Modifiers,
    pub repeat: bool,
}

impl From<&KeyboardEvent> for KeyEvent {
    fn from(event: &KeyboardEvent) -> Self {
        Self {
            key: event.key.clone(),
            code: event.code,
            location: event.location,
            modifiers: event.modifiers,
            repeat: event.repeat,
        }
    }
}

/// A paint request from the host.
///
/// `rect` is the target rectangle in `surface` coordinates. `flipped` is set
/// when the surface's y axis points up (origin at the bottom-left corner), in
/// which case the top-left-origin output of the rendering engine is mirrored
/// vertically while being placed.
pub struct DrawRequest<'a> {
    pub surface: &'a mut Scene,
    pub rect: Rect,
    pub flipped: bool,
}

impl fmt::Debug for DrawRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawRequest")
            .field("rect", &self.rect)
            .field("flipped", &self.flipped)
            .finish_non_exhaustive()
    }
}

/// One input or lifecycle occurrence reported by a platform window.
#[derive(Debug)]
pub enum Event<'a> {
    MouseDown(MouseButtonEvent),
    MouseUp(MouseButtonEvent),
    MouseMove(MouseMoveEvent),
    MouseScroll(MouseScrollEvent),
    MouseEntered,
    MouseExited,
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    /// `true` when the platform window gained focus.
    FocusChanged(bool),
    Attached,
    Detached,
    /// New bounds of the platform window.
    Resized(Rect),
    DrawRequest(DrawRequest<'a>),
}

/// Payload-free tag of an [`Event`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseDown,
    MouseUp,
    MouseMove,
    MouseScroll,
    MouseEntered,
    MouseExited,
    KeyDown,
    KeyUp,
    FocusChanged,
    Attached,
    Detached,
    Resized,
    DrawRequest,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MouseDown(_) => EventKind::MouseDown,
            Event::MouseUp(_) => EventKind::MouseUp,
            Event::MouseMove(_) => EventKind::MouseMove,
            Event::MouseScroll(_) => EventKind::MouseScroll,
            Event::MouseEntered => EventKind::MouseEntered,
            Event::MouseExited => EventKind::MouseExited,
            Event::KeyDown(_) => EventKind::KeyDown,
            Event::KeyUp(_) => EventKind::KeyUp,
            Event::FocusChanged(_) => EventKind::FocusChanged,
            Event::Attached => EventKind::Attached,
            Event::Detached => EventKind::Detached,
            Event::Resized(_) => EventKind::Resized,
            Event::DrawRequest(_) => EventKind::DrawRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyboard_types::KeyState;

    #[test]
    fn test_button_masks_are_distinct() {
        let all = [
            MouseButton::Left,
            MouseButton::Right,
            MouseButton::Middle,
            MouseButton::Back,
            MouseButton::Forward,
            MouseButton::Other(7),
        ];
        let mut seen = MouseButtons::empty();
        for button in all {
            assert!(!seen.intersects(button.mask()), "{button:?} overlaps");
            seen |= button.mask();
        }
        assert_eq!(seen, MouseButtons::all());
    }

    #[test]
    fn test_key_event_from_keyboard_event() {
        let kb = KeyboardEvent {
            state: KeyState::Down,
            key: Key::Character("a".into()),
            code: Code::KeyA,
            location: Location::Standard,
            modifiers: Modifiers::SHIFT,
            repeat: true,
            is_composing: false,
        };
        let key = KeyEvent::from(&kb);
        assert_eq!(key.key, Key::Character("a".into()));
        assert_eq!(key.code, Code::KeyA);
        assert_eq!(key.modifiers, Modifiers::SHIFT);
        assert!(key.repeat);
    }

    #[test]
    fn test_event_kind() {
        let mut scene = Scene::new();
        let draw = Event::DrawRequest(DrawRequest {
            surface: &mut scene,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            flipped: false,
        });
        assert_eq!(draw.kind(), EventKind::DrawRequest);
        assert_eq!(Event::FocusChanged(true).kind(), EventKind::FocusChanged);
        assert_eq!(
            Event::Resized(Rect::new(0.0, 0.0, 1.0, 1.0)).kind(),
            EventKind::Resized
        );
    }
}
