//! Event translation from baseview
//!
//! Converts baseview events into typed plugin [`Event`]s.

use baseview::{MouseButton as BvMouseButton, MouseEvent, ScrollDelta as BvScrollDelta, WindowEvent};
use dpi::{PhysicalPosition, PhysicalSize};
use keyboard_types::{KeyState, KeyboardEvent, Modifiers};
use vello::kurbo::{Point, Rect, Vec2};

use crate::event::{
    Event, KeyEvent, MouseButton, MouseButtonEvent, MouseMoveEvent, MouseScrollEvent, ScrollDelta,
};

/// Translate a baseview mouse button
pub fn translate_mouse_button(button: BvMouseButton) -> MouseButton {
    match button {
        BvMouseButton::Left => MouseButton::Left,
        BvMouseButton::Right => MouseButton::Right,
        BvMouseButton::Middle => MouseButton::Middle,
        BvMouseButton::Back => MouseButton::Back,
        BvMouseButton::Forward => MouseButton::Forward,
        BvMouseButton::Other(id) => MouseButton::Other(id),
    }
}

/// Event translator that maintains pointer state between events
pub struct EventTranslator {
    pointer: Point,
    modifiers: Modifiers,
    scale_factor: f64,
}

impl EventTranslator {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            pointer: Point::ZERO,
            modifiers: Modifiers::empty(),
            scale_factor,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Translate a baseview event.
    /// Returns None if the event has no plugin counterpart.
    pub fn translate(&mut self, event: &baseview::Event) -> Option<Event<'static>> {
        match event {
            baseview::Event::Mouse(mouse) => self.translate_mouse(mouse),
            baseview::Event::Keyboard(kb) => self.translate_keyboard(kb),
            baseview::Event::Window(win) => self.translate_window(win),
        }
    }

    fn button_event(&self, button: BvMouseButton) -> MouseButtonEvent {
        MouseButtonEvent {
            button: translate_mouse_button(button),
            position: self.pointer,
            modifiers: self.modifiers,
        }
    }

    fn translate_mouse(&mut self, event: &MouseEvent) -> Option<Event<'static>> {
        match event {
            MouseEvent::CursorMoved {
                position,
                modifiers,
            } => {
                let logical = PhysicalPosition::new(position.x, position.y)
                    .to_logical::<f64>(self.scale_factor);
                self.pointer = Point::new(logical.x, logical.y);
                self.modifiers = *modifiers;
                Some(Event::MouseMove(MouseMoveEvent {
                    position: self.pointer,
                    modifiers: self.modifiers,
                }))
            }

            MouseEvent::ButtonPressed { button, modifiers } => {
                self.modifiers = *modifiers;
                Some(Event::MouseDown(self.button_event(*button)))
            }

            MouseEvent::ButtonReleased { button, modifiers } => {
                self.modifiers = *modifiers;
                Some(Event::MouseUp(self.button_event(*button)))
            }

            MouseEvent::WheelScrolled { delta, modifiers } => {
                self.modifiers = *modifiers;
                let delta = match delta {
                    BvScrollDelta::Lines { x, y } => {
                        ScrollDelta::Lines(Vec2::new(f64::from(*x), f64::from(*y)))
                    }
                    BvScrollDelta::Pixels { x, y } => {
                        ScrollDelta::Pixels(Vec2::new(f64::from(*x), f64::from(*y)))
                    }
                };
                Some(Event::MouseScroll(MouseScrollEvent {
                    position: self.pointer,
                    delta,
                    modifiers: self.modifiers,
                }))
            }

            MouseEvent::CursorEntered => Some(Event::MouseEntered),
            MouseEvent::CursorLeft => Some(Event::MouseExited),

            _ => None, // Drag and drop is not forwarded
        }
    }

    fn translate_keyboard(&mut self, event: &KeyboardEvent) -> Option<Event<'static>> {
        self.modifiers = event.modifiers;
        let key = KeyEvent::from(event);
        Some(match event.state {
            KeyState::Down => Event::KeyDown(key),
            KeyState::Up => Event::KeyUp(key),
        })
    }

    fn translate_window(&mut self, event: &WindowEvent) -> Option<Event<'static>> {
        match event {
            WindowEvent::Resized(info) => {
                self.scale_factor = info.scale();
                let physical = info.physical_size();
                Some(Event::Resized(logical_bounds(
                    physical.width,
                    physical.height,
                    self.scale_factor,
                )))
            }
            WindowEvent::Focused => Some(Event::FocusChanged(true)),
            WindowEvent::Unfocused => Some(Event::FocusChanged(false)),
            WindowEvent::WillClose => Some(Event::Detached),
        }
    }
}

/// Window bounds at the origin, in logical units.
pub fn logical_bounds(width: u32, height: u32, scale_factor: f64) -> Rect {
    let logical = PhysicalSize::new(width, height).to_logical::<f64>(scale_factor);
    Rect::new(0.0, 0.0, logical.width, logical.height)
}
