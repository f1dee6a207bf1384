//! Error types

use thiserror::Error;

/// Errors reported by a rendering engine implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine failed to initialize: {0}")]
    Init(String),

    #[error("Failed to load document: {0}")]
    Load(String),

    #[error("Render error: {0}")]
    Render(String),
}

/// Errors returned to the embedding plugin by the WebView controller.
#[derive(Error, Debug)]
pub enum WebViewError {
    #[error("Rendering engine is not available")]
    EngineUnavailable,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Cannot open a popup while attached to a platform window")]
    PopupWhileAttached,

    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),
}

/// Errors from putting composed frames on a window's GPU surface.
#[derive(Error, Debug)]
pub enum PresentError {
    #[error("Window has no native handle to present to")]
    NoWindowHandle,

    #[error("Unsupported window handle: {0}")]
    UnsupportedHandle(&'static str),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Renderer error: {0}")]
    Renderer(String),
}
