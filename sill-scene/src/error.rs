//! Error types shared across the scene runtime.

use thiserror::Error;

/// Failure modes surfaced by the scene runtime.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A URL value failed to parse.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A class registration table was internally inconsistent.
    #[error("malformed class table: {0}")]
    ClassTable(String),

    /// A member lookup named something the class never registered.
    #[error("unknown member `{0}`")]
    UnknownMember(String),

    /// A property member was invoked through the method path.
    #[error("member `{0}` is a property, not a method")]
    NotAMethod(String),

    /// A method member was invoked through the property path.
    #[error("member `{0}` is a method, not a property")]
    NotAProperty(String),

    /// The loop thread is gone and the command channel is closed.
    #[error("scene loop is not accepting commands")]
    LoopClosed,

    /// `run` was called while the loop was already pumping.
    #[error("scene loop is already running")]
    AlreadyRunning,

    /// The loop has exited; the manager is permanently idle.
    #[error("scene loop has stopped")]
    Stopped,

    /// The scene backend refused an operation.
    #[error("scene backend error: {0}")]
    Backend(String),
}
