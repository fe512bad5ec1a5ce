//! Convenience re-exports.

pub use crate::backend::{AudioBackend, RenderCallback, StreamSpec};
#[cfg(feature = "cpal")]
pub use crate::cpal_backend::CpalBackend;
pub use crate::error::{StreamError, StreamResult};
pub use crate::mute::{StagnationTracker, mute_decision};
pub use crate::null_backend::NullBackend;
pub use crate::render::{CallbackLink, RenderEngine};
pub use crate::supervisor::{
    CALLBACK_TIMEOUT, SessionState, StreamSupervisor, SupervisorHandle, SupervisorStatus,
    WAKE_WINDOW,
};
