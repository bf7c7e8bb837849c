//! Window core errors

use crate::window::WindowId;
use std::error::Error as StdError;
use std::fmt;

/// Which native window of the frame/client pair failed to be created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStage {
    Frame,
    Client,
}

impl fmt::Display for CreateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateStage::Frame => write!(f, "frame"),
            CreateStage::Client => write!(f, "client"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// A display call failed
    Backend(Box<dyn StdError + Send + Sync>),
    /// Native window creation returned a null handle
    CreateFailed { stage: CreateStage },
    /// No window is registered under this id
    UnknownWindow(WindowId),
    /// The window has no native handles (never created, or destroyed)
    NotCreated,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Backend(e) => write!(f, "display error: {}", e),
            Error::CreateFailed { stage } => {
                write!(f, "could not create X11 {} window", stage)
            }
            Error::UnknownWindow(id) => write!(f, "unknown window {}", id),
            Error::NotCreated => write!(f, "window has no native handle"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<Box<dyn StdError + Send + Sync>> for Error {
    fn from(e: Box<dyn StdError + Send + Sync>) -> Self {
        Error::Backend(e)
    }
}
