/// Native protocol types
///
/// Handles, atoms, geometry, event records and the window manager hint
/// encodings shared by every backend.

pub mod atoms;
pub mod events;
pub mod hints;
pub mod types;

pub use atoms::*;
pub use events::*;
pub use hints::*;
pub use types::*;
