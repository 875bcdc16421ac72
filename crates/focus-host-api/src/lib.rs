//! Host side-effect interfaces for focusd
//!
//! The scheduling driver reaches the desktop only through these traits:
//! named wake-timers, the badge indicator, notifications and the audio player
//! window. Platform code lives in `focus-host-linux`; [`MockHost`] records
//! every call for tests.

mod handle;
mod mock;
mod traits;

pub use handle::*;
pub use mock::*;
pub use traits::*;
