//! Conform Timeline Model
//!
//! The application-neutral timeline tree Conform transcribes into and out
//! of:
//! - **Time:** exact rational time (`Fraction`, `RationalTime`, `TimeRange`)
//! - **Structure:** `Timeline` → `Track` → `Item` (clip, gap, transition,
//!   nested stack)
//! - **Markers:** named, colored points of interest on tracks and items
//!
//! All durations within one track share a single rational rate; mixed-rate
//! content is re-based at track boundaries by the transcription engine.

pub mod item;
pub mod marker;
pub mod time;
pub mod timeline;

pub use item::*;
pub use marker::*;
pub use time::*;
pub use timeline::*;
