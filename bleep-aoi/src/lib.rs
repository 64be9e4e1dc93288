//! Cross-subsystem Asset-of-Interest security heuristics: reads a device's persisted GATT
//! and classic service data back out of [`bleep_store::Store`] and derives a [`AoiReport`]
//! of [`SecurityFinding`]s. Report *writing* lives here; rendering a report into markdown or
//! HTML is out of scope.

mod analyze;
mod error;
mod types;

pub use analyze::{analyze_device, write_snapshot};
pub use error::AoiError;
pub use types::{AoiReport, AoiThresholds, SecurityFinding};
