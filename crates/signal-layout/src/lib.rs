//! Signal Layout and Calibration
//!
//! Turns the declared output signals of an acquisition into a fixed byte
//! layout, validated once against the board geometry, and provides the
//! calibration table and the output batch buffer that layout describes.

mod batch;
mod calibration;
mod error;
mod layout;
mod signal;

pub use batch::OutputBatch;
pub use calibration::{Calibration, CalibrationConfig, CalibrationEntry};
pub use error::ConfigurationError;
pub use layout::{LayoutBuilder, OutputLayout};
pub use signal::{ElementType, SignalDeclaration, SignalDescriptor, SignalKind, SignalSource};
