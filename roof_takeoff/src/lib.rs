//! Core library for the Roof Takeoff application.
//!
//! Loads a vendor roof measurement export, rebuilds each roof face as a planar
//! polygon and keeps a slope-corrected measurement summary in step with the
//! faces an operator selects.

pub mod config;
pub mod error;
pub mod geometry;
pub mod host;
pub mod io;
pub mod measurement;
pub mod model;
pub mod polygon;
pub mod render;
pub mod selection;
pub mod styles;
pub mod view;

pub use config::{InitialSelection, ViewerConfig};
pub use error::{ConfigError, ParseError};
pub use model::{Face, LineType, ReportModel, RoofLine, RoofPoint};
pub use selection::{SelectionController, Session};
pub use view::ViewTransform;
