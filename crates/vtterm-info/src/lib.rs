#![warn(clippy::pedantic)]

//! Terminfo capability model, the parameterized-string evaluator, and
//! the core color/style/position/size value types shared by the rest
//! of the `vtterm` crates.

pub mod color;
pub mod error;
pub mod eval;
pub mod position;
pub mod size;
pub mod style;
pub mod terminfo;

pub use color::Color;
pub use error::TerminfoError;
pub use eval::{strip_padding, Evaluator};
pub use position::{Position, CANCEL_HASH};
pub use size::Size;
pub use style::{AttributeMask, Style};
pub use terminfo::{Terminfo, TerminfoRegistry};
