//! Input demultiplexing: decodes raw TTY bytes into key and mouse
//! events (spec.md §4.4, §4.5).

#![warn(clippy::pedantic)]

pub mod event;
pub mod keyparser;
pub mod keytable;
pub mod mouseparser;

pub use event::{ButtonMask, Key, KeyEvent, ModifierMask, MouseEvent};
pub use keyparser::{KeyParser, DEFAULT_KEY_TIMEOUT};
pub use keytable::{KeyTable, MatchResult};
pub use mouseparser::MouseParser;
