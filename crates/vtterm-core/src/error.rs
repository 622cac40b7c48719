use std::fmt;

use vtterm_enc::CharsetError;
use vtterm_info::TerminfoError;

/// Fatal-at-construction / fatal-at-`start` errors (spec.md §7
/// "No-screen", "Unknown terminal", "No-charset").
#[derive(Debug)]
pub enum EngineError {
    /// `/dev/tty` could not be opened or its termios state could not
    /// be queried or set.
    NoTty(std::io::Error),
    /// A `nix` call (termios get/set, ioctl) failed.
    Termios(nix::Error),
    UnknownTerminal(TerminfoError),
    NoCharset(CharsetError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoTty(e) => write!(f, "cannot open /dev/tty: {e}"),
            EngineError::Termios(e) => write!(f, "termios configuration failed: {e}"),
            EngineError::UnknownTerminal(e) => write!(f, "{e}"),
            EngineError::NoCharset(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::NoTty(e) => Some(e),
            EngineError::Termios(e) => Some(e),
            EngineError::UnknownTerminal(e) => Some(e),
            EngineError::NoCharset(e) => Some(e),
        }
    }
}

impl From<TerminfoError> for EngineError {
    fn from(e: TerminfoError) -> Self {
        EngineError::UnknownTerminal(e)
    }
}

impl From<CharsetError> for EngineError {
    fn from(e: CharsetError) -> Self {
        EngineError::NoCharset(e)
    }
}

impl From<nix::Error> for EngineError {
    fn from(e: nix::Error) -> Self {
        EngineError::Termios(e)
    }
}
