use std::fmt;

/// Fatal-at-construction errors for terminfo resolution (spec.md §7).
#[derive(Debug)]
pub enum TerminfoError {
    UnknownTerminal(String),
    MissingCapability(&'static str),
    NoColorCapability,
}

impl fmt::Display for TerminfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminfoError::UnknownTerminal(term) => {
                write!(f, "unknown terminal: {term}")
            }
            TerminfoError::MissingCapability(cap) => {
                write!(f, "missing required capability: {cap}")
            }
            TerminfoError::NoColorCapability => {
                write!(f, "terminal declares colors but lacks setaf/setab")
            }
        }
    }
}

impl std::error::Error for TerminfoError {}
