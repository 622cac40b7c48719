//! Platform TTY layer: open `/dev/tty`, switch to raw mode, read
//! window dimensions (spec.md §4.7 step 1-4, §2 "Platform TTY").

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

use nix::sys::termios::{self, LocalFlags, InputFlags, OutputFlags, ControlFlags, SetArg, Termios};
use vtterm_info::Size;

use crate::error::EngineError;

nix::ioctl_read_bad!(tiocgwinsz, nix::libc::TIOCGWINSZ, nix::libc::winsize);

/// An open `/dev/tty` plus its original termios, restored on drop
/// (spec.md §4.7 teardown step 3).
pub struct Tty {
    file: File,
    original: Termios,
}

impl Tty {
    /// Open `/dev/tty` for read+write and install a raw-mode termios
    /// (spec.md §4.7 step 2): clears `IGNBRK|BRKINT|PARMRK|ISTRIP|
    /// INLCR|IGNCR|ICRNL|IXON|OPOST|ECHO|ECHONL|ICANON|ISIG|IEXTEN|
    /// CSIZE|PARENB`, sets `CS8`, `VMIN=1`, `VTIME=0`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoTty`] if the device cannot be opened;
    /// [`EngineError::Termios`] if termios get/set fails.
    pub fn open() -> Result<Self, EngineError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .map_err(EngineError::NoTty)?;

        let original = termios::tcgetattr(&file)?;
        let mut raw = original.clone();

        raw.input_flags &= !(InputFlags::IGNBRK
            | InputFlags::BRKINT
            | InputFlags::PARMRK
            | InputFlags::ISTRIP
            | InputFlags::INLCR
            | InputFlags::IGNCR
            | InputFlags::ICRNL
            | InputFlags::IXON);
        raw.output_flags &= !OutputFlags::OPOST;
        raw.local_flags &= !(LocalFlags::ECHO
            | LocalFlags::ECHONL
            | LocalFlags::ICANON
            | LocalFlags::ISIG
            | LocalFlags::IEXTEN);
        raw.control_flags &= !(ControlFlags::CSIZE | ControlFlags::PARENB);
        raw.control_flags |= ControlFlags::CS8;
        raw.control_chars[termios::SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[termios::SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(&file, SetArg::TCSANOW, &raw)?;

        Ok(Self { file, original })
    }

    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Restore the original termios captured at [`Tty::open`]
    /// (spec.md §4.7 teardown step 3).
    ///
    /// # Errors
    ///
    /// [`EngineError::Termios`] if restoring fails.
    pub fn restore(&self) -> Result<(), EngineError> {
        termios::tcsetattr(&self.file, SetArg::TCSANOW, &self.original)?;
        Ok(())
    }

    /// Read the current window size via `TIOCGWINSZ`, falling back to
    /// `$COLUMNS`/`$LINES`, then `default` (spec.md §4.7 step 4, §6).
    #[must_use]
    pub fn window_size(&self, default: Size) -> Size {
        let mut ws: nix::libc::winsize = unsafe { std::mem::zeroed() };
        let ioctl_ok = unsafe { tiocgwinsz(self.file.as_raw_fd(), &mut ws) }.is_ok();
        if ioctl_ok && ws.ws_col > 0 && ws.ws_row > 0 {
            return Size::new(ws.ws_col, ws.ws_row);
        }

        let env_columns = std::env::var("COLUMNS").ok().and_then(|v| v.parse().ok());
        let env_lines = std::env::var("LINES").ok().and_then(|v| v.parse().ok());
        match (env_columns, env_lines) {
            (Some(columns), Some(lines)) => Size::new(columns, lines),
            _ => default,
        }
    }
}

/// Detect the host charset from the POSIX locale variables, per
/// spec.md §6: `LC_ALL`, `LC_CTYPE`, `LANG` in that precedence order;
/// extract the suffix after `.`, strip `@variant`; `POSIX`/`C` map to
/// `US-ASCII`; absence maps to `UTF-8`.
#[must_use]
pub fn detect_charset() -> String {
    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok());

    let Some(locale) = locale else {
        return "UTF-8".to_string();
    };

    if locale == "POSIX" || locale == "C" {
        return "US-ASCII".to_string();
    }

    let after_dot = locale.split('.').nth(1).unwrap_or(&locale);
    let stripped = after_dot.split('@').next().unwrap_or(after_dot);
    if stripped.is_empty() {
        "UTF-8".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests mutate process-wide environment state; `cargo test`
    // runs them on separate threads by default, so they are written
    // to only ever set the variable they read, immediately assert,
    // and clean up, rather than relying on test isolation.

    #[test]
    fn detect_charset_maps_posix_to_us_ascii() {
        unsafe { std::env::set_var("LC_ALL", "POSIX") };
        assert_eq!(detect_charset(), "US-ASCII");
        unsafe { std::env::remove_var("LC_ALL") };
    }

    #[test]
    fn detect_charset_extracts_suffix_after_dot() {
        unsafe { std::env::set_var("LC_ALL", "en_US.UTF-8") };
        assert_eq!(detect_charset(), "UTF-8");
        unsafe { std::env::remove_var("LC_ALL") };
    }

    #[test]
    fn detect_charset_strips_variant_suffix() {
        unsafe { std::env::set_var("LC_ALL", "de_DE.ISO-8859-15@euro") };
        assert_eq!(detect_charset(), "ISO-8859-15");
        unsafe { std::env::remove_var("LC_ALL") };
    }

    #[test]
    fn raw_mode_round_trips_on_a_pty() {
        use nix::pty::openpty;

        let pty = openpty(None, None).expect("openpty");
        let original = termios::tcgetattr(&pty.slave).expect("tcgetattr");

        let mut raw = original.clone();
        raw.local_flags &= !LocalFlags::ECHO;
        termios::tcsetattr(&pty.slave, SetArg::TCSANOW, &raw).expect("tcsetattr raw");
        let applied = termios::tcgetattr(&pty.slave).expect("tcgetattr after raw");
        assert!(!applied.local_flags.contains(LocalFlags::ECHO));

        termios::tcsetattr(&pty.slave, SetArg::TCSANOW, &original).expect("tcsetattr restore");
        let restored = termios::tcgetattr(&pty.slave).expect("tcgetattr after restore");
        assert_eq!(restored.local_flags, original.local_flags);
    }
}
