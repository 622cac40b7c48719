//! Engine configuration: a plain struct with a `Default` impl,
//! constructed with struct-update syntax rather than a builder.

use std::collections::HashMap;
use std::time::Duration;

use vtterm_enc::default_fallback_map;

/// Parameters for [`crate::Engine::start`]. Construct with
/// `EngineConfig::default()` and override fields, or `..Default::default()`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// ESC-disambiguation deadline for the key parser (spec.md §4.4).
    pub key_timeout: Duration,
    /// Forces truecolor on/off regardless of `$COLORTERM`, mirroring
    /// `$TERM_TRUECOLOR` (spec.md §6): `Some(true)`/`Some(false)`
    /// force, `None` defers to `$COLORTERM` detection.
    pub truecolor_override: Option<bool>,
    /// Whether to enable mouse reporting at startup, further gated by
    /// whether the terminfo record has `smcx`/`rmcx`.
    pub mouse_enabled: bool,
    /// Whether to enter the alternate screen on startup.
    pub alternate_screen: bool,
    /// Seed for the rune encoder's fallback map; client-overridable
    /// per pixel set via `Engine::set_rune_fallback`.
    pub rune_fallbacks: HashMap<char, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_timeout: Duration::from_millis(50),
            truecolor_override: None,
            mouse_enabled: true,
            alternate_screen: true,
            rune_fallbacks: default_fallback_map(),
        }
    }
}
