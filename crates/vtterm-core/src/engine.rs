//! The public engine facade, lifecycle fabric, and cell rendering
//! routine (spec.md §4.6, §4.7, §6).

use std::io::Write;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vtterm_cmd::Commander;
use vtterm_enc::RuneEncoder;
use vtterm_info::{AttributeMask, Color, Position, Size, Style, TerminfoError, TerminfoRegistry};
use vtterm_input::{KeyEvent, MouseEvent};

use crate::config::EngineConfig;
use crate::demux::Demux;
use crate::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::pixel::Pixel;
use crate::tty::{self, Tty};

/// Dispatched whenever the window size changes (spec.md §4.7 step 9,
/// §6 `resize_dispatcher`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub size: Size,
}

struct DrawState {
    size: Size,
    cursor: Option<Position>,
    last_style: Style,
}

struct EngineInner {
    commander: Commander,
    encoder: StdMutex<RuneEncoder>,
    draw_state: StdMutex<DrawState>,
    writer: StdMutex<std::fs::File>,
    pixels: StdMutex<Vec<Pixel>>,
    activation: StdMutex<Option<CancellationToken>>,
    lifecycle: CancellationToken,
    tty: Tty,
    resize: Arc<Dispatcher<ResizeEvent>>,
    keys: Arc<Dispatcher<KeyEvent>>,
    mouse: Arc<Dispatcher<MouseEvent>>,
    death_tx: watch::Sender<bool>,
    death_rx: watch::Receiver<bool>,
}

/// The terminal UI engine core (spec.md §6 "Public engine surface").
///
/// `Engine` is a cheap `Arc`-backed handle; cloning it shares the same
/// underlying TTY, caches, and dispatchers.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Open the TTY, enter raw mode, and spawn the input/resize/
    /// teardown tasks (spec.md §4.7 "Startup"). Becomes the teardown
    /// anchor: dropping the returned [`Engine`] does not tear down by
    /// itself, [`Engine::shutdown`] does.
    ///
    /// # Errors
    ///
    /// Per spec.md §7: fatal at construction/start if `$TERM` is
    /// unknown, `/dev/tty` cannot be opened, termios cannot be
    /// configured, or the detected charset has no transcoder.
    pub async fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let term = std::env::var("TERM").unwrap_or_else(|_| "xterm".to_string());
        let colorterm = std::env::var("COLORTERM").ok();
        let truecolor_override = config.truecolor_override.or_else(|| {
            std::env::var("TERM_TRUECOLOR")
                .ok()
                .map(|v| v != "disable")
        });

        let registry = TerminfoRegistry::with_defaults();
        let mut terminfo = registry
            .lookup_or_warn(&term, colorterm.as_deref())
            .ok_or_else(|| EngineError::from(TerminfoError::UnknownTerminal(term.clone())))?;
        if truecolor_override == Some(true) && !terminfo.has("setrgbf") {
            terminfo = terminfo.with_truecolor();
        }

        let charset = tty::detect_charset();
        let acsc = terminfo.get("acsc").unwrap_or("");
        let mut encoder = RuneEncoder::new(&charset, acsc, b"\x1b(0", b"\x1b(B")?;
        for (rune, replacement) in &config.rune_fallbacks {
            encoder.set_rune_fallback(*rune, replacement.clone());
        }

        let tty = Tty::open()?;
        let default_size = Size::new(terminfo.columns, terminfo.lines);
        let size = tty.window_size(default_size);

        let commander = Commander::new(terminfo.clone());
        commander.build_goto_cache(size);

        let writer = tty.file().try_clone().map_err(EngineError::NoTty)?;
        let reader = tty.file().try_clone().map_err(EngineError::NoTty)?;

        let lifecycle = CancellationToken::new();
        let (death_tx, death_rx) = watch::channel(false);

        let inner = Arc::new(EngineInner {
            commander,
            encoder: StdMutex::new(encoder),
            draw_state: StdMutex::new(DrawState {
                size,
                cursor: None,
                last_style: Style::invalid(),
            }),
            writer: StdMutex::new(writer),
            pixels: StdMutex::new(Vec::new()),
            activation: StdMutex::new(None),
            lifecycle: lifecycle.clone(),
            tty,
            resize: Arc::new(Dispatcher::new()),
            keys: Arc::new(Dispatcher::new()),
            mouse: Arc::new(Dispatcher::new()),
            death_tx,
            death_rx,
        });

        {
            let mut w = inner.writer.lock().unwrap();
            if config.alternate_screen {
                let _ = inner.commander.put_enter_alternate_screen(&mut *w);
            }
            let _ = inner.commander.put_enter_keypad(&mut *w);
            let _ = inner.commander.put_hide_cursor(&mut *w);
            let _ = inner.commander.put_clear(&mut *w);
            if config.mouse_enabled {
                let _ = inner.commander.put_enable_mouse(&mut *w);
            }
            let _ = w.flush();
        }

        let (size_tx, size_rx) = watch::channel(size);
        spawn_input_task(Arc::clone(&inner), reader, terminfo.clone(), config.key_timeout, size_rx);
        spawn_resize_task(Arc::clone(&inner), default_size, size_tx);
        spawn_teardown_task(Arc::clone(&inner));

        inner.resize.dispatch(ResizeEvent { size }).await;

        Ok(Self { inner })
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.inner.size()
    }

    #[must_use]
    pub fn num_colors(&self) -> u32 {
        self.inner.commander.num_colors()
    }

    #[must_use]
    pub fn has_truecolor(&self) -> bool {
        self.inner.commander.has_truecolor()
    }

    #[must_use]
    pub fn character_set(&self) -> &'static str {
        self.inner.encoder.lock().unwrap().charset_name()
    }

    #[must_use]
    pub fn can_display(&self, r: char, check_fallbacks: bool) -> bool {
        self.inner.encoder.lock().unwrap().can_display(r, check_fallbacks)
    }

    pub fn set_rune_fallback(&self, r: char, replacement: impl Into<String>) {
        self.inner.encoder.lock().unwrap().set_rune_fallback(r, replacement);
    }

    pub fn unset_rune_fallback(&self, r: char) {
        self.inner.encoder.lock().unwrap().unset_rune_fallback(r);
    }

    /// Replace the active pixel set (spec.md §4.6 "Activation protocol").
    pub fn active_pixels(&self, pixels: Vec<Pixel>) {
        self.inner.activate(pixels);
    }

    /// Buffered full replay of the active set, flushed once.
    pub fn redraw(&self) {
        self.inner.redraw();
    }

    pub fn show_cursor(&self, pos: Position) {
        self.inner.show_cursor(pos);
    }

    pub fn hide_cursor(&self) {
        self.inner.hide_cursor();
    }

    #[must_use]
    pub fn cursor(&self) -> Option<Position> {
        self.inner.draw_state.lock().unwrap().cursor
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    #[must_use]
    pub fn resize_dispatcher(&self) -> Arc<Dispatcher<ResizeEvent>> {
        Arc::clone(&self.inner.resize)
    }

    #[must_use]
    pub fn key_dispatcher(&self) -> Arc<Dispatcher<KeyEvent>> {
        Arc::clone(&self.inner.keys)
    }

    #[must_use]
    pub fn mouse_dispatcher(&self) -> Arc<Dispatcher<MouseEvent>> {
        Arc::clone(&self.inner.mouse)
    }

    /// A channel that closes (sends `true`) once teardown completes.
    #[must_use]
    pub fn dying_channel(&self) -> watch::Receiver<bool> {
        self.inner.death_rx.clone()
    }

    /// Cancel the lifecycle context, triggering teardown (spec.md
    /// §4.7 "Teardown").
    pub fn shutdown(&self) {
        self.inner.lifecycle.cancel();
    }
}

impl EngineInner {
    fn size(&self) -> Size {
        self.draw_state.lock().unwrap().size
    }

    fn set_size(&self, size: Size) {
        self.draw_state.lock().unwrap().size = size;
    }

    /// Cancel the previous activation, start a fresh drain task over a
    /// single shared channel (spec.md §9 preferred systems-language
    /// strategy over task-per-pixel), then redraw the new set once.
    fn activate(self: &Arc<Self>, pixels: Vec<Pixel>) {
        if let Some(previous) = self.activation.lock().unwrap().take() {
            previous.cancel();
        }

        let token = CancellationToken::new();
        *self.activation.lock().unwrap() = Some(token.clone());

        let (tx, mut rx) = mpsc::unbounded_channel::<Pixel>();
        for pixel in &pixels {
            pixel.install_sender(tx.clone());
        }
        drop(tx);

        *self.pixels.lock().unwrap() = pixels;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    received = rx.recv() => {
                        match received {
                            Some(pixel) => this.draw_and_flush(&pixel),
                            None => break,
                        }
                    }
                }
            }
        });

        self.redraw();
    }

    fn draw_and_flush(&self, pixel: &Pixel) {
        let mut buf = Vec::new();
        self.draw_into(&mut buf, pixel);
        let mut w = self.writer.lock().unwrap();
        if w.write_all(&buf).is_err() {
            warn!("short write while drawing a cell");
        }
        let _ = w.flush();
    }

    fn redraw(&self) {
        let pixels = self.pixels.lock().unwrap().clone();
        let mut buf = Vec::new();
        for pixel in &pixels {
            self.draw_into(&mut buf, pixel);
        }
        let mut w = self.writer.lock().unwrap();
        if w.write_all(&buf).is_err() {
            warn!("short write during redraw");
        }
        let _ = w.flush();
    }

    /// The draw routine (spec.md §4.6 "Draw routine"), appending bytes
    /// to `buf` rather than writing directly so both a single-pixel
    /// update and a full redraw can share it and flush at their own
    /// granularity.
    #[tracing::instrument(skip_all)]
    fn draw_into(&self, buf: &mut Vec<u8>, pixel: &Pixel) {
        let _ = self.commander.goto(buf, pixel.position().hash());

        let style = pixel.style();
        let mut state = self.draw_state.lock().unwrap();
        if style != state.last_style {
            let _ = self.commander.put_attribute_off(buf);
            self.write_colors(buf, style);
            if style.attributes.contains(AttributeMask::BOLD) {
                let _ = self.commander.put_bold(buf);
            }
            if style.attributes.contains(AttributeMask::UNDERLINE) {
                let _ = self.commander.put_underline(buf);
            }
            if style.attributes.contains(AttributeMask::REVERSE) {
                let _ = self.commander.put_reverse(buf);
            }
            if style.attributes.contains(AttributeMask::BLINK) {
                let _ = self.commander.put_blink(buf);
            }
            if style.attributes.contains(AttributeMask::DIM) {
                let _ = self.commander.put_dim(buf);
            }
            if style.attributes.contains(AttributeMask::ITALIC) {
                let _ = self.commander.put_italic(buf);
            }
            if style.attributes.contains(AttributeMask::STRIKETHROUGH) {
                let _ = self.commander.put_strikethrough(buf);
            }
            state.last_style = style;
        }
        drop(state);

        let mut encoder = self.encoder.lock().unwrap();
        encoder.encode_rune(pixel.rune(), buf);
        for extra in pixel.extension() {
            encoder.encode_rune(extra, buf);
        }
    }

    fn write_colors(&self, buf: &mut Vec<u8>, style: Style) {
        if style.foreground.is_special() || style.background.is_special() {
            let _ = self.commander.put_reset_fg_bg(buf);
            return;
        }

        let fg_rgb = style.foreground.is_rgb();
        let bg_rgb = style.background.is_rgb();

        if self.commander.has_truecolor() && fg_rgb && bg_rgb {
            let _ = self.commander.write_both_colors(buf, style.foreground, style.background, false);
            return;
        }

        if fg_rgb != bg_rgb {
            if fg_rgb {
                let _ = self.commander.write_color(buf, style.foreground, true, false);
                let _ = self.commander.write_color(buf, Color::DEFAULT, false, true);
            } else {
                let _ = self.commander.write_color(buf, style.background, false, false);
                let _ = self.commander.write_color(buf, Color::DEFAULT, true, true);
            }
            return;
        }

        if style.foreground.is_valid() && style.background.is_valid() && self.commander.can_set_fg_bg_together() {
            let _ = self.commander.write_both_colors(buf, style.foreground, style.background, true);
            return;
        }

        if style.foreground.is_valid() && self.commander.can_set_fg() {
            let _ = self.commander.write_color(buf, style.foreground, true, true);
        }
        if style.background.is_valid() && self.commander.can_set_bg() {
            let _ = self.commander.write_color(buf, style.background, false, true);
        }
    }

    /// `pos` outside the current screen, or the `(-1,-1)` cancellation
    /// sentinel, hides the cursor and parks it bottom-right (spec.md
    /// §4.6 "Cursor"). Calling `put_hide_cursor` unconditionally is
    /// safe: it is a no-op on terminals without `civis`, and the goto
    /// that follows still parks the cursor out of the way either way.
    fn show_cursor(&self, pos: Position) {
        let size = self.size();
        let outside = pos.is_cancel()
            || pos.column < 0
            || pos.row < 0
            || pos.column as u32 >= u32::from(size.columns)
            || pos.row as u32 >= u32::from(size.rows);

        let mut w = self.writer.lock().unwrap();
        if outside {
            let _ = self.commander.put_hide_cursor(&mut *w);
            let bottom_right = Position::new(
                i32::from(size.columns.saturating_sub(1)),
                i32::from(size.rows.saturating_sub(1)),
            );
            let _ = self.commander.goto(&mut *w, bottom_right.hash());
            self.draw_state.lock().unwrap().cursor = None;
            return;
        }

        let _ = self.commander.goto(&mut *w, pos.hash());
        let _ = self.commander.put_show_cursor(&mut *w);
        self.draw_state.lock().unwrap().cursor = Some(pos);
    }

    fn hide_cursor(&self) {
        let mut w = self.writer.lock().unwrap();
        let _ = self.commander.put_hide_cursor(&mut *w);
        self.draw_state.lock().unwrap().cursor = None;
    }

    fn clear(&self) {
        let mut w = self.writer.lock().unwrap();
        let _ = self.commander.put_clear(&mut *w);
    }

    /// Teardown sequence (spec.md §4.7 "Teardown"): cancel the active
    /// listener, restore the screen and termios, signal death.
    fn teardown(&self) {
        if let Some(token) = self.activation.lock().unwrap().take() {
            token.cancel();
        }

        {
            let mut w = self.writer.lock().unwrap();
            let _ = self.commander.put_show_cursor(&mut *w);
            let _ = self.commander.put_attribute_off(&mut *w);
            let _ = self.commander.put_clear(&mut *w);
            let _ = self.commander.put_exit_alternate_screen(&mut *w);
            let _ = self.commander.put_exit_keypad(&mut *w);
            let _ = self.commander.put_disable_mouse(&mut *w);
            let _ = w.flush();
        }

        if let Err(e) = self.tty.restore() {
            warn!(error = %e, "failed to restore original termios");
        }

        let _ = self.death_tx.send(true);
        info!("engine teardown complete");
    }
}

fn spawn_input_task(
    inner: Arc<EngineInner>,
    reader: std::fs::File,
    terminfo: vtterm_info::Terminfo,
    key_timeout: std::time::Duration,
    mut size_rx: watch::Receiver<Size>,
) {
    let lifecycle = inner.lifecycle.clone();
    tokio::spawn(async move {
        use tokio::io::AsyncReadExt;
        let mut reader = tokio::fs::File::from_std(reader);
        let mut demux = Demux::new(&terminfo, *size_rx.borrow(), key_timeout);
        let mut buf = [0u8; 1024];
        loop {
            tokio::select! {
                () = lifecycle.cancelled() => break,
                changed = size_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    demux.resize(*size_rx.borrow());
                }
                result = reader.read(&mut buf) => {
                    match result {
                        Ok(0) => break,
                        Ok(n) => {
                            demux.feed(&buf[..n]);
                            dispatch_events(&inner, &mut demux).await;
                        }
                        Err(e) => {
                            warn!(error = %e, "tty read failed");
                            break;
                        }
                    }
                }
                () = tokio::time::sleep(key_timeout) => {
                    dispatch_events(&inner, &mut demux).await;
                }
            }
        }
    });
}

#[tracing::instrument(skip_all)]
async fn dispatch_events(inner: &Arc<EngineInner>, demux: &mut Demux) {
    let (keys, mice) = demux.poll(Instant::now());
    for key in keys {
        inner.keys.dispatch(key).await;
    }
    for mouse in mice {
        inner.mouse.dispatch(mouse).await;
    }
}

fn spawn_resize_task(inner: Arc<EngineInner>, fallback_size: Size, size_tx: watch::Sender<Size>) {
    let lifecycle = inner.lifecycle.clone();
    tokio::spawn(async move {
        let mut sigwinch = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGWINCH handler; resize events disabled");
                return;
            }
        };
        loop {
            tokio::select! {
                () = lifecycle.cancelled() => break,
                signal = sigwinch.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    let new_size = inner.tty.window_size(fallback_size);
                    inner.set_size(new_size);
                    inner.commander.build_goto_cache(new_size);
                    let _ = size_tx.send(new_size);
                    inner.resize.dispatch(ResizeEvent { size: new_size }).await;
                }
            }
        }
    });
}

fn spawn_teardown_task(inner: Arc<EngineInner>) {
    let lifecycle = inner.lifecycle.clone();
    tokio::spawn(async move {
        lifecycle.cancelled().await;
        inner.teardown();
    });
}
