use lectern_terminal::TtyDevice;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fake terminal input that answers with a canned reply.
///
/// Counts raw-mode entries and restores so tests can check that every
/// probe leaves the terminal the way it found it.
#[derive(Debug)]
pub struct ScriptedTty {
    interactive: bool,
    reply: Vec<u8>,
    reply_delay: Duration,
    read_error: Option<io::ErrorKind>,
    fail_raw_mode: bool,
    raw: AtomicBool,
    raw_entries: AtomicUsize,
    restores: AtomicUsize,
    read_while_raw: AtomicBool,
}

impl ScriptedTty {
    /// An interactive terminal that replies immediately
    pub fn answering(reply: &[u8]) -> Self {
        Self {
            interactive: true,
            reply: reply.to_vec(),
            reply_delay: Duration::ZERO,
            read_error: None,
            fail_raw_mode: false,
            raw: AtomicBool::new(false),
            raw_entries: AtomicUsize::new(0),
            restores: AtomicUsize::new(0),
            read_while_raw: AtomicBool::new(false),
        }
    }

    /// Input that is not a terminal at all
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            ..Self::answering(b"")
        }
    }

    /// Hold the reply back for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Fail every read with `kind`
    pub fn failing_reads(mut self, kind: io::ErrorKind) -> Self {
        self.read_error = Some(kind);
        self
    }

    /// Refuse to switch into raw mode
    pub fn failing_raw_mode(mut self) -> Self {
        self.fail_raw_mode = true;
        self
    }

    pub fn raw_entries(&self) -> usize {
        self.raw_entries.load(Ordering::SeqCst)
    }

    pub fn restores(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    pub fn is_raw(&self) -> bool {
        self.raw.load(Ordering::SeqCst)
    }

    /// Whether the last read happened with raw mode active
    pub fn read_while_raw(&self) -> bool {
        self.read_while_raw.load(Ordering::SeqCst)
    }
}

impl TtyDevice for ScriptedTty {
    type Mode = ();

    fn is_terminal(&self) -> bool {
        self.interactive
    }

    fn enter_raw_mode(&self) -> io::Result<()> {
        if self.fail_raw_mode {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "tcsetattr refused"));
        }
        self.raw_entries.fetch_add(1, Ordering::SeqCst);
        self.raw.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn restore_mode(&self, _mode: &()) -> io::Result<()> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        self.raw.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_reply(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_while_raw.store(self.is_raw(), Ordering::SeqCst);
        if !self.reply_delay.is_zero() {
            std::thread::sleep(self.reply_delay);
        }
        if let Some(kind) = self.read_error {
            return Err(io::Error::new(kind, "scripted read failure"));
        }
        let n = self.reply.len().min(buf.len());
        buf[..n].copy_from_slice(&self.reply[..n]);
        Ok(n)
    }
}

/// Cloneable in-memory writer standing in for the terminal's output
#[derive(Debug, Clone, Default)]
pub struct SharedWriter {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .map_err(|_| io::Error::other("writer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Remove ANSI escape sequences from rendered output
pub fn strip_ansi(text: &str) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes::strip(text)).into_owned()
}
