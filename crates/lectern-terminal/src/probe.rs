//! Device-attribute probing over a raw-mode request/response exchange
//!
//! Query:    ESC [ 0 c
//! Response: ESC [ ? Ps ; Ps ; ... c
//!
//! Terminals that never answer the query would leave the read blocked
//! forever, so a timer thread races the read. When the timer wins it sends
//! a cursor-position request, which practically every terminal answers,
//! purely to unblock the read. The bytes that arrive afterwards are
//! discarded because there is no telling which query they belong to.

use crate::raw_mode::RawModeGuard;
use crate::ProbeError;
use nix::sys::termios::{self, SetArg, Termios};
use std::io::{self, IsTerminal, Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum bytes captured from a single reply
pub const MAX_REPLY_LEN: usize = 1024;

/// How long the terminal gets to answer (1/16 second)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_micros(62_500);

/// Primary Device Attributes request
pub const DEVICE_ATTRIBUTES_REQUEST: &[u8] = b"\x1b[0c";

/// Report Cursor Position request, used only to unblock a stalled read
pub const CURSOR_POSITION_REQUEST: &[u8] = b"\x1b[6n";

/// Attribute code advertising sixel graphics
const SIXEL_ATTRIBUTE: u32 = 4;

/// Configuration for a probe exchange
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Time the terminal has to answer before the exchange is abandoned
    pub timeout: Duration,
    /// Control sequence sent to the terminal
    pub request: Vec<u8>,
    /// Control sequence sent when the timeout fires
    pub unblock_request: Vec<u8>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            request: DEVICE_ATTRIBUTES_REQUEST.to_vec(),
            unblock_request: CURSOR_POSITION_REQUEST.to_vec(),
        }
    }
}

/// Parsed device-attribute reply
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Numeric fields of the reply, in the order they appeared.
    ///
    /// The first code is the terminal class (62 = VT220, 64 = VT420, ...);
    /// the rest are feature codes.
    pub attribute_codes: Vec<u32>,
}

impl ProbeResult {
    pub fn from_reply(reply: &[u8]) -> Self {
        Self {
            attribute_codes: parse_attribute_codes(reply),
        }
    }

    /// Whether the terminal advertises sixel graphics
    pub fn supports_sixel(&self) -> bool {
        self.attribute_codes
            .iter()
            .skip(1)
            .any(|&code| code == SIXEL_ATTRIBUTE)
    }
}

/// Input side of a terminal that can be switched into raw mode.
///
/// Writes go through a separate writer so the timer thread can send the
/// unblock request while the calling thread is parked in
/// [`TtyDevice::read_reply`].
pub trait TtyDevice {
    /// Saved terminal mode
    type Mode;

    /// Whether the input is an interactive terminal
    fn is_terminal(&self) -> bool;

    /// Switch to unbuffered, unechoed input and return the previous mode
    fn enter_raw_mode(&self) -> io::Result<Self::Mode>;

    /// Put back a mode returned by [`TtyDevice::enter_raw_mode`]
    fn restore_mode(&self, mode: &Self::Mode) -> io::Result<()>;

    /// Blocking read of reply bytes
    fn read_reply(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Standard input as a [`TtyDevice`], using termios for mode switching
pub struct StdioTty {
    stdin: io::Stdin,
}

impl StdioTty {
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

impl Default for StdioTty {
    fn default() -> Self {
        Self::new()
    }
}

impl TtyDevice for StdioTty {
    type Mode = Termios;

    fn is_terminal(&self) -> bool {
        self.stdin.is_terminal()
    }

    fn enter_raw_mode(&self) -> io::Result<Termios> {
        let saved = termios::tcgetattr(&self.stdin)?;
        let mut raw = saved.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(&self.stdin, SetArg::TCSANOW, &raw)?;
        Ok(saved)
    }

    fn restore_mode(&self, mode: &Termios) -> io::Result<()> {
        termios::tcsetattr(&self.stdin, SetArg::TCSANOW, mode)?;
        Ok(())
    }

    fn read_reply(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdin.lock().read(buf)
    }
}

/// Send `config.request` and capture the terminal's reply.
///
/// Raw mode is entered only after the interactivity check and is restored
/// before returning on every path. Nothing is logged while raw mode is
/// active. A restore failure is reported only when the exchange itself
/// succeeded.
pub fn request_response<T, W>(
    tty: &T,
    output: W,
    config: &ProbeConfig,
) -> Result<Vec<u8>, ProbeError>
where
    T: TtyDevice,
    W: Write + Send,
{
    if !tty.is_terminal() {
        return Err(ProbeError::NonInteractive);
    }

    debug!("Sending terminal request {:?}", config.request);
    let guard = RawModeGuard::enter(tty)?;
    let outcome = exchange(tty, output, config);
    let restored = guard.restore();

    if let Some(Err(e)) = &outcome.unblock {
        warn!("Failed to send unblock request: {}", e);
    }
    if outcome.unblock.is_some() {
        warn!("Terminal did not answer within {:?}", config.timeout);
        return Err(ProbeError::TimedOut);
    }

    let reply = outcome.reply?;
    restored?;
    debug!("Terminal replied with {} bytes", reply.len());
    Ok(reply)
}

/// What happened while raw mode was active
struct Outcome {
    reply: io::Result<Vec<u8>>,
    /// Set when the timer fired, with the result of sending the unblock request
    unblock: Option<io::Result<()>>,
}

fn exchange<T, W>(tty: &T, mut output: W, config: &ProbeConfig) -> Outcome
where
    T: TtyDevice,
    W: Write + Send,
{
    if let Err(e) = output.write_all(&config.request).and_then(|()| output.flush()) {
        return Outcome {
            reply: Err(e),
            unblock: None,
        };
    }

    let output = Mutex::new(output);
    let output = &output;
    let mut buf = [0u8; MAX_REPLY_LEN];
    let (done_tx, done_rx) = mpsc::channel::<()>();

    // Both sides join here before the caller restores the terminal mode.
    let (read_result, unblock) = thread::scope(|scope| {
        let timer = scope.spawn(move || match done_rx.recv_timeout(config.timeout) {
            Err(RecvTimeoutError::Timeout) => Some(match output.lock() {
                Ok(mut out) => out
                    .write_all(&config.unblock_request)
                    .and_then(|()| out.flush()),
                Err(_) => Err(io::Error::other("output writer poisoned")),
            }),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => None,
        });

        let read_result = tty.read_reply(&mut buf);
        let _ = done_tx.send(());
        let unblock = timer
            .join()
            .unwrap_or_else(|_| Some(Err(io::Error::other("timer thread panicked"))));
        (read_result, unblock)
    });

    Outcome {
        reply: read_result.map(|n| buf[..n].to_vec()),
        unblock,
    }
}

/// Query the attached terminal's primary device attributes.
pub fn request_attributes(config: &ProbeConfig) -> Result<ProbeResult, ProbeError> {
    let tty = StdioTty::new();
    let reply = request_response(&tty, io::stdout(), config)?;
    Ok(ProbeResult::from_reply(&reply))
}

/// Every run of decimal digits in `reply`, in order.
///
/// Parameter separators are not interpreted; runs too large for a `u32`
/// are skipped.
pub fn parse_attribute_codes(reply: &[u8]) -> Vec<u32> {
    reply
        .split(|b| !b.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .filter_map(|run| std::str::from_utf8(run).ok()?.parse().ok())
        .collect()
}
