//! RAII guard for raw-mode terminal exchanges

use crate::probe::TtyDevice;
use std::io;
use tracing::warn;

/// Holds the terminal's saved mode while raw mode is active.
///
/// The saved mode is restored exactly once: either explicitly through
/// [`RawModeGuard::restore`], which reports the restore error, or on drop
/// if the guard is abandoned (early return or unwind).
pub struct RawModeGuard<'a, T: TtyDevice> {
    tty: &'a T,
    saved: Option<T::Mode>,
}

impl<'a, T: TtyDevice> RawModeGuard<'a, T> {
    /// Save the current mode and switch the device to raw input.
    pub fn enter(tty: &'a T) -> io::Result<Self> {
        let saved = tty.enter_raw_mode()?;
        Ok(Self {
            tty,
            saved: Some(saved),
        })
    }

    /// Restore the saved mode and surface any failure.
    pub fn restore(mut self) -> io::Result<()> {
        match self.saved.take() {
            Some(mode) => self.tty.restore_mode(&mode),
            None => Ok(()),
        }
    }
}

impl<T: TtyDevice> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(mode) = self.saved.take() {
            if let Err(e) = self.tty.restore_mode(&mode) {
                warn!("Failed to restore terminal mode: {}", e);
            }
        }
    }
}
