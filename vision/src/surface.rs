use opencv::core::Mat;
use opencv::highgui::{destroy_all_windows, imshow, wait_key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ESC: i32 = 27;

/// Where previews go, and where the operator's cancel comes from.
pub trait Surface {
    fn show(&mut self, preview: &Mat) -> crate::Result<()>;
    /// Blocks for at most the poll delay. `true` ends the session.
    fn poll_cancel(&mut self) -> crate::Result<bool>;
}

/// Live preview window. Escape or the shared flag quits.
pub struct HighGuiSurface {
    window: String,
    poll_ms: i32,
    cancel: Arc<AtomicBool>,
}

impl HighGuiSurface {
    pub fn new(window: impl Into<String>, poll: Duration) -> Self {
        Self {
            window: window.into(),
            poll_ms: poll.as_millis().clamp(1, i32::MAX as u128) as i32,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }
}

impl Surface for HighGuiSurface {
    fn show(&mut self, preview: &Mat) -> crate::Result<()> {
        imshow(&self.window, preview)?;

        Ok(())
    }

    fn poll_cancel(&mut self) -> crate::Result<bool> {
        let key = wait_key(self.poll_ms)? & 0xFF;

        Ok(key == ESC || self.cancel.load(Ordering::SeqCst))
    }
}

impl Drop for HighGuiSurface {
    fn drop(&mut self) {
        if let Err(err) = destroy_all_windows() {
            log::warn!("closing preview windows failed: {err}");
        }
    }
}

/// No window. Cancelled by raising the shared flag.
pub struct HeadlessSurface {
    cancel: Arc<AtomicBool>,
    poll: Duration,
}

impl HeadlessSurface {
    pub fn new(poll: Duration) -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            poll,
        }
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }
}

impl Surface for HeadlessSurface {
    fn show(&mut self, _preview: &Mat) -> crate::Result<()> {
        Ok(())
    }

    fn poll_cancel(&mut self) -> crate::Result<bool> {
        if !self.poll.is_zero() {
            thread::sleep(self.poll);
        }

        Ok(self.cancel.load(Ordering::SeqCst))
    }
}
