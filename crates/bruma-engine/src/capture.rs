//! Capture-permission boundary for the Memory engine.
//!
//! Only success or denial matters to the engine core; the platform
//! prompt itself lives in the io layer. Denial never crosses the engine
//! boundary as an error — the Memory engine converts it into fallback
//! and keeps running on its internal noise writer.

/// Outcome of a capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePermission {
    /// Live input is available; `read` will deliver samples.
    Granted,
    /// No live input; the engine must substitute its own writer.
    Denied,
}

/// A source of live capture samples.
///
/// Implementations must be non-blocking: `read` returns however many
/// samples are currently buffered (possibly zero) and never waits.
pub trait CaptureSource: Send {
    /// Request capture. Idempotent; called once from `start()`.
    fn request(&mut self) -> CapturePermission;

    /// Pull up to `out.len()` samples; returns the count delivered.
    fn read(&mut self, out: &mut [f32]) -> usize;
}

/// A capture source that always denies. The default when no io layer is
/// attached (tests, offline bounce).
#[derive(Debug, Default)]
pub struct DeniedCapture;

impl CaptureSource for DeniedCapture {
    fn request(&mut self) -> CapturePermission {
        CapturePermission::Denied
    }

    fn read(&mut self, _out: &mut [f32]) -> usize {
        0
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{CapturePermission, CaptureSource};

    /// Grants permission and loops a fixed sample pattern, for tests.
    pub struct LoopingCapture {
        pattern: Vec<f32>,
        pos: usize,
    }

    impl LoopingCapture {
        /// Create from the pattern to loop.
        pub fn new(pattern: Vec<f32>) -> Self {
            Self { pattern, pos: 0 }
        }
    }

    impl CaptureSource for LoopingCapture {
        fn request(&mut self) -> CapturePermission {
            CapturePermission::Granted
        }

        fn read(&mut self, out: &mut [f32]) -> usize {
            if self.pattern.is_empty() {
                return 0;
            }
            for slot in out.iter_mut() {
                *slot = self.pattern[self.pos];
                self.pos = (self.pos + 1) % self.pattern.len();
            }
            out.len()
        }
    }
}
