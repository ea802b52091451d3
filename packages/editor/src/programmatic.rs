//! Programmatic change signal.
//!
//! Set while the engine mutates the buffer so change listeners can tell an
//! engine edit from a user edit. The guard clears it on every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared flag, cloned into the buffer and any change listener
#[derive(Debug, Clone, Default)]
pub struct ProgrammaticChange {
    depth: Arc<AtomicUsize>,
}

impl ProgrammaticChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }

    /// Raise the signal until the returned guard drops
    pub fn begin(&self) -> ProgrammaticGuard {
        self.depth.fetch_add(1, Ordering::AcqRel);
        ProgrammaticGuard {
            depth: Arc::clone(&self.depth),
        }
    }
}

#[derive(Debug)]
pub struct ProgrammaticGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for ProgrammaticGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_on_drop() {
        let flag = ProgrammaticChange::new();
        let listener = flag.clone();
        assert!(!listener.is_active());

        {
            let _outer = flag.begin();
            assert!(listener.is_active());
            {
                let _inner = flag.begin();
            }
            assert!(listener.is_active());
        }
        assert!(!listener.is_active());
    }

    #[test]
    fn test_guard_clears_on_early_return() {
        fn fails(flag: &ProgrammaticChange) -> Result<(), ()> {
            let _guard = flag.begin();
            Err(())
        }

        let flag = ProgrammaticChange::new();
        assert!(fails(&flag).is_err());
        assert!(!flag.is_active());
    }
}
