//! Focus ordering shared by every frame of one registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter defining the total focus order of frames.
///
/// Clones share the same counter. Each [`crate::window::WindowRegistry`]
/// owns its own authority, so independent registries never observe each
/// other's values. Raising is a single atomic increment-and-read.
#[derive(Debug, Clone, Default)]
pub struct StackingAuthority {
    counter: Arc<AtomicU64>,
}

impl StackingAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return the new highest z-index.
    pub fn raise(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Highest z-index handed out so far; zero before any focus event.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_is_strictly_increasing() {
        let authority = StackingAuthority::new();
        assert_eq!(authority.current(), 0);
        let a = authority.raise();
        let b = authority.raise();
        assert!(b > a);
        assert_eq!(authority.current(), b);
    }

    #[test]
    fn clones_share_one_counter() {
        let authority = StackingAuthority::new();
        let clone = authority.clone();
        authority.raise();
        assert_eq!(clone.raise(), 2);
    }

    #[test]
    fn separate_authorities_are_independent() {
        let first = StackingAuthority::new();
        let second = StackingAuthority::new();
        first.raise();
        first.raise();
        assert_eq!(second.raise(), 1);
    }

    #[test]
    fn raise_across_threads_hands_out_unique_values() {
        let authority = StackingAuthority::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let authority = authority.clone();
                std::thread::spawn(move || (0..100).map(|_| authority.raise()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(authority.current(), 400);
    }
}
