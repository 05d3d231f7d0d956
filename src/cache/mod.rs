//! Compile-or-fetch stores for executor source text.
//!
//! An [`Evaluator`] owns the "compile at most once" guarantee: for each
//! identifier it either returns text it already holds or runs the supplied
//! closure, keeps the result, and returns it. Concurrent calls for the same
//! identifier wait on a per-identifier slot; different identifiers do not
//! block each other.

#[cfg(feature = "file-cache")]
mod file;

#[cfg(feature = "file-cache")]
pub use file::FileEvaluator;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::Error;

/// Compile-or-fetch store keyed by identifier.
pub trait Evaluator: Send + Sync {
    /// Return the source text for `identifier`, invoking `compile` only when
    /// nothing is stored yet.
    ///
    /// `compile` runs at most once per identifier across all threads, unless
    /// it fails: nothing is stored on failure and a later call tries again.
    ///
    /// # Errors
    ///
    /// Errors from `compile` are returned unchanged. Storage failures are
    /// [`Error::Evaluation`].
    fn evaluate(
        &self,
        identifier: &str,
        compile: &dyn Fn() -> Result<String, Error>,
    ) -> Result<String, Error>;
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(
        &self,
        identifier: &str,
        compile: &dyn Fn() -> Result<String, Error>,
    ) -> Result<String, Error> {
        (**self).evaluate(identifier, compile)
    }
}

/// Failures to store, fetch, or load a unit.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("executor unit failed to load: {message}")]
    Load { message: String },

    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "file-cache")]
    #[error("failed to encode cached unit: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

impl EvaluationError {
    pub(crate) fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }
}

type Slot = Arc<Mutex<Option<String>>>;

/// Per-identifier slots. The outer lock is held only to find, create, or
/// drop a slot, never while a slot is locked for a compile.
#[derive(Debug, Default)]
pub(crate) struct Slots {
    slots: Mutex<HashMap<String, Slot>>,
    filled: AtomicUsize,
}

impl Slots {
    /// The slot for `identifier`, created empty if missing.
    pub(crate) fn get(&self, identifier: &str) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(identifier.to_owned()).or_default())
    }

    /// The slot for `identifier`, if one exists.
    fn find(&self, identifier: &str) -> Option<Slot> {
        self.slots.lock().get(identifier).cloned()
    }

    /// Record that a slot went from empty to holding text.
    fn mark_filled(&self) {
        self.filled.fetch_add(1, Ordering::Relaxed);
    }

    fn filled(&self) -> usize {
        self.filled.load(Ordering::Relaxed)
    }

    /// Drop the slot after a failed compile, unless another caller already
    /// holds it or it has been filled. `slot` must no longer be locked.
    pub(crate) fn discard(&self, identifier: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        let owned = slots
            .get(identifier)
            .is_some_and(|current| Arc::ptr_eq(current, slot));
        // The map and the caller hold the only references
        let unshared = Arc::strong_count(slot) == 2;
        let empty = slot.try_lock().is_some_and(|stored| stored.is_none());
        if owned && unshared && empty {
            slots.remove(identifier);
        }
    }

    #[cfg(test)]
    fn count(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Process-local store. Units live as long as the evaluator.
#[derive(Debug, Default)]
pub struct MemoryEvaluator {
    slots: Slots,
}

impl MemoryEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored source text for `identifier`, if any. Waits while that
    /// identifier is being compiled.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<String> {
        self.slots.find(identifier)?.lock().clone()
    }

    /// Number of stored units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.filled()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Evaluator for MemoryEvaluator {
    fn evaluate(
        &self,
        identifier: &str,
        compile: &dyn Fn() -> Result<String, Error>,
    ) -> Result<String, Error> {
        let slot = self.slots.get(identifier);
        let mut stored = slot.lock();
        if let Some(source) = stored.as_ref() {
            tracing::debug!(identifier = %identifier, "unit found in memory");
            return Ok(source.clone());
        }

        tracing::debug!(identifier = %identifier, "unit not in memory, compiling");
        let source = match compile() {
            Ok(source) => source,
            Err(err) => {
                drop(stored);
                self.slots.discard(identifier, &slot);
                return Err(err);
            }
        };
        *stored = Some(source.clone());
        self.slots.mark_filled();
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::parse::ParseError;

    #[test]
    fn compiles_once_then_serves_stored_text() {
        let evaluator = MemoryEvaluator::new();
        let calls = AtomicUsize::new(0);
        let compile = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("unit text".to_owned())
        };

        assert_eq!(evaluator.evaluate("a", &compile).unwrap(), "unit text");
        assert_eq!(evaluator.evaluate("a", &compile).unwrap(), "unit text");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(evaluator.get("a").as_deref(), Some("unit text"));
        assert_eq!(evaluator.len(), 1);
    }

    #[test]
    fn failure_stores_nothing() {
        let evaluator = MemoryEvaluator::new();
        let failing = || Err(Error::Syntax(ParseError::new("x ~", "boom")));
        assert!(matches!(
            evaluator.evaluate("a", &failing),
            Err(Error::Syntax(_))
        ));
        assert_eq!(evaluator.get("a"), None);
        assert!(evaluator.is_empty());

        // A later call gets another chance
        let ok = || Ok("fixed".to_owned());
        assert_eq!(evaluator.evaluate("a", &ok).unwrap(), "fixed");
    }

    #[test]
    fn identifiers_are_independent() {
        let evaluator = MemoryEvaluator::new();
        evaluator.evaluate("a", &|| Ok("A".to_owned())).unwrap();
        evaluator.evaluate("b", &|| Ok("B".to_owned())).unwrap();
        assert_eq!(evaluator.get("a").as_deref(), Some("A"));
        assert_eq!(evaluator.get("b").as_deref(), Some("B"));
        assert_eq!(evaluator.len(), 2);
    }

    #[test]
    fn concurrent_callers_share_one_compile() {
        const THREADS: usize = 16;
        let evaluator = MemoryEvaluator::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        let results: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        evaluator
                            .evaluate("shared", &|| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(std::time::Duration::from_millis(5));
                                Ok("once".to_owned())
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == "once"));
    }

    #[test]
    fn len_does_not_wait_for_a_compile_in_progress() {
        let evaluator = MemoryEvaluator::new();
        let finished = AtomicBool::new(false);
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|s| {
            let (evaluator, finished) = (&evaluator, &finished);
            s.spawn(move || {
                evaluator
                    .evaluate("slow", &|| {
                        started_tx.send(()).unwrap();
                        let _ = release_rx.recv_timeout(Duration::from_secs(2));
                        Ok("slow".to_owned())
                    })
                    .unwrap();
                finished.store(true, Ordering::SeqCst);
            });

            started_rx.recv().unwrap();
            assert_eq!(evaluator.len(), 0);
            assert!(evaluator.is_empty());
            evaluator.evaluate("fast", &|| Ok("fast".to_owned())).unwrap();
            assert_eq!(evaluator.len(), 1);
            assert!(
                !finished.load(Ordering::SeqCst),
                "unrelated calls waited for the slow compile"
            );
            release_tx.send(()).unwrap();
        });

        assert_eq!(evaluator.len(), 2);
    }

    #[test]
    fn lookups_and_failures_leave_no_slots() {
        let evaluator = MemoryEvaluator::new();
        for id in ["a", "b", "c"] {
            assert_eq!(evaluator.get(id), None);
        }
        assert_eq!(evaluator.slots.count(), 0);

        let failing = || Err(Error::Syntax(ParseError::new("x ~", "boom")));
        assert!(evaluator.evaluate("a", &failing).is_err());
        assert_eq!(evaluator.slots.count(), 0);

        evaluator.evaluate("a", &|| Ok("A".to_owned())).unwrap();
        assert_eq!(evaluator.slots.count(), 1);
        assert_eq!(evaluator.len(), 1);
    }
}
