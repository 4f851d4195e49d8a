//! Compute-once slots for the artifacts of a [`Document`](crate::Document).

use crate::{Error, Result};

/// A value that is computed at most once.
///
/// `Uncomputed -> Computing -> Cached`. A failed computation returns the slot
/// to `Uncomputed`, so the next access tries again. A slot left in
/// `Computing` (the computation panicked) is poisoned.
#[derive(Debug, Default)]
pub enum Memo<T> {
    #[default]
    Uncomputed,
    Computing,
    Cached(T),
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Memo::Uncomputed
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Memo::Cached(_))
    }

    /// The cached value, computing it with `init` on first access.
    pub fn get_or_try_init<F>(&mut self, name: &'static str, init: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        match self {
            Memo::Cached(_) => {}
            Memo::Computing => return Err(Error::Poisoned(name)),
            Memo::Uncomputed => {
                *self = Memo::Computing;
                match init() {
                    Ok(value) => *self = Memo::Cached(value),
                    Err(err) => {
                        *self = Memo::Uncomputed;
                        return Err(err);
                    }
                }
            }
        }
        self.cached(name)
    }

    /// The cached value, without computing it.
    pub fn cached(&self, name: &'static str) -> Result<&T> {
        match self {
            Memo::Cached(value) => Ok(value),
            _ => Err(Error::Poisoned(name)),
        }
    }
}
