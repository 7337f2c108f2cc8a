//! Invalidatable memoized values.

/// A lazily computed value that is either absent/dirty or current.
///
/// Mutations on the owner call [`invalidate`](Cached::invalidate); the next
/// reader rebuilds through [`get_or_insert_with`](Cached::get_or_insert_with).
#[derive(Debug, Clone, PartialEq)]
pub enum Cached<T> {
    Stale,
    Fresh(T),
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Cached::Stale
    }
}

impl<T> Cached<T> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Cached::Fresh(_))
    }

    /// The current value, or `None` when stale.
    pub fn get(&self) -> Option<&T> {
        match self {
            Cached::Fresh(value) => Some(value),
            Cached::Stale => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Cached::Fresh(value) => Some(value),
            Cached::Stale => None,
        }
    }

    pub fn invalidate(&mut self) {
        *self = Cached::Stale;
    }

    pub fn set(&mut self, value: T) -> &mut T {
        *self = Cached::Fresh(value);
        match self {
            Cached::Fresh(value) => value,
            Cached::Stale => unreachable!("value was just stored"),
        }
    }

    /// Return the current value, rebuilding it first when stale.
    pub fn get_or_insert_with(&mut self, build: impl FnOnce() -> T) -> &mut T {
        if let Cached::Stale = self {
            *self = Cached::Fresh(build());
        }
        match self {
            Cached::Fresh(value) => value,
            Cached::Stale => unreachable!("value was just stored"),
        }
    }
}
