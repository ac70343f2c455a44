//! Abstract operations.

use std::marker::PhantomData;

/// Operation to insert a value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation to update a value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Operation to delete a value.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Operation to select a value.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Operation to start a long-running value, like a background task.
#[derive(Clone, Copy, Debug)]
pub struct Start<T>(pub T);

/// Operation to perform a single step of a value.
#[derive(Clone, Copy, Debug)]
pub struct Perform<T>(pub T);

/// Selector of `W` by `B`.
///
/// Lets a single [`Handler`] distinguish operations on the same entity by
/// different criteria, like deleting a token by its digest or by its
/// expiration.
///
/// [`Handler`]: crate::Handler
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the value to select.
    _what: PhantomData<W>,

    /// Value to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] with the given value.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns a reference to the inner value.
    #[must_use]
    pub const fn inner(&self) -> &B {
        &self.by
    }

    /// Consumes this [`By`] and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
