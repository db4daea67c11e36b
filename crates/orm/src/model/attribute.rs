//! Typed attribute handles

use std::fmt;
use std::marker::PhantomData;

/// Name of an attribute together with the Rust type it deserializes to.
///
/// Entity modules declare these as constants so callers can read and write
/// attributes without spelling names or converting JSON by hand:
///
/// ```ignore
/// pub const STATUS: Attribute<SuggestionStatus> = Attribute::new("status");
/// let status = suggestion.read(&STATUS)?;
/// ```
pub struct Attribute<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> Attribute<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Attribute<T> {}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({})", self.name)
    }
}
