use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::cloneable::CloneableAny;

/// Typed key into [`CompensationData`].
///
/// The value type is part of the key, so reading a snapshot back with the
/// wrong type does not compile.
///
/// ```
/// use mission_saga::{CompensationData, CompensationKey};
///
/// const EXP_BEFORE: CompensationKey<i64> = CompensationKey::new("EXP_BEFORE");
///
/// let mut data = CompensationData::new();
/// data.insert(EXP_BEFORE, 120);
/// assert_eq!(data.get(EXP_BEFORE), Some(120));
/// ```
pub struct CompensationKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CompensationKey<T> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for CompensationKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CompensationKey<T> {}

impl<T> fmt::Debug for CompensationKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompensationKey").field(&self.name).finish()
    }
}

/// Per-run snapshots of pre-mutation state, written by a step for its own
/// later compensation.
#[derive(Default)]
pub struct CompensationData {
    values: HashMap<&'static str, Box<dyn CloneableAny>>,
}

impl CompensationData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous snapshot.
    pub fn insert<T>(&mut self, key: CompensationKey<T>, value: T)
    where
        T: Clone + Send + 'static,
    {
        self.values.insert(key.name, Box::new(value));
    }

    /// Read a snapshot back.
    ///
    /// Returns `None` when nothing was stored, or when a value of another
    /// type was stored under the same name.
    #[must_use]
    pub fn get<T>(&self, key: CompensationKey<T>) -> Option<T>
    where
        T: Clone + 'static,
    {
        let stored: &dyn CloneableAny = &**self.values.get(key.name)?;
        stored.as_any().downcast_ref::<T>().cloned()
    }

    #[must_use]
    pub fn contains<T>(&self, key: CompensationKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    /// Remove a snapshot, returning whether one was present.
    pub fn remove<T>(&mut self, key: CompensationKey<T>) -> bool {
        self.values.remove(key.name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of all stored snapshots, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.values.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl Clone for CompensationData {
    fn clone(&self) -> Self {
        let values = self
            .values
            .iter()
            .map(|(name, value)| (*name, value.clone_box()))
            .collect();
        Self { values }
    }
}

impl fmt::Debug for CompensationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensationData")
            .field("keys", &self.keys())
            .finish()
    }
}
