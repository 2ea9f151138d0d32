// src/core/context_data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared state threaded through every step of one flow run.
///
/// Guards are blocking `parking_lot` guards and are not `Send`; drop them
/// before the next `.await`.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Runs `f` under the write lock and hands back its result.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = self.0.write();
    f(&mut guard)
  }

  /// Copies the current value out from under the read lock.
  pub fn snapshot(&self) -> T
  where
    T: Clone,
  {
    self.0.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}
