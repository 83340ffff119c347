//! Short-lived resolution sessions.
//!
//! A [`Session`] is opened per operation (or per bulk worker) and dropped
//! when the work is done. It caches resources resolved through a
//! [`ResourceLookup`] so that a pair member is fetched once per session.

use std::{
  collections::HashMap,
  time::Instant,
};

use tracing::debug;
use uuid::Uuid;

use crate::resource::{Resource, ResourceLookup, ResourceType};

pub struct Session {
  id:        Uuid,
  opened_at: Instant,
  cache:     HashMap<(ResourceType, i32), Option<Resource>>,
}

impl Session {
  pub fn open() -> Self {
    let id = Uuid::new_v4();
    debug!(session = %id, "session opened");
    Self { id, opened_at: Instant::now(), cache: HashMap::new() }
  }

  /// Resolve through the cache, falling back to `lookup`. Misses are cached
  /// too.
  pub async fn resolve<L: ResourceLookup>(
    &mut self,
    lookup: &L,
    id: i32,
    resource_type: ResourceType,
  ) -> Result<Option<Resource>, L::Error> {
    if let Some(cached) = self.cache.get(&(resource_type, id)) {
      return Ok(cached.clone());
    }
    let found = lookup.find(id, resource_type).await?;
    self.cache.insert((resource_type, id), found.clone());
    Ok(found)
  }

  /// Seed the cache with a resource the caller already holds.
  pub fn remember(&mut self, resource: &Resource) {
    self
      .cache
      .insert((resource.resource_type, resource.id), Some(resource.clone()));
  }

  pub fn evict(&mut self, id: i32, resource_type: ResourceType) {
    self.cache.remove(&(resource_type, id));
  }

  pub fn clear(&mut self) { self.cache.clear(); }

  pub fn cached(&self) -> usize { self.cache.len() }
}

impl Drop for Session {
  fn drop(&mut self) {
    debug!(
      session = %self.id,
      cached = self.cache.len(),
      elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
      "session closed"
    );
  }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::atomic::{AtomicUsize, Ordering},
  };

  use super::*;

  #[derive(Default)]
  struct CountingLookup {
    calls: AtomicUsize,
  }

  impl ResourceLookup for CountingLookup {
    type Error = Infallible;

    async fn find(
      &self,
      id: i32,
      resource_type: ResourceType,
    ) -> Result<Option<Resource>, Infallible> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Ok((id % 2 == 0).then(|| Resource::new(id, resource_type)))
    }

    async fn all_ids(&self, _: ResourceType) -> Result<Vec<i32>, Infallible> {
      Ok(Vec::new())
    }
  }

  #[tokio::test]
  async fn hits_and_misses_are_cached() {
    let lookup = CountingLookup::default();
    let mut session = Session::open();

    assert!(session.resolve(&lookup, 2, ResourceType::ITEM).await.unwrap().is_some());
    assert!(session.resolve(&lookup, 2, ResourceType::ITEM).await.unwrap().is_some());
    assert!(session.resolve(&lookup, 3, ResourceType::ITEM).await.unwrap().is_none());
    assert!(session.resolve(&lookup, 3, ResourceType::ITEM).await.unwrap().is_none());
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);

    session.evict(2, ResourceType::ITEM);
    session.resolve(&lookup, 2, ResourceType::ITEM).await.unwrap();
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 3);
    assert_eq!(session.cached(), 2);
  }

  #[tokio::test]
  async fn remembered_resources_skip_the_lookup() {
    let lookup = CountingLookup::default();
    let mut session = Session::open();
    session.remember(&Resource::new(5, ResourceType::ITEM));
    let found = session.resolve(&lookup, 5, ResourceType::ITEM).await.unwrap();
    assert_eq!(found.map(|r| r.id), Some(5));
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
  }
}
