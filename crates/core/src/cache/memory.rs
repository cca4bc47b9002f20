//! In-process cache backend.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheBackend, CacheEntry};
use crate::Error;

struct Generation {
    name: String,
    entries: Vec<CacheEntry>,
}

/// Cache backend held entirely in memory.
///
/// Generations and entries are kept in plain vectors so creation and
/// insertion order fall out of the layout.
#[derive(Default)]
pub struct MemoryBackend {
    generations: RwLock<Vec<Generation>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn create_generation(&self, generation: &str) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        if !generations.iter().any(|g| g.name == generation) {
            generations.push(Generation { name: generation.to_string(), entries: Vec::new() });
        }
        Ok(())
    }

    async fn generations(&self) -> Result<Vec<String>, Error> {
        Ok(self.generations.read().await.iter().map(|g| g.name.clone()).collect())
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|g| g.name != generation);
        Ok(generations.len() < before)
    }

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let generations = self.generations.read().await;
        Ok(generations
            .iter()
            .find(|g| g.name == generation)
            .and_then(|g| g.entries.iter().find(|e| e.key == key))
            .cloned())
    }

    async fn put(&self, generation: &str, entry: CacheEntry) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let index = match generations.iter().position(|g| g.name == generation) {
            Some(index) => index,
            None => {
                generations.push(Generation { name: generation.to_string(), entries: Vec::new() });
                generations.len() - 1
            }
        };

        let entries = &mut generations[index].entries;
        entries.retain(|e| e.key != entry.key);
        entries.push(entry);
        Ok(())
    }

    async fn delete(&self, generation: &str, key: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        let Some(g) = generations.iter_mut().find(|g| g.name == generation) else {
            return Ok(false);
        };
        let before = g.entries.len();
        g.entries.retain(|e| e.key != key);
        Ok(g.entries.len() < before)
    }

    async fn keys(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generations = self.generations.read().await;
        Ok(generations
            .iter()
            .find(|g| g.name == generation)
            .map(|g| g.entries.iter().map(|e| e.key.clone()).collect())
            .unwrap_or_default())
    }

    async fn evict_oldest(&self, generation: &str, keep: usize) -> Result<u64, Error> {
        let mut generations = self.generations.write().await;
        let Some(g) = generations.iter_mut().find(|g| g.name == generation) else {
            return Ok(0);
        };
        let excess = g.entries.len().saturating_sub(keep);
        g.entries.drain(..excess);
        Ok(excess as u64)
    }
}
