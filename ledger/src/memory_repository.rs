use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::repository::{Repository, UnitOfWork};

/// Entities stored through a `Repository` carry their own id accessor so the
/// generic in-memory/transactional wrappers don't need a separate id field.
pub trait Identifiable {
    fn id(&self) -> u64;
}

/// Reference in-memory `Repository` implementation, used by the exchange
/// binary's smoke run and by tests that don't need a real Postgres instance.
pub struct InMemoryRepository<T> {
    rows: RwLock<HashMap<u64, T>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T> Repository<T, u64> for InMemoryRepository<T>
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    type Error = Infallible;

    async fn insert(&self, entity: &T) -> Result<u64, Self::Error> {
        let id = entity.id();
        self.rows.write().insert(id, entity.clone());
        Ok(id)
    }

    async fn update(&self, id: u64, entity: &T) -> Result<(), Self::Error> {
        self.rows.write().insert(id, entity.clone());
        Ok(())
    }

    async fn get(&self, id: u64) -> Result<Option<T>, Self::Error> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn query(&self, predicate: &(dyn for<'r> Fn(&'r T) -> bool + Send + Sync)) -> Result<Vec<T>, Self::Error> {
        let all: Vec<T> = self.rows.read().values().cloned().collect();
        Ok(all.into_iter().filter(|row| predicate(row)).collect())
    }
}

/// No-op unit of work for the in-memory repository: there is nothing to
/// stage, every `Repository` call above already commits immediately.
pub struct InMemoryUnitOfWork;

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Error = Infallible;

    async fn commit(self: Box<Self>) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        id: u64,
        value: i64,
    }

    impl Identifiable for Row {
        fn id(&self) -> u64 {
            self.id
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let repo = InMemoryRepository::<Row>::new();
        repo.insert(&Row { id: 1, value: 42 }).await.unwrap();
        let found = repo.get(1).await.unwrap().unwrap();
        assert_eq!(found.value, 42);
    }

    #[tokio::test]
    async fn query_filters_by_predicate() {
        let repo = InMemoryRepository::<Row>::new();
        repo.insert(&Row { id: 1, value: 1 }).await.unwrap();
        repo.insert(&Row { id: 2, value: 2 }).await.unwrap();
        let found = repo.query(&|row: &Row| row.value > 1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }
}
