use async_trait::async_trait;

/// Abstract persistence contract for entities that live beyond the
/// in-memory `Ledger`/order book (orders, trades, audit rows). Deliberately
/// storage-agnostic: the spec scopes out a prescribed schema, only the
/// contract is in scope.
#[async_trait]
pub trait Repository<T, Id>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn insert(&self, entity: &T) -> Result<Id, Self::Error>;
    async fn update(&self, id: Id, entity: &T) -> Result<(), Self::Error>;
    async fn get(&self, id: Id) -> Result<Option<T>, Self::Error>;
    async fn query(&self, predicate: &(dyn for<'r> Fn(&'r T) -> bool + Send + Sync)) -> Result<Vec<T>, Self::Error>;
}

/// Transactional boundary around a group of repository calls. `commit`
/// consumes `self`; dropping a `UnitOfWork` without committing rolls back.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn commit(self: Box<Self>) -> Result<(), Self::Error>;
    async fn rollback(self: Box<Self>) -> Result<(), Self::Error>;
}
