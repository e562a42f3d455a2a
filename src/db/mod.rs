pub mod nodestore;
pub mod dbnode;
pub mod memory;

pub use nodestore::{NodeStore, StoreError, StoreFuture};
pub use dbnode::PgNodeStore;
pub use memory::MemoryNodeStore;
