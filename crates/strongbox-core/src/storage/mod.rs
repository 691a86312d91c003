mod memory;
mod port;

pub use memory::InMemoryStoragePort;
pub use port::{StorageError, StoragePort};
