mod storage;
mod store;

pub use storage::{CredentialStorage, FileStorage, MemoryStorage};
pub use store::{Subscription, TokenStore};
