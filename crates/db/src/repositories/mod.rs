//! Repository implementations for post storage.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod memory;
pub mod post;
pub mod store;

pub use memory::InMemoryPostRepository;
pub use post::PostRepository;
pub use store::PostStore;
