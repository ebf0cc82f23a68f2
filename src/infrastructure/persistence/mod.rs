//! Storage backends implementing the domain repository traits.
//!
//! # Backends
//!
//! - [`PgLinkRepository`], [`PgClickRepository`], [`PgAccountRepository`],
//!   [`PgContactRepository`] - PostgreSQL via SQLx
//! - [`MemoryStore`] - Single-process store implementing every trait

pub mod memory;
pub mod pg_account_repository;
pub mod pg_click_repository;
pub mod pg_contact_repository;
pub mod pg_link_repository;

pub use memory::MemoryStore;
pub use pg_account_repository::PgAccountRepository;
pub use pg_click_repository::PgClickRepository;
pub use pg_contact_repository::PgContactRepository;
pub use pg_link_repository::PgLinkRepository;
