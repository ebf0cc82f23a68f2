//! Repository trait definitions for the domain layer.
//!
//! These traits abstract data access following the Repository pattern and
//! are implemented in `crate::infrastructure::persistence`:
//!
//! - PostgreSQL implementations for production
//! - [`crate::infrastructure::persistence::MemoryStore`] for single-node
//!   development and tests
//! - `mockall` mocks under `cfg(test)`
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Link storage with insert-if-absent code uniqueness
//! - [`ClickRepository`] - Append-only click events and their rollups
//! - [`AccountRepository`] - Accounts and email verification tokens
//! - [`ContactRepository`] - Contact form submissions

pub mod account_repository;
pub mod click_repository;
pub mod contact_repository;
pub mod link_repository;

pub use account_repository::AccountRepository;
pub use click_repository::ClickRepository;
pub use contact_repository::ContactRepository;
pub use link_repository::LinkRepository;

#[cfg(test)]
pub use account_repository::MockAccountRepository;
#[cfg(test)]
pub use click_repository::MockClickRepository;
#[cfg(test)]
pub use contact_repository::MockContactRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
