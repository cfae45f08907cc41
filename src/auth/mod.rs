//! # Accounts and Ownership
//!
//! The authenticated identity consumed by the core, and the ownership rule
//! applied to every owned entity.

pub mod account;
pub mod ownership;

pub use account::{Account, FamilyId, Role, UserId};
pub use ownership::{check_permission, Owner};
