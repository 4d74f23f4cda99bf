//! # refreg-authorization - Role Registry
//!
//! Role membership (registry managers, token creators, per-record token
//! managers) and the authorization chains that decide who may perform each
//! registry operation. Chains are pure functions of an [`AuthContext`], so
//! they can be tested without a record store.

#![forbid(unsafe_code)]

/// Precedence-ordered authorization predicates
pub mod predicates;

/// Role kinds, scopes and membership sets
pub mod roles;

pub use predicates::{reasons, AuthContext, AuthorizationChain, Decision, Predicate};
pub use roles::{RoleKind, RoleRegistry, RoleScope, RoleSet};
