//! Precedence-ordered authorization chains
//!
//! Every privileged operation is guarded by an [`AuthorizationChain`]: an
//! ordered list of [`Predicate`]s evaluated short-circuit against an
//! [`AuthContext`]. Chains are always built in the precedence
//! owner → holder → registry manager → role-specific manager. The first
//! satisfied predicate allows the call; if none is satisfied the chain's
//! denial reason is returned verbatim.

use refreg_core::{Identity, RecordId, RegistryError, Result, RunState};

use crate::roles::{RoleKind, RoleRegistry, RoleScope};

/// Denial reasons surfaced in `RegistryError::Unauthorized`
pub mod reasons {
    /// Halting needs the registry owner
    pub const MUST_BE_OWNER_TO_HALT: &str = "must be owner to halt";
    /// Administrative operation
    pub const MUST_BE_REGISTRY_MANAGER: &str = "must be registry manager";
    /// Record-scoped content or manager operation
    pub const MUST_BE_TOKEN_MANAGER: &str = "must be token manager";
    /// Minting
    pub const MUST_BE_CREATOR: &str = "must be creator";
    /// Record destruction
    pub const MUST_BE_HOLDER_OR_REGISTRY_MANAGER: &str = "must be holder or registry manager";
    /// Ownership hand-over
    pub const MUST_BE_OWNER: &str = "must be owner";
    /// Holder-initiated transfer
    pub const MUST_BE_HOLDER: &str = "must be holder";
}

/// Facts an authorization chain is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
    /// Identity making the call
    pub caller: Identity,
    /// Registry owner
    pub owner: Identity,
    /// Target record, for record-scoped checks
    pub record: Option<RecordId>,
    /// Current holder of the target record
    pub holder: Option<Identity>,
    /// Role membership
    pub roles: &'a RoleRegistry,
}

impl<'a> AuthContext<'a> {
    /// Context for a registry-wide check
    pub fn global(caller: Identity, owner: Identity, roles: &'a RoleRegistry) -> Self {
        Self {
            caller,
            owner,
            record: None,
            holder: None,
            roles,
        }
    }

    /// Context for a check against an existing record
    pub fn for_record(
        caller: Identity,
        owner: Identity,
        record: RecordId,
        holder: Option<Identity>,
        roles: &'a RoleRegistry,
    ) -> Self {
        Self {
            caller,
            owner,
            record: Some(record),
            holder,
            roles,
        }
    }
}

/// A single authorization test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Caller is the registry owner
    RegistryOwner,
    /// Caller holds the target record (record-scoped checks only)
    RecordHolder,
    /// Caller is a registry manager
    RegistryManager,
    /// Caller manages the target record
    TokenManager,
    /// Caller may mint records
    TokenCreator,
}

impl Predicate {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::RegistryOwner => "registry-owner",
            Predicate::RecordHolder => "record-holder",
            Predicate::RegistryManager => "registry-manager",
            Predicate::TokenManager => "token-manager",
            Predicate::TokenCreator => "token-creator",
        }
    }

    /// Evaluate against `ctx`
    pub fn evaluate(&self, ctx: &AuthContext<'_>) -> bool {
        let caller = &ctx.caller;
        match self {
            Predicate::RegistryOwner => !caller.is_zero() && *caller == ctx.owner,
            Predicate::RecordHolder => ctx.record.is_some() && ctx.holder == Some(*caller),
            Predicate::RegistryManager => {
                ctx.roles
                    .has_role(RoleKind::RegistryManager, caller, RoleScope::Global)
            }
            Predicate::TokenManager => ctx.record.is_some_and(|id| {
                ctx.roles
                    .has_role(RoleKind::TokenManager, caller, RoleScope::Record(id))
            }),
            Predicate::TokenCreator => {
                ctx.roles
                    .has_role(RoleKind::TokenCreator, caller, RoleScope::Global)
            }
        }
    }
}

/// Outcome of evaluating a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Allowed by the first satisfied predicate
    Allow {
        /// Predicate that short-circuited the chain
        matched: Predicate,
    },
    /// No predicate satisfied
    Deny {
        /// Role-specific reason
        reason: &'static str,
    },
}

impl Decision {
    /// Whether the call is allowed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Ordered predicate list with a denial reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationChain {
    predicates: Vec<Predicate>,
    denial: &'static str,
}

impl AuthorizationChain {
    /// Empty chain that denies with `denial`
    pub fn new(denial: &'static str) -> Self {
        Self {
            predicates: Vec::new(),
            denial,
        }
    }

    /// Append a predicate at the lowest precedence
    pub fn then(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Predicates in evaluation order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Reason reported when every predicate fails
    pub fn denial_reason(&self) -> &'static str {
        self.denial
    }

    /// Evaluate short-circuit
    pub fn evaluate(&self, ctx: &AuthContext<'_>) -> Decision {
        self.predicates
            .iter()
            .find(|predicate| predicate.evaluate(ctx))
            .map(|matched| Decision::Allow { matched: *matched })
            .unwrap_or(Decision::Deny {
                reason: self.denial,
            })
    }

    /// Evaluate and convert a denial into `RegistryError::Unauthorized`
    pub fn authorize(&self, ctx: &AuthContext<'_>) -> Result<Predicate> {
        match self.evaluate(ctx) {
            Decision::Allow { matched } => {
                tracing::trace!(caller = %ctx.caller, predicate = matched.name(), "authorized");
                Ok(matched)
            }
            Decision::Deny { reason } => {
                tracing::debug!(
                    caller = %ctx.caller,
                    record = ?ctx.record,
                    reason,
                    "authorization denied"
                );
                Err(RegistryError::unauthorized(reason))
            }
        }
    }

    /// Minting: owner, registry manager or token creator
    pub fn create_record() -> Self {
        Self::new(reasons::MUST_BE_CREATOR)
            .then(Predicate::RegistryOwner)
            .then(Predicate::RegistryManager)
            .then(Predicate::TokenCreator)
    }

    /// Destruction: owner, holder or registry manager, never token managers
    pub fn destroy_record() -> Self {
        Self::new(reasons::MUST_BE_HOLDER_OR_REGISTRY_MANAGER)
            .then(Predicate::RegistryOwner)
            .then(Predicate::RecordHolder)
            .then(Predicate::RegistryManager)
    }

    /// Content and spec updates, and token-manager grants for a record
    pub fn manage_record() -> Self {
        Self::new(reasons::MUST_BE_TOKEN_MANAGER)
            .then(Predicate::RegistryOwner)
            .then(Predicate::RecordHolder)
            .then(Predicate::RegistryManager)
            .then(Predicate::TokenManager)
    }

    /// Registry-wide administration
    pub fn administer() -> Self {
        Self::new(reasons::MUST_BE_REGISTRY_MANAGER)
            .then(Predicate::RegistryOwner)
            .then(Predicate::RegistryManager)
    }

    /// Granting, revoking or enumerating `role`
    pub fn for_role(role: RoleKind) -> Self {
        if role.is_global() {
            Self::administer()
        } else {
            Self::manage_record()
        }
    }

    /// Moving the run state to `to`
    pub fn change_run_state(to: RunState) -> Self {
        if to.requires_owner() {
            Self::new(reasons::MUST_BE_OWNER_TO_HALT).then(Predicate::RegistryOwner)
        } else {
            Self::administer()
        }
    }

    /// Handing registry ownership to another identity
    pub fn transfer_ownership() -> Self {
        Self::new(reasons::MUST_BE_OWNER).then(Predicate::RegistryOwner)
    }

    /// Holder-initiated record transfer
    pub fn transfer_record() -> Self {
        Self::new(reasons::MUST_BE_HOLDER).then(Predicate::RecordHolder)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn who(name: &str) -> Identity {
        Identity::from_name(name)
    }

    #[test]
    fn owner_short_circuits_before_roles() {
        let mut roles = RoleRegistry::new();
        roles
            .grant(RoleKind::RegistryManager, who("owner"), RoleScope::Global)
            .unwrap();
        let ctx = AuthContext::global(who("owner"), who("owner"), &roles);
        assert_eq!(
            AuthorizationChain::administer().evaluate(&ctx),
            Decision::Allow {
                matched: Predicate::RegistryOwner
            }
        );
    }

    #[test]
    fn holder_predicate_needs_a_record() {
        let roles = RoleRegistry::new();
        let ctx = AuthContext {
            caller: who("h"),
            owner: who("owner"),
            record: None,
            holder: Some(who("h")),
            roles: &roles,
        };
        assert!(!Predicate::RecordHolder.evaluate(&ctx));
    }

    #[test]
    fn zero_caller_is_never_owner() {
        let roles = RoleRegistry::new();
        let ctx = AuthContext::global(Identity::ZERO, Identity::ZERO, &roles);
        assert!(!Predicate::RegistryOwner.evaluate(&ctx));
    }

    #[test]
    fn token_manager_cannot_destroy() {
        let mut roles = RoleRegistry::new();
        roles
            .grant(RoleKind::TokenManager, who("x"), RecordId(1).into())
            .unwrap();
        let ctx = AuthContext::for_record(who("x"), who("owner"), RecordId(1), Some(who("h")), &roles);

        assert!(AuthorizationChain::manage_record().evaluate(&ctx).is_allowed());
        let err = AuthorizationChain::destroy_record().authorize(&ctx).unwrap_err();
        assert_eq!(
            err.denial_reason(),
            Some(reasons::MUST_BE_HOLDER_OR_REGISTRY_MANAGER)
        );
    }

    #[test]
    fn halting_requires_owner_even_for_managers() {
        let mut roles = RoleRegistry::new();
        roles
            .grant(RoleKind::RegistryManager, who("m"), RoleScope::Global)
            .unwrap();
        let ctx = AuthContext::global(who("m"), who("owner"), &roles);

        assert!(AuthorizationChain::change_run_state(RunState::Paused)
            .authorize(&ctx)
            .is_ok());
        assert_eq!(
            AuthorizationChain::change_run_state(RunState::Halted)
                .authorize(&ctx)
                .unwrap_err()
                .denial_reason(),
            Some(reasons::MUST_BE_OWNER_TO_HALT)
        );
    }

    #[test]
    fn chains_follow_precedence_order() {
        let order = |p: &Predicate| match p {
            Predicate::RegistryOwner => 0,
            Predicate::RecordHolder => 1,
            Predicate::RegistryManager => 2,
            Predicate::TokenManager | Predicate::TokenCreator => 3,
        };
        for chain in [
            AuthorizationChain::create_record(),
            AuthorizationChain::destroy_record(),
            AuthorizationChain::manage_record(),
            AuthorizationChain::administer(),
            AuthorizationChain::change_run_state(RunState::Halted),
        ] {
            let ranks: Vec<_> = chain.predicates().iter().map(order).collect();
            assert!(ranks.windows(2).all(|w| w[0] < w[1]), "{chain:?}");
        }
    }
}
