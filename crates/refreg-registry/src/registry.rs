//! Registry facade
//!
//! Every public operation runs the same sequence:
//!
//! 1. run-state guard for the operation kind (not-halted, readable or
//!    writeable), before anything else
//! 2. record existence, for record-scoped operations
//! 3. authorization chain
//! 4. input validation
//! 5. mutation of the role registry, record store and holder ledger
//! 6. commit of the staged change events
//!
//! Steps 1-4 never mutate, and step 5 performs its only fallible call (the
//! ledger) first, so a failed operation leaves no trace.

use refreg_authorization::{AuthContext, AuthorizationChain, RoleKind, RoleRegistry, RoleScope};
use refreg_core::{
    Identity, LoadableConfig, RecordId, RegistryConfig, RegistryError, Result, RunState,
    RunStateGate,
};
use refreg_journal::{ChangeEvent, ChangeLog, EventBatch, EventSink, LoggedEvent, RoleChange};
use refreg_store::{HolderLedger, InMemoryLedger, RecordContent, RecordStore, TransferHook};
use tracing::{debug, info};

/// Permissioned reference-metadata registry
#[derive(Debug)]
pub struct Registry<L: HolderLedger = InMemoryLedger> {
    owner: Identity,
    gate: RunStateGate,
    roles: RoleRegistry,
    store: RecordStore,
    ledger: L,
    log: ChangeLog,
}

impl Registry<InMemoryLedger> {
    /// Registry owned by `owner` with default configuration
    pub fn new(owner: Identity) -> Result<Self> {
        Self::with_config(owner, &RegistryConfig::default())
    }

    /// Registry owned by `owner`
    pub fn with_config(owner: Identity, config: &RegistryConfig) -> Result<Self> {
        Self::with_ledger(owner, config, InMemoryLedger::new())
    }
}

impl<L: HolderLedger> Registry<L> {
    /// Registry backed by an external holder ledger
    pub fn with_ledger(owner: Identity, config: &RegistryConfig, ledger: L) -> Result<Self> {
        if owner.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }
        config.validate()?;
        info!(owner = %owner, "registry created");
        Ok(Self {
            owner,
            gate: RunStateGate::new(),
            roles: RoleRegistry::new(),
            store: RecordStore::new(config.default_ref_spec.clone()),
            ledger,
            log: ChangeLog::from_config(config),
        })
    }

    pub(crate) fn from_parts(
        owner: Identity,
        gate: RunStateGate,
        roles: RoleRegistry,
        store: RecordStore,
        ledger: L,
        log: ChangeLog,
    ) -> Self {
        Self {
            owner,
            gate,
            roles,
            store,
            ledger,
            log,
        }
    }

    fn global_ctx(&self, caller: Identity) -> AuthContext<'_> {
        AuthContext::global(caller, self.owner, &self.roles)
    }

    fn record_ctx(&self, caller: Identity, id: RecordId) -> AuthContext<'_> {
        AuthContext::for_record(
            caller,
            self.owner,
            id,
            self.ledger.holder_of(id),
            &self.roles,
        )
    }

    /// Resolve the record a token-manager operation targets
    fn token_manager_record(&self, scope: RoleScope) -> Result<RecordId> {
        let id = scope.record().unwrap_or(RecordId(0));
        self.store.ensure_exists(id)?;
        Ok(id)
    }

    /// Existence and authorization for granting, revoking or enumerating
    /// `role`
    fn authorize_role_operation(
        &self,
        caller: Identity,
        role: RoleKind,
        scope: RoleScope,
    ) -> Result<()> {
        let chain = AuthorizationChain::for_role(role);
        if role.is_global() {
            chain.authorize(&self.global_ctx(caller))?;
        } else {
            let id = self.token_manager_record(scope)?;
            chain.authorize(&self.record_ctx(caller, id))?;
        }
        Ok(())
    }

    fn commit(&mut self, batch: EventBatch) -> Vec<LoggedEvent> {
        self.log.commit(batch)
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Mint a record held by the caller
    pub fn create(&mut self, caller: Identity, content_uri: impl Into<String>) -> Result<RecordId> {
        self.create_for(caller, caller, content_uri)
    }

    /// Mint a record held by `holder`
    pub fn create_for(
        &mut self,
        caller: Identity,
        holder: Identity,
        content_uri: impl Into<String>,
    ) -> Result<RecordId> {
        self.gate.assert_writeable()?;
        AuthorizationChain::create_record().authorize(&self.global_ctx(caller))?;

        let content_uri = content_uri.into();
        if content_uri.is_empty() {
            return Err(RegistryError::EmptyContent);
        }
        if holder.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }

        let id = self.store.allocatable_id()?;
        self.ledger.mint(id, holder)?;
        let inserted = self.store.insert(content_uri.clone())?;
        debug_assert_eq!(id, inserted);

        info!(caller = %caller, holder = %holder, record = %id, "record created");
        self.commit(
            ChangeEvent::RecordCreated {
                actor: caller,
                record: id,
                holder,
                content_uri,
            }
            .into(),
        );
        Ok(id)
    }

    /// Destroy a record, revoking every token manager and its reference
    /// spec first.
    ///
    /// Cost is linear in the record's token-manager count; callers needing
    /// predictable cost should revoke managers individually beforehand.
    pub fn destroy(&mut self, caller: Identity, id: RecordId) -> Result<()> {
        self.gate.assert_writeable()?;
        self.store.ensure_exists(id)?;
        AuthorizationChain::destroy_record().authorize(&self.record_ctx(caller, id))?;

        self.ledger.burn(id)?;

        let mut batch = EventBatch::new();
        let managers = self.roles.clear_record(id);
        for manager in &managers {
            batch.push_opt(ChangeEvent::role_changed(
                caller,
                RoleKind::TokenManager,
                *manager,
                Some(id),
                RoleChange::Revoke,
            ));
        }
        self.store.remove(id)?;
        batch.push(ChangeEvent::RecordDestroyed {
            actor: caller,
            record: id,
        });

        info!(
            caller = %caller,
            record = %id,
            managers_revoked = managers.len(),
            "record destroyed"
        );
        self.commit(batch);
        Ok(())
    }

    /// Current content URI
    pub fn read_content(&self, id: RecordId) -> Result<String> {
        self.gate.assert_readable()?;
        Ok(self.store.get(id)?.content_uri.clone())
    }

    /// Number of content updates since creation
    pub fn read_seq_num(&self, id: RecordId) -> Result<u64> {
        self.gate.assert_readable()?;
        Ok(self.store.get(id)?.seq_num)
    }

    /// Replace the content URI, returning the new sequence number
    pub fn update_content(
        &mut self,
        caller: Identity,
        id: RecordId,
        content_uri: impl Into<String>,
    ) -> Result<u64> {
        self.gate.assert_writeable()?;
        self.store.ensure_exists(id)?;
        AuthorizationChain::manage_record().authorize(&self.record_ctx(caller, id))?;

        let content_uri = content_uri.into();
        let seq_num = self.store.update_content(id, content_uri.clone())?;

        debug!(caller = %caller, record = %id, seq_num, "content updated");
        self.commit(
            ChangeEvent::ContentUpdated {
                actor: caller,
                record: id,
                content_uri,
                seq_num,
            }
            .into(),
        );
        Ok(seq_num)
    }

    /// Whether `id` names a live record
    pub fn exists(&self, id: RecordId) -> Result<bool> {
        self.gate.assert_not_halted()?;
        Ok(self.store.exists(id))
    }

    /// Current holder
    pub fn holder_of(&self, id: RecordId) -> Result<Identity> {
        self.gate.assert_readable()?;
        self.store.ensure_exists(id)?;
        self.ledger
            .holder_of(id)
            .ok_or_else(|| RegistryError::record_not_found(id))
    }

    /// Id the next minted record will receive
    pub fn next_record_id(&self) -> Result<RecordId> {
        self.gate.assert_readable()?;
        Ok(self.store.next_id())
    }

    /// Number of live records
    pub fn record_count(&self) -> Result<usize> {
        self.gate.assert_readable()?;
        Ok(self.store.len())
    }

    /// Holder-initiated transfer through the ledger. Token-manager grants
    /// stay with the record.
    pub fn transfer(&mut self, caller: Identity, id: RecordId, to: Identity) -> Result<()> {
        self.check_transfer(id, caller, to)?;

        let from = self.ledger.transfer(id, to)?;

        info!(record = %id, from = %from, to = %to, "record transferred");
        self.commit(
            ChangeEvent::HolderTransferred {
                actor: caller,
                record: id,
                from,
                to,
            }
            .into(),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reference specs
    // ------------------------------------------------------------------

    /// Set a record's own reference spec. The sequence number is untouched.
    pub fn update_ref_spec(
        &mut self,
        caller: Identity,
        id: RecordId,
        ref_spec: impl Into<String>,
    ) -> Result<()> {
        self.gate.assert_writeable()?;
        self.store.ensure_exists(id)?;
        AuthorizationChain::manage_record().authorize(&self.record_ctx(caller, id))?;

        let ref_spec = ref_spec.into();
        self.store.set_ref_spec(id, ref_spec.clone())?;
        let seq_num = self.store.get(id)?.seq_num;

        debug!(caller = %caller, record = %id, "reference spec updated");
        self.commit(
            ChangeEvent::RefSpecUpdated {
                actor: caller,
                record: id,
                seq_num,
                ref_spec,
            }
            .into(),
        );
        Ok(())
    }

    /// Own reference spec if set, else the registry default
    pub fn read_ref_spec(&self, id: RecordId) -> Result<String> {
        self.gate.assert_readable()?;
        Ok(self.store.effective_ref_spec(id)?.to_string())
    }

    /// Registry-wide default reference spec
    pub fn default_ref_spec(&self) -> Result<String> {
        self.gate.assert_readable()?;
        Ok(self.store.default_ref_spec().to_string())
    }

    /// Replace the registry-wide default reference spec
    pub fn update_default_ref_spec(
        &mut self,
        caller: Identity,
        ref_spec: impl Into<String>,
    ) -> Result<()> {
        self.gate.assert_writeable()?;
        AuthorizationChain::administer().authorize(&self.global_ctx(caller))?;

        let ref_spec = ref_spec.into();
        self.store.set_default_ref_spec(ref_spec.clone());

        let next_record_id = self.store.next_id();
        debug!(caller = %caller, "default reference spec updated");
        self.commit(
            ChangeEvent::DefaultRefSpecUpdated {
                actor: caller,
                next_record_id,
                ref_spec,
            }
            .into(),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Grant `role` to `identity`. Re-granting an existing member succeeds.
    pub fn grant_role(
        &mut self,
        caller: Identity,
        role: RoleKind,
        identity: Identity,
        scope: RoleScope,
    ) -> Result<()> {
        self.change_role(caller, role, identity, scope, RoleChange::Grant)
    }

    /// Revoke `role` from `identity`. Revoking a non-member succeeds and is
    /// still logged.
    pub fn revoke_role(
        &mut self,
        caller: Identity,
        role: RoleKind,
        identity: Identity,
        scope: RoleScope,
    ) -> Result<()> {
        self.change_role(caller, role, identity, scope, RoleChange::Revoke)
    }

    fn change_role(
        &mut self,
        caller: Identity,
        role: RoleKind,
        identity: Identity,
        scope: RoleScope,
        change: RoleChange,
    ) -> Result<()> {
        self.gate.assert_writeable()?;
        self.authorize_role_operation(caller, role, scope)?;
        if identity.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }

        let record = if role.is_global() {
            None
        } else {
            scope.record()
        };
        let changed = match change {
            RoleChange::Grant => self.roles.grant(role, identity, scope)?,
            RoleChange::Revoke => self.roles.revoke(role, &identity, scope)?,
        };

        debug!(
            caller = %caller,
            role = %role,
            target = %identity,
            record = ?record,
            %change,
            changed,
            "role membership updated"
        );
        let mut batch = EventBatch::new();
        batch.push_opt(ChangeEvent::role_changed(
            caller, role, identity, record, change,
        ));
        self.commit(batch);
        Ok(())
    }

    /// Pure membership query; only a halted registry refuses it
    pub fn has_role(&self, role: RoleKind, identity: &Identity, scope: RoleScope) -> Result<bool> {
        self.gate.assert_not_halted()?;
        Ok(self.roles.has_role(role, identity, scope))
    }

    /// Number of members of `role` in `scope`
    pub fn role_count(&self, caller: Identity, role: RoleKind, scope: RoleScope) -> Result<usize> {
        self.gate.assert_readable()?;
        self.authorize_role_operation(caller, role, scope)?;
        Ok(self.roles.count(role, scope))
    }

    /// Member of `role` at `index`.
    ///
    /// Positions follow insertion order but revocation swaps the last member
    /// into the vacated slot.
    pub fn role_member_at(
        &self,
        caller: Identity,
        role: RoleKind,
        index: usize,
        scope: RoleScope,
    ) -> Result<Identity> {
        self.gate.assert_readable()?;
        self.authorize_role_operation(caller, role, scope)?;
        self.roles.member_at(role, index, scope)
    }

    /// All members of `role` in enumeration order
    pub fn role_members(
        &self,
        caller: Identity,
        role: RoleKind,
        scope: RoleScope,
    ) -> Result<Vec<Identity>> {
        self.gate.assert_readable()?;
        self.authorize_role_operation(caller, role, scope)?;
        Ok(self.roles.members(role, scope))
    }

    // ------------------------------------------------------------------
    // Run state and ownership
    // ------------------------------------------------------------------

    /// Move the run state. Halting needs the owner and cannot be undone.
    pub fn set_running_state(&mut self, caller: Identity, to: RunState) -> Result<()> {
        self.gate.assert_not_halted()?;
        AuthorizationChain::change_run_state(to).authorize(&self.global_ctx(caller))?;

        let from = self.gate.transition(to)?;

        info!(caller = %caller, from = %from, to = %to, "run state changed");
        self.commit(
            ChangeEvent::RunStateChanged {
                actor: caller,
                from,
                to,
            }
            .into(),
        );
        Ok(())
    }

    /// Current run state.
    ///
    /// Fails with `Halted` once halted, like every other operation, so a
    /// halted registry cannot be told apart from an unreachable one here.
    pub fn running_state(&self) -> Result<RunState> {
        self.gate.assert_not_halted()?;
        Ok(self.gate.state())
    }

    /// Registry owner
    pub fn owner(&self) -> Result<Identity> {
        self.gate.assert_not_halted()?;
        Ok(self.owner)
    }

    /// Hand registry ownership to `new_owner`. Registry managers are kept.
    pub fn transfer_ownership(&mut self, caller: Identity, new_owner: Identity) -> Result<()> {
        self.gate.assert_writeable()?;
        AuthorizationChain::transfer_ownership().authorize(&self.global_ctx(caller))?;
        if new_owner.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }

        let previous = std::mem::replace(&mut self.owner, new_owner);

        info!(previous = %previous, owner = %new_owner, "registry ownership transferred");
        self.commit(
            ChangeEvent::OwnershipTransferred {
                previous,
                owner: new_owner,
            }
            .into(),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Change log
    // ------------------------------------------------------------------

    /// Audit trail of committed events. Not gated, so it stays readable
    /// after a halt.
    pub fn change_log(&self) -> &ChangeLog {
        &self.log
    }

    /// Attach a sink for events committed from now on
    pub fn add_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.log.add_sink(sink);
    }

    pub(crate) fn owner_unchecked(&self) -> Identity {
        self.owner
    }

    pub(crate) fn gate(&self) -> &RunStateGate {
        &self.gate
    }

    pub(crate) fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub(crate) fn store(&self) -> &RecordStore {
        &self.store
    }

    pub(crate) fn ledger(&self) -> &L {
        &self.ledger
    }
}

impl<L: HolderLedger> RecordContent for Registry<L> {
    fn content_uri(&self, id: RecordId) -> Result<String> {
        self.read_content(id)
    }

    fn seq_num(&self, id: RecordId) -> Result<u64> {
        self.read_seq_num(id)
    }
}

impl<L: HolderLedger> TransferHook for Registry<L> {
    fn check_transfer(&self, id: RecordId, from: Identity, to: Identity) -> Result<()> {
        self.gate.assert_writeable()?;
        self.store.ensure_exists(id)?;
        AuthorizationChain::transfer_record().authorize(&self.record_ctx(from, id))?;
        if to.is_zero() {
            return Err(RegistryError::InvalidIdentity);
        }
        Ok(())
    }
}
