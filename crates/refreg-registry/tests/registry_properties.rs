//! Property tests over random operation sequences

#![allow(clippy::expect_used, missing_docs)]

use proptest::prelude::*;
use refreg_registry::{Identity, RecordId, Registry, RegistryError, RoleKind, RoleScope, RunState};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Op {
    Create,
    UpdateContent(usize),
    UpdateRefSpec(usize, String),
    UpdateDefault(String),
    Destroy(usize),
    StrangerUpdate(usize),
    SetState(RunState),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Create),
        4 => (0usize..8).prop_map(Op::UpdateContent),
        2 => (0usize..8, "[a-z]{0,4}").prop_map(|(i, s)| Op::UpdateRefSpec(i, s)),
        1 => "[a-z]{1,4}".prop_map(Op::UpdateDefault),
        1 => (0usize..8).prop_map(Op::Destroy),
        1 => (0usize..8).prop_map(Op::StrangerUpdate),
        1 => prop_oneof![Just(RunState::Ok), Just(RunState::ReadOnly), Just(RunState::Paused)]
            .prop_map(Op::SetState),
    ]
}

/// Expected per-record state
#[derive(Debug, Default)]
struct Model {
    seq: BTreeMap<RecordId, u64>,
    own_spec: BTreeMap<RecordId, String>,
    default_spec: String,
    next_id: u64,
    state: RunState,
}

fn pick(ids: &BTreeMap<RecordId, u64>, i: usize) -> RecordId {
    ids.keys().nth(i % ids.len().max(1)).copied().unwrap_or(RecordId(0))
}

proptest! {
    #[test]
    fn registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let owner = Identity::from_name("owner");
        let stranger = Identity::from_name("stranger");
        let mut reg = Registry::new(owner).expect("registry");
        let mut model = Model { next_id: 1, ..Model::default() };

        for op in ops {
            let writeable = model.state == RunState::Ok;
            match op {
                Op::Create => {
                    let result = reg.create(owner, "ipfs://x");
                    if writeable {
                        let id = result.expect("create");
                        prop_assert_eq!(id, RecordId(model.next_id));
                        model.next_id += 1;
                        model.seq.insert(id, 0);
                    } else {
                        prop_assert!(result.expect_err("gated").is_gate_denial());
                    }
                }
                Op::UpdateContent(i) => {
                    let id = pick(&model.seq, i);
                    let result = reg.update_content(owner, id, "ipfs://y");
                    match (writeable, model.seq.get_mut(&id)) {
                        (true, Some(seq)) => {
                            *seq += 1;
                            prop_assert_eq!(result, Ok(*seq));
                        }
                        (true, None) => {
                            prop_assert_eq!(result, Err(RegistryError::record_not_found(id)));
                        }
                        (false, _) => prop_assert!(result.expect_err("gated").is_gate_denial()),
                    }
                }
                Op::UpdateRefSpec(i, spec) => {
                    let id = pick(&model.seq, i);
                    let result = reg.update_ref_spec(owner, id, spec.clone());
                    if writeable && model.seq.contains_key(&id) {
                        prop_assert!(result.is_ok());
                        if spec.is_empty() {
                            model.own_spec.remove(&id);
                        } else {
                            model.own_spec.insert(id, spec);
                        }
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                Op::UpdateDefault(spec) => {
                    let result = reg.update_default_ref_spec(owner, spec.clone());
                    prop_assert_eq!(result.is_ok(), writeable);
                    if writeable {
                        model.default_spec = spec;
                    }
                }
                Op::Destroy(i) => {
                    let id = pick(&model.seq, i);
                    let result = reg.destroy(owner, id);
                    if writeable && model.seq.remove(&id).is_some() {
                        prop_assert!(result.is_ok());
                        model.own_spec.remove(&id);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                Op::StrangerUpdate(i) => {
                    let id = pick(&model.seq, i);
                    prop_assert!(reg.update_content(stranger, id, "ipfs://z").is_err());
                }
                Op::SetState(to) => {
                    reg.set_running_state(owner, to).expect("state");
                    model.state = to;
                }
            }
        }

        reg.set_running_state(owner, RunState::Ok).expect("resume");
        prop_assert_eq!(reg.next_record_id().expect("next"), RecordId(model.next_id));
        prop_assert_eq!(reg.record_count().expect("count"), model.seq.len());
        for (id, seq) in &model.seq {
            prop_assert_eq!(reg.read_seq_num(*id).expect("seq"), *seq);
            let expected = model
                .own_spec
                .get(id)
                .cloned()
                .unwrap_or_else(|| model.default_spec.clone());
            prop_assert_eq!(reg.read_ref_spec(*id).expect("spec"), expected);
        }
    }

    #[test]
    fn ref_spec_updates_never_touch_seq_num(specs in prop::collection::vec("[a-z]{1,6}", 1..20)) {
        let owner = Identity::from_name("owner");
        let mut reg = Registry::new(owner).expect("registry");
        let id = reg.create(owner, "ipfs://a").expect("create");
        reg.grant_role(owner, RoleKind::TokenManager, Identity::from_name("m"), id.into())
            .expect("grant");
        for spec in specs {
            reg.update_ref_spec(Identity::from_name("m"), id, spec).expect("spec");
        }
        prop_assert_eq!(reg.read_seq_num(id).expect("seq"), 0);
        prop_assert!(reg
            .has_role(RoleKind::TokenManager, &Identity::from_name("m"), RoleScope::Record(id))
            .expect("has_role"));
    }
}
