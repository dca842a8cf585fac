//! Property tests for ECS operations.
//!
//! These tests use `proptest` to generate random sequences of ECS and
//! sparse-set operations and check them against a simple `HashMap` model.

use std::collections::HashMap;

use ember_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Pos {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Tag(u32);

// ---------------------------------------------------------------------------
// Sparse set vs. model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SetOp {
    Emplace(u32, i64),
    Remove(u32),
    Get(u32),
    Mutate(u32, i64),
}

fn set_op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        (0..64u32, any::<i64>()).prop_map(|(k, v)| SetOp::Emplace(k, v)),
        (0..64u32).prop_map(SetOp::Remove),
        (0..64u32).prop_map(SetOp::Get),
        (0..64u32, any::<i64>()).prop_map(|(k, v)| SetOp::Mutate(k, v)),
    ]
}

// ---------------------------------------------------------------------------
// ECS vs. model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum EcsOp {
    Create,
    Destroy(usize),
    DestroyStale(usize),
    EmplacePos(usize, i32, i32),
    EmplaceTag(usize, u32),
    RemovePos(usize),
    RemoveTag(usize),
}

fn ecs_op_strategy() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        3 => Just(EcsOp::Create),
        1 => (0..100usize).prop_map(EcsOp::Destroy),
        1 => (0..100usize).prop_map(EcsOp::DestroyStale),
        1 => (0..100usize, any::<i32>(), any::<i32>()).prop_map(|(i, x, y)| EcsOp::EmplacePos(i, x, y)),
        1 => (0..100usize, any::<u32>()).prop_map(|(i, t)| EcsOp::EmplaceTag(i, t)),
        1 => (0..100usize).prop_map(EcsOp::RemovePos),
        1 => (0..100usize).prop_map(EcsOp::RemoveTag),
    ]
}

#[derive(Default)]
struct Model {
    pos: HashMap<Entity, Pos>,
    tag: HashMap<Entity, Tag>,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// Interleaved get/emplace/remove never reads a stale slot.
    #[test]
    fn sparse_set_matches_hash_map(ops in prop::collection::vec(set_op_strategy(), 1..200)) {
        let mut set = SparseSet::<i64, u32>::new();
        let mut model: HashMap<u32, i64> = HashMap::new();

        for op in ops {
            match op {
                SetOp::Emplace(k, v) => {
                    let inserted = set.emplace(k, v);
                    prop_assert_eq!(inserted, !model.contains_key(&k));
                    model.entry(k).or_insert(v);
                }
                SetOp::Remove(k) => {
                    prop_assert_eq!(set.remove(k), model.remove(&k));
                }
                SetOp::Get(k) => {
                    prop_assert_eq!(set.get(k), model.get(&k));
                }
                SetOp::Mutate(k, v) => {
                    if let Some(slot) = set.get_mut(k) {
                        *slot = v;
                    }
                    if let Some(slot) = model.get_mut(&k) {
                        *slot = v;
                    }
                }
            }

            prop_assert_eq!(set.len(), model.len());
            prop_assert_eq!(set.ids().len(), set.components().len());
            for (k, v) in set.iter() {
                prop_assert_eq!(model.get(&k), Some(v));
            }
            for k in 0..64u32 {
                prop_assert_eq!(set.contains(k), model.contains_key(&k));
            }
        }
    }

    #[test]
    fn ecs_random_ops_preserve_invariants(ops in prop::collection::vec(ecs_op_strategy(), 1..80)) {
        let mut ecs = Ecs::new();
        let mut alive: Vec<Entity> = Vec::new();
        let mut dead: Vec<Entity> = Vec::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                EcsOp::Create => {
                    let e = ecs.create_entity();
                    prop_assert!(!alive.contains(&e));
                    prop_assert!(!ecs.has_component::<Pos>(e));
                    prop_assert!(!ecs.has_component::<Tag>(e));
                    alive.push(e);
                }
                EcsOp::Destroy(i) => {
                    if !alive.is_empty() {
                        let e = alive.remove(i % alive.len());
                        prop_assert!(ecs.destroy_entity(e));
                        model.pos.remove(&e);
                        model.tag.remove(&e);
                        dead.push(e);
                    }
                }
                EcsOp::DestroyStale(i) => {
                    if !dead.is_empty() {
                        let e = dead[i % dead.len()];
                        prop_assert!(!ecs.destroy_entity(e));
                    }
                }
                EcsOp::EmplacePos(i, x, y) => {
                    if !alive.is_empty() {
                        let e = alive[i % alive.len()];
                        let ok = ecs.emplace_component(e, Pos { x, y });
                        prop_assert_eq!(ok, !model.pos.contains_key(&e));
                        model.pos.entry(e).or_insert(Pos { x, y });
                    }
                }
                EcsOp::EmplaceTag(i, t) => {
                    if !alive.is_empty() {
                        let e = alive[i % alive.len()];
                        let ok = ecs.emplace_component(e, Tag(t));
                        prop_assert_eq!(ok, !model.tag.contains_key(&e));
                        model.tag.entry(e).or_insert(Tag(t));
                    }
                }
                EcsOp::RemovePos(i) => {
                    if !alive.is_empty() {
                        let e = alive[i % alive.len()];
                        prop_assert_eq!(ecs.remove_component::<Pos>(e), model.pos.remove(&e));
                    }
                }
                EcsOp::RemoveTag(i) => {
                    if !alive.is_empty() {
                        let e = alive[i % alive.len()];
                        prop_assert_eq!(ecs.remove_component::<Tag>(e), model.tag.remove(&e));
                    }
                }
            }

            prop_assert_eq!(ecs.entity_count(), alive.len());
            for &e in &alive {
                prop_assert!(ecs.is_alive(e));
                prop_assert_eq!(ecs.get_component::<Pos>(e), model.pos.get(&e));
                prop_assert_eq!(ecs.get_component::<Tag>(e), model.tag.get(&e));
            }
            for &e in &dead {
                prop_assert!(!ecs.is_alive(e));
                prop_assert!(ecs.get_component::<Pos>(e).is_none());
                prop_assert!(ecs.get_component::<Tag>(e).is_none());
            }
            prop_assert_eq!(ecs.view::<Pos>().count(), model.pos.len());
            prop_assert_eq!(ecs.view::<Tag>().count(), model.tag.len());
        }
    }

    /// After destroying and recycling, every old handle stays rejected.
    #[test]
    fn stale_ids_detected_after_destroy_and_recycle(
        spawn_count in 1..30usize,
        destroy_indices in prop::collection::vec(0..30usize, 1..15),
    ) {
        let mut ecs = Ecs::new();
        let mut entities: Vec<Entity> = (0..spawn_count)
            .map(|i| {
                let e = ecs.create_entity();
                ecs.emplace_component(e, Tag(i as u32));
                e
            })
            .collect();

        let mut stale: Vec<Entity> = Vec::new();
        for &idx in &destroy_indices {
            if !entities.is_empty() {
                let e = entities.remove(idx % entities.len());
                ecs.destroy_entity(e);
                stale.push(e);
            }
        }

        for _ in 0..stale.len() {
            let e = ecs.create_entity();
            ecs.emplace_component(e, Tag(999));
            entities.push(e);
        }

        for &old in &stale {
            prop_assert!(!ecs.is_alive(old));
            prop_assert!(!ecs.has_component::<Tag>(old));
            prop_assert!(!ecs.destroy_entity(old));
        }
        for &e in &entities {
            prop_assert!(ecs.is_alive(e));
            prop_assert!(ecs.get_component::<Tag>(e).is_some());
        }
    }
}
