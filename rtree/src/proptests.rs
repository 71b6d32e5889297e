use super::*;

use common::shapes::{Cuboid, ParameterizedLine, Point3D, ShapeEnum, Sphere};
use proptest::prelude::*;
use std::collections::HashMap;

/// Side of the cube every generated shape lives in.
const GRID: i32 = 6;

type Model<V> = HashMap<Point3D, V>;

fn grid() -> Cuboid {
    Cuboid::from_coords([0, 0, 0], [GRID - 1, GRID - 1, GRID - 1])
}

/// Compares every grid point against the model, then the arena itself.
fn validate_tree<V: LeafValue, P: MergePolicy>(
    t: &RTree<V, P, 4>,
    m: &Model<V>,
) -> Result<(), TestCaseError> {
    let bounds = grid();
    for point in bounds.points() {
        prop_assert_eq!(
            t.query_get_one(&point).unwrap(),
            m.get(&point).copied(),
            "value at {:?}",
            point
        );
    }
    prop_assert_eq!(t.total_leaf_volume(), m.len() as u128);
    t.assert_invariants();
    Ok(())
}

#[derive(Clone, Debug)]
enum Op<V> {
    Insert(Cuboid, V),
    Remove(Cuboid),
    RemoveValue(Cuboid, V),
    Update(Cuboid, V, V),
    Prepare,
}

fn point_strategy() -> impl Strategy<Value = Point3D> + Clone {
    prop::array::uniform3(0..GRID).prop_map(Point3D::from_array)
}

/// Boxes up to three cells wide per axis, clipped to the grid.
fn cuboid_strategy(max_z_size: i32) -> impl Strategy<Value = Cuboid> + Clone {
    (
        prop::array::uniform3(0..GRID),
        prop::array::uniform3(0..3i32),
    )
        .prop_map(move |(low, size)| {
            let high = [
                (low[0] + size[0]).min(GRID - 1),
                (low[1] + size[1]).min(GRID - 1),
                (low[2] + size[2].min(max_z_size)).min(GRID - 1),
            ];
            Cuboid::from_coords(low, high)
        })
}

fn ops_strategy_u8() -> impl Strategy<Value = Vec<Op<u8>>> {
    let cuboid = cuboid_strategy(2);
    let value = 0u8..3;
    let op = prop_oneof![
        40 => (cuboid.clone(), value.clone()).prop_map(|(c, v)| Op::Insert(c, v)),
        20 => cuboid.clone().prop_map(Op::Remove),
        15 => (cuboid.clone(), value.clone()).prop_map(|(c, v)| Op::RemoveValue(c, v)),
        15 => (cuboid.clone(), value.clone(), value.clone())
            .prop_map(|(c, old, new)| Op::Update(c, old, new)),
        10 => Just(Op::Prepare),
    ];
    prop::collection::vec(op, 0..=60)
}

fn ops_strategy_flat() -> impl Strategy<Value = Vec<Op<()>>> {
    let cuboid = cuboid_strategy(0);
    let op = prop_oneof![
        60 => cuboid.clone().prop_map(|c| Op::Insert(c, ())),
        30 => cuboid.clone().prop_map(Op::Remove),
        10 => Just(Op::Prepare),
    ];
    prop::collection::vec(op, 0..=60)
}

fn shape_strategy() -> impl Strategy<Value = ShapeEnum> {
    let point = point_strategy();
    prop_oneof![
        point.clone().prop_map(ShapeEnum::Point),
        cuboid_strategy(2).prop_map(ShapeEnum::Cuboid),
        (point.clone(), 0..4i32).prop_map(|(c, r)| ShapeEnum::Sphere(Sphere::new(c, r))),
        (point.clone(), point)
            .prop_filter("a line needs two distinct ends", |(a, b)| a != b)
            .prop_map(|(a, b)| ShapeEnum::Line(ParameterizedLine::new(a, b))),
    ]
}

fn apply<V: LeafValue, P: MergePolicy>(t: &mut RTree<V, P, 4>, m: &mut Model<V>, op: Op<V>) {
    match op {
        Op::Insert(cuboid, value) => {
            t.insert(cuboid, value).unwrap();
            for point in cuboid.points() {
                m.insert(point, value);
            }
        }
        Op::Remove(cuboid) => {
            t.remove(cuboid).unwrap();
            for point in cuboid.points() {
                m.remove(&point);
            }
        }
        Op::RemoveValue(cuboid, value) => {
            t.remove_value(cuboid, value).unwrap();
            for point in cuboid.points() {
                if m.get(&point) == Some(&value) {
                    m.remove(&point);
                }
            }
        }
        Op::Update(cuboid, old, new) => {
            t.update(cuboid, old, new).unwrap();
            for point in cuboid.points() {
                if let Some(value) = m.get_mut(&point) {
                    if *value == old {
                        *value = new;
                    }
                }
            }
        }
        Op::Prepare => {
            t.prepare();
            assert!(!t.can_prepare());
        }
    }
}

/// Brute force answer for the shapes whose hit test is exact on the grid.
fn model_hit<V>(m: &Model<V>, shape: &ShapeEnum) -> Option<bool> {
    match shape {
        ShapeEnum::Point(point) => Some(m.contains_key(point)),
        ShapeEnum::Cuboid(cuboid) => Some(m.keys().any(|point| cuboid.contains_point(point))),
        ShapeEnum::Sphere(sphere) => Some(m.keys().any(|point| sphere.contains_point(point))),
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_u8(ops in ops_strategy_u8()) {
        let mut t: RTreeData<u8, 4> = RTree::new();
        let mut m: Model<u8> = HashMap::new();

        for op in ops {
            apply(&mut t, &mut m, op);
            validate_tree(&t, &m)?;
        }

        t.prepare();
        validate_tree(&t, &m)?;
        let mut values: Vec<u8> = t.query_get_all(&grid()).unwrap();
        values.sort_unstable();
        let mut expected: Vec<u8> = m.values().copied().collect();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn prop_low_z_leaves_stay_flat(ops in ops_strategy_flat()) {
        let mut t: RTreeBooleanLowZOnly<4> = RTree::new();
        let mut m: Model<()> = HashMap::new();

        for op in ops {
            apply(&mut t, &mut m, op);
        }
        t.prepare();
        validate_tree(&t, &m)?;
        for (leaf, _) in t.leaves() {
            prop_assert_eq!(leaf.low.z, leaf.high.z, "leaf {:?} spans z levels", leaf);
        }
    }

    #[test]
    fn prop_batch_matches_single(
        inserts in prop::collection::vec(cuboid_strategy(2), 0..30),
        removals in prop::collection::vec(cuboid_strategy(2), 0..10),
        shapes in prop::collection::vec(shape_strategy(), 1..20),
    ) {
        let mut t: RTreeBoolean<4> = RTree::new();
        let mut m: Model<()> = HashMap::new();
        for cuboid in inserts {
            apply(&mut t, &mut m, Op::Insert(cuboid, ()));
        }
        for cuboid in removals {
            apply(&mut t, &mut m, Op::Remove(cuboid));
        }

        let batch = t.batch_query(&shapes).unwrap();
        for (shape, hit) in shapes.iter().zip(&batch) {
            prop_assert_eq!(t.query(shape).unwrap(), *hit, "shape {:?}", shape);
            prop_assert_eq!(t.query_get_point(shape).unwrap().is_some(), *hit, "shape {:?}", shape);
            if let Some(expected) = model_hit(&m, shape) {
                prop_assert_eq!(*hit, expected, "shape {:?}", shape);
            }
        }
        prop_assert_eq!(t.batch_query_any(&shapes).unwrap(), batch.iter().any(|&hit| hit));

        t.prepare();
        prop_assert_eq!(t.batch_query(&shapes).unwrap(), batch);
    }

    #[test]
    fn prop_prepare_is_idempotent(ops in ops_strategy_u8()) {
        let mut t: RTreeData<u8, 4> = RTree::new();
        let mut m: Model<u8> = HashMap::new();
        for op in ops {
            apply(&mut t, &mut m, op);
        }

        t.prepare();
        let generation = t.generation();
        let snapshot = t.to_json().unwrap();
        t.prepare();
        prop_assert_eq!(t.generation(), generation);
        prop_assert_eq!(t.to_json().unwrap(), snapshot);
    }
}
