use std::collections::HashSet;

use corral::{EcsError, EntityManager, Facet, BLOCK_CAP};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Mana(i32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Wheels {
    number: u32,
}

type Car<'m> = Facet<'m, (Wheels,)>;

#[test]
fn views_count_matching_groups() {
    let mut entities = EntityManager::new();

    let e1 = entities.create();
    let e2 = entities.create();
    let e3 = entities.create();
    let e4 = entities.create();

    entities.add(e1, Health(12)).unwrap();
    entities.add(e2, Health(12)).unwrap();
    entities.add(e3, Health(12)).unwrap();
    entities.add(e4, Health(100)).unwrap();
    assert_eq!(entities.with::<(Health,)>().count(), entities.count());

    entities.add(e1, Mana(0)).unwrap();
    entities.add(e2, Mana(0)).unwrap();
    assert_eq!(entities.with::<(Mana, Health)>().count(), 2);
}

#[test]
fn query_counts_are_order_independent() {
    let mut entities = EntityManager::new();
    for _ in 0..3 {
        entities.create_with((Health(1), Mana(2)));
    }
    entities.create_with((Health(1),));

    assert_eq!(
        entities.with::<(Mana, Health)>().count(),
        entities.with::<(Health, Mana)>().count()
    );
}

#[test]
fn disjoint_initial_sets_count_independently() {
    let mut entities = EntityManager::new();

    // Interleave the two kinds; counts must not depend on ordering.
    for i in 0..8 {
        entities.create_with((Health(i),));
        if i < 5 {
            entities.create_with((Mana(i),));
        }
    }

    assert_eq!(entities.with::<(Health,)>().count(), 8);
    assert_eq!(entities.with::<(Mana,)>().count(), 5);
}

#[test]
fn compaction_preserves_survivors() {
    let mut entities = EntityManager::new();
    let created: Vec<_> = (0..5)
        .map(|i| entities.create_with((Health(i),)))
        .collect();

    entities.destroy(created[2]).unwrap();

    let visited: HashSet<_> = entities.with::<(Health,)>().entities().collect();
    let expected: HashSet<_> = [created[0], created[1], created[3], created[4]]
        .into_iter()
        .collect();
    assert_eq!(visited, expected);
    assert_eq!(entities.with::<(Health,)>().count(), 4);

    // Values of the survivors are untouched by the swap fill.
    assert_eq!(*entities.get::<Health>(created[4]).unwrap(), Health(4));
}

#[test]
fn hundred_entities_roundtrip() {
    let mut entities = EntityManager::new();
    let mut created = Vec::new();
    for _ in 0..100 {
        created.push(entities.create_with((Health(10),)));
    }
    assert_eq!(entities.with::<(Health,)>().count(), 100);

    let mut observed = 0;
    entities.for_each1::<Health>(|health| {
        assert_eq!(health.0, 10);
        observed += 1;
    });
    assert_eq!(observed, 100);

    // Destroy back-to-front and front-to-back alternately.
    while let Some(entity) = created.pop() {
        entities.destroy(entity).unwrap();
        if let Some(entity) = (!created.is_empty()).then(|| created.remove(0)) {
            entities.destroy(entity).unwrap();
        }
    }
    assert_eq!(entities.count(), 0);
    assert_eq!(entities.with::<(Health,)>().count(), 0);
}

#[test]
fn bulk_callbacks_mutate_live_storage() {
    let mut entities = EntityManager::new();
    let moving = entities.create_with((
        Position { x: 0.0, y: 0.0 },
        Velocity { dx: 1.0, dy: 2.0 },
    ));
    entities.create_with((Position { x: 5.0, y: 5.0 },));

    entities.for_each2::<Position, Velocity>(|position, velocity| {
        position.x += velocity.dx;
        position.y += velocity.dy;
    });

    assert_eq!(
        *entities.get::<Position>(moving).unwrap(),
        Position { x: 1.0, y: 2.0 }
    );
}

#[test]
fn value_copies_taken_in_callbacks_are_independent() {
    let mut entities = EntityManager::new();
    let entity = entities.create_with((Health(2),));

    entities.for_each1::<Health>(|health| {
        let mut copy = *health;
        copy.0 = 10;
    });
    assert_eq!(*entities.get::<Health>(entity).unwrap(), Health(2));
}

#[test]
fn destroying_the_current_entity_during_streaming_is_safe() {
    let mut entities = EntityManager::new();
    let mut expected_survivors = HashSet::new();
    for i in 0..20 {
        let entity = entities.create_with((Health(if i % 3 == 0 { -1 } else { i }),));
        if i % 3 != 0 {
            expected_survivors.insert(entity);
        }
    }

    let mut visited = Vec::new();
    entities.for_each_entity::<(Health,)>(|entities, entity| {
        visited.push(entity);
        if entities.get::<Health>(entity).unwrap().0 <= 0 {
            entities.destroy(entity).unwrap();
        }
    });

    // Every entity visited exactly once, even across swap fills.
    let unique: HashSet<_> = visited.iter().copied().collect();
    assert_eq!(unique.len(), visited.len(), "no entity may be double-visited");
    assert_eq!(visited.len(), 20, "no entity may be skipped");

    let survivors: HashSet<_> = entities.with::<(Health,)>().entities().collect();
    assert_eq!(survivors, expected_survivors);
}

#[test]
fn iteration_spans_block_boundaries() {
    let mut entities = EntityManager::new();
    let total = BLOCK_CAP * 2 + 3;
    for i in 0..total {
        entities.create_with((Health(i as i32),));
    }

    assert_eq!(entities.with::<(Health,)>().count(), total);

    let mut sum: i64 = 0;
    entities.for_each1::<Health>(|health| sum += health.0 as i64);
    let expected: i64 = (0..total as i64).sum();
    assert_eq!(sum, expected);
}

#[test]
fn visitation_order_is_stable_between_evaluations() {
    let mut entities = EntityManager::new();
    for i in 0..10 {
        if i % 2 == 0 {
            entities.create_with((Health(i),));
        } else {
            entities.create_with((Health(i), Mana(i)));
        }
    }

    let first: Vec<_> = entities.with::<(Health,)>().entities().collect();
    let second: Vec<_> = entities.with::<(Health,)>().entities().collect();
    assert_eq!(first, second);
}

#[test]
fn views_visit_groups_in_creation_order() {
    let mut entities = EntityManager::new();
    let plain_first = entities.create_with((Health(0),));
    let combined = entities.create_with((Health(1), Mana(1)));
    let plain_second = entities.create_with((Health(2),));

    // The Health-only group was created before the Health+Mana group, so
    // both of its entities stream before the combined one.
    let order: Vec<_> = entities.with::<(Health,)>().entities().collect();
    assert_eq!(order, vec![plain_first, plain_second, combined]);
}

#[test]
fn facets_check_capabilities_at_construction() {
    let mut entities = EntityManager::new();
    let car_entity = entities.create_with((Wheels { number: 4 },));
    let pedestrian = entities.create();

    assert!(entities.can_project::<(Wheels,)>(car_entity));
    assert!(!entities.can_project::<(Wheels,)>(pedestrian));
    assert!(!entities.can_project::<(Wheels, Health)>(car_entity));

    let car: Car<'_> = entities.facet(car_entity).unwrap();
    assert_eq!(car.get::<Wheels, _>().number, 4);
    assert_eq!(car.entity(), car_entity);

    assert!(matches!(
        entities.facet::<(Wheels,)>(pedestrian),
        Err(EcsError::MissingCapability { .. })
    ));
}

#[test]
fn assume_adds_missing_components_default_constructed() {
    let mut entities = EntityManager::new();
    let entity = entities.create();

    {
        let car = entities.assume::<(Wheels,)>(entity).unwrap();
        assert_eq!(*car.get::<Wheels, _>(), Wheels::default());
    }
    assert!(entities.has::<(Wheels,)>(entity).unwrap());

    // A stale handle is still an error.
    entities.destroy(entity).unwrap();
    assert_eq!(
        entities.assume::<(Wheels,)>(entity).err(),
        Some(EcsError::InvalidEntity(entity))
    );
}

#[test]
fn fetch_every_streams_projections() {
    let mut entities = EntityManager::new();
    entities.create_with((Wheels { number: 4 },));
    entities.create();
    entities.create();

    assert_eq!(entities.fetch_every::<(Wheels,)>().count(), 1);

    let mut seen = 0;
    for car in entities.fetch_every::<(Wheels,)>() {
        assert_eq!(car.get::<Wheels, _>().number, 4);
        seen += 1;
    }
    assert_eq!(seen, 1);
}
