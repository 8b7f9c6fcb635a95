use corral::{EcsError, EntityManager};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Mana(f32);

#[test]
fn created_entities_are_valid_and_counted() {
    let mut entities = EntityManager::new();
    assert_eq!(entities.count(), 0);

    let entity = entities.create();
    assert!(entities.is_valid(entity));
    assert_eq!(entities.count(), 1);
}

#[test]
fn destroy_invalidates_the_handle_for_every_operation() {
    let mut entities = EntityManager::new();
    let entity = entities.create();
    entities.add(entity, Health(5)).unwrap();

    entities.destroy(entity).unwrap();
    assert!(!entities.is_valid(entity));
    assert_eq!(entities.count(), 0);

    assert_eq!(entities.destroy(entity), Err(EcsError::InvalidEntity(entity)));
    assert_eq!(
        entities.get::<Health>(entity).err(),
        Some(EcsError::InvalidEntity(entity))
    );
    assert_eq!(
        entities.has::<(Health,)>(entity),
        Err(EcsError::InvalidEntity(entity))
    );
    assert_eq!(
        entities.add(entity, Mana(1.0)),
        Err(EcsError::InvalidEntity(entity))
    );
    assert_eq!(
        entities.remove::<Health>(entity),
        Err(EcsError::InvalidEntity(entity))
    );
}

#[test]
fn reused_index_carries_a_strictly_greater_generation() {
    let mut entities = EntityManager::new();
    let old = entities.create();
    entities.destroy(old).unwrap();

    let new = entities.create();
    assert_eq!(new.index(), old.index());
    assert!(
        new.generation() > old.generation(),
        "recycled index must not resurrect the old handle"
    );
    assert!(!entities.is_valid(old));
    assert!(entities.is_valid(new));
    assert_eq!(entities.entity_at(old.index()), Some(new));
}

#[test]
fn freed_indices_are_reused_in_the_order_they_were_freed() {
    let mut entities = EntityManager::new();
    let a = entities.create();
    let b = entities.create();

    entities.destroy(a).unwrap();
    entities.destroy(b).unwrap();

    let c = entities.create();
    let d = entities.create();
    assert_eq!(c.index(), a.index());
    assert_eq!(d.index(), b.index());
}

#[test]
fn bulk_creation_matches_creation_order() {
    let mut entities = EntityManager::new();
    let created = entities.create_many(100);

    assert_eq!(entities.count(), 100);
    assert_eq!(created.len(), 100);
    for (i, &entity) in created.iter().enumerate() {
        assert_eq!(
            entities.entity_at(i as u32),
            Some(entity),
            "handle {i} should be addressable by its creation index"
        );
    }

    for entity in created {
        entities.destroy(entity).unwrap();
    }
    assert_eq!(entities.count(), 0);
}

#[test]
fn destroy_wins_over_any_later_component_operation() {
    let mut entities = EntityManager::new();
    let entity = entities.create();
    entities.add(entity, Health(3)).unwrap();

    // Removing a component and then destroying is an ordinary sequence.
    entities.remove::<Health>(entity).unwrap();
    entities.destroy(entity).unwrap();

    // Any remove after destruction fails as a stale-handle use.
    assert_eq!(
        entities.remove::<Mana>(entity),
        Err(EcsError::InvalidEntity(entity))
    );
}
