use std::mem::{align_of, size_of};

use corral::{AnyPool, Pool, BLOCK_CAP};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[test]
fn pool_block_is_contiguous_and_aligned() {
    let mut pool: Pool<Position> = Pool::new();

    for i in 0..BLOCK_CAP {
        let slot = pool.push(Position {
            x: i as f32,
            y: 0.0,
        });
        assert_eq!(slot as usize, i);
    }

    let slice = pool.block_slice(0);
    assert_eq!(slice.len(), BLOCK_CAP);
    assert_eq!(
        (slice.as_ptr() as usize) % align_of::<Position>(),
        0,
        "block base pointer must be aligned for Position"
    );

    let base = slice.as_ptr() as usize;
    for i in 0..BLOCK_CAP {
        let address = unsafe { slice.as_ptr().add(i) as usize };
        assert_eq!(
            address,
            base + i * size_of::<Position>(),
            "row {i} not at expected byte offset within its block"
        );
    }
}

#[test]
fn pool_crosses_block_boundary_as_expected() {
    let mut pool: Pool<u64> = Pool::new();

    for i in 0..(BLOCK_CAP + 1) {
        let slot = pool.push(i as u64);
        assert_eq!(slot as usize, i);
    }

    assert_eq!(pool.block_count(), 2);
    assert_eq!(pool.block_len(0), BLOCK_CAP);
    assert_eq!(pool.block_len(1), 1);
    assert_eq!(pool.length(), BLOCK_CAP + 1);
    assert_eq!(pool.get((BLOCK_CAP) as u32), Some(&(BLOCK_CAP as u64)));
}

#[test]
fn pool_take_moves_the_last_element_into_the_gap() {
    let mut pool: Pool<u64> = Pool::new();
    for i in 0..5u64 {
        pool.push(i);
    }

    let (value, moved_from) = pool.take(1);
    assert_eq!(value, 1);
    assert_eq!(moved_from, Some(4));
    assert_eq!(pool.get(1), Some(&4));
    assert_eq!(pool.length(), 4);

    // Removing the final element performs no swap.
    let (value, moved_from) = pool.take(3);
    assert_eq!(value, 3);
    assert_eq!(moved_from, None);
}

#[test]
fn pool_releases_blocks_that_become_empty() {
    let mut pool: Pool<u32> = Pool::new();
    for i in 0..(BLOCK_CAP + 1) {
        pool.push(i as u32);
    }
    assert_eq!(pool.block_count(), 2);

    pool.swap_remove(BLOCK_CAP as u32);
    assert_eq!(pool.block_count(), 1);
    assert_eq!(pool.block_len(0), BLOCK_CAP);
}

#[test]
fn pool_rejects_dynamic_values_of_the_wrong_type() {
    let mut pool: Pool<u32> = Pool::new();
    pool.push(1);

    let error = pool
        .push_dyn(Box::new("not a u32"))
        .expect_err("string must not enter a u32 pool");
    assert_eq!(error.expected, std::any::TypeId::of::<u32>());
    assert_eq!(pool.length(), 1, "failed push must leave the pool unchanged");
}
