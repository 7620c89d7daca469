use super::*;
use crate::device::{DescriptorSetLayoutDesc, MockGraphicsDevice, MockObjectKind};
use crate::test_support::quiet_config;

fn setup(capacity: u32) -> (MockGraphicsDevice, DescriptorPoolAllocator, DescriptorSetLayoutHandle) {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let config = RenderConfig {
        descriptor_pool_capacity: capacity,
        ..quiet_config()
    };
    (device, DescriptorPoolAllocator::new(&config), layout)
}

#[test]
fn test_first_allocation_creates_pool() {
    let (mut device, mut alloc, layout) = setup(4);
    assert_eq!(alloc.pool_count(), 0);

    let set = alloc.allocate_set(&mut device, layout, 0);
    assert!(!set.is_null());
    assert_eq!(set.pool, PoolId::General(0));
    assert_eq!(alloc.pool_count(), 1);
}

#[test]
fn test_n_plus_one_allocations_create_second_pool() {
    let (mut device, mut alloc, layout) = setup(3);

    let sets: Vec<DescriptorSet> = (0..4).map(|_| alloc.allocate_set(&mut device, layout, 7)).collect();

    assert!(sets.iter().all(|s| !s.is_null()));
    assert_eq!(alloc.pool_count(), 2);
    assert_eq!(sets[3].pool, PoolId::General(1));
    assert_eq!(device.live_count(MockObjectKind::DescriptorPool), 2);
}

#[test]
fn test_counter_never_exceeds_capacity() {
    let (mut device, mut alloc, layout) = setup(2);
    for _ in 0..9 {
        alloc.allocate_set(&mut device, layout, 0);
    }
    for stats in alloc.pool_stats() {
        assert!(stats.allocated <= stats.capacity);
    }
    assert_eq!(alloc.pool_count(), 5);
}

#[test]
fn test_free_decrements_and_stamps_frame() {
    let (mut device, mut alloc, layout) = setup(4);
    let set = alloc.allocate_set(&mut device, layout, 1);
    alloc.allocate_set(&mut device, layout, 1);

    alloc.free_set(set, 5);

    let stats = alloc.pool_stats()[0];
    assert_eq!(stats.allocated, 1);
    assert_eq!(stats.last_frame, 5);
}

#[test]
fn test_double_free_is_reported_not_underflowed() {
    let (mut device, mut alloc, layout) = setup(4);
    let set = alloc.allocate_set(&mut device, layout, 0);

    alloc.free_set(set, 1);
    alloc.free_set(set, 1);

    assert_eq!(alloc.pool_stats()[0].allocated, 0);
}

#[test]
#[should_panic(expected = "double free")]
fn test_double_free_asserts_when_enabled() {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let config = RenderConfig {
        assert_on_protocol_violation: true,
        ..RenderConfig::default()
    };
    let mut alloc = DescriptorPoolAllocator::new(&config);
    let set = alloc.allocate_set(&mut device, layout, 0);
    alloc.free_set(set, 1);
    alloc.free_set(set, 1);
}

#[test]
fn test_freed_pool_is_recycled_once_aged() {
    let (mut device, mut alloc, layout) = setup(1);
    let first = alloc.allocate_set(&mut device, layout, 0);
    alloc.free_set(first, 1);

    // pool 0 is still the newest pool and serves the request directly
    let again = alloc.allocate_set(&mut device, layout, 1);
    assert_eq!(again.pool, PoolId::General(0));
    assert_eq!(alloc.pool_count(), 1);

    // fill a second pool, then free pool 0's set
    let second = alloc.allocate_set(&mut device, layout, 1);
    assert_eq!(second.pool, PoolId::General(1));
    alloc.free_set(again, 2);

    // frame 4: 2 + 2 < 4 is false, pool 0 is too young
    let third = alloc.allocate_set(&mut device, layout, 4);
    assert_eq!(third.pool, PoolId::General(2));

    // frame 5: pool 0 qualifies and is reset instead of creating pool 3
    let fourth = alloc.allocate_set(&mut device, layout, 5);
    assert_eq!(fourth.pool, PoolId::General(0));
    assert_eq!(alloc.pool_count(), 3);

    // recycled pool moved to the back of the list
    let order: Vec<PoolId> = alloc.pool_stats().iter().take(3).map(|s| s.id).collect();
    assert_eq!(order, vec![PoolId::General(1), PoolId::General(2), PoolId::General(0)]);
}

#[test]
fn test_pool_with_live_sets_is_never_reset() {
    let (mut device, mut alloc, layout) = setup(1);
    let kept = alloc.allocate_set(&mut device, layout, 0);

    for frame in 10..14 {
        alloc.allocate_set(&mut device, layout, frame);
    }

    assert!(!kept.is_null());
    let pool0 = alloc.pool_stats().into_iter().find(|s| s.id == PoolId::General(0)).unwrap();
    assert_eq!(pool0.allocated, 1);
}

#[test]
fn test_pool_ceiling_returns_null_set() {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let config = RenderConfig {
        descriptor_pool_capacity: 1,
        max_descriptor_pools: 2,
        ..quiet_config()
    };
    let mut alloc = DescriptorPoolAllocator::new(&config);

    assert!(!alloc.allocate_set(&mut device, layout, 0).is_null());
    assert!(!alloc.allocate_set(&mut device, layout, 0).is_null());
    assert!(alloc.allocate_set(&mut device, layout, 0).is_null());
    assert_eq!(alloc.pool_count(), 2);
}

#[test]
fn test_pool_creation_failure_returns_null_set() {
    let (mut device, mut alloc, layout) = setup(4);
    device.fail_pool_creation = true;
    assert!(alloc.allocate_set(&mut device, layout, 0).is_null());
    assert_eq!(alloc.pool_count(), 0);
}

#[test]
fn test_ui_pool_is_separate_and_bounded() {
    let mut device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc::default()).unwrap();
    let config = RenderConfig {
        ui_descriptor_pool_capacity: 2,
        ..quiet_config()
    };
    let mut alloc = DescriptorPoolAllocator::new(&config);

    let a = alloc.allocate_ui_set(&mut device, layout, 0);
    let b = alloc.allocate_ui_set(&mut device, layout, 0);
    let c = alloc.allocate_ui_set(&mut device, layout, 0);

    assert_eq!(a.pool, PoolId::Ui);
    assert!(!b.is_null());
    assert!(c.is_null());
    assert_eq!(alloc.pool_count(), 0);

    alloc.free_set(a, 3);
    let ui = alloc.pool_stats().into_iter().find(|s| s.id == PoolId::Ui).unwrap();
    assert_eq!(ui.allocated, 1);
}

#[test]
fn test_bindless_pool_uses_update_after_bind() {
    let (mut device, mut alloc, layout) = setup(4);
    let set = alloc.allocate_bindless_set(&mut device, layout, 128, 0);
    assert_eq!(set.pool, PoolId::Bindless);
    assert!(!set.is_null());
    assert_eq!(alloc.pool_count(), 0);
}

#[test]
fn test_cleanup_destroys_every_pool() {
    let (mut device, mut alloc, layout) = setup(1);
    alloc.allocate_set(&mut device, layout, 0);
    alloc.allocate_set(&mut device, layout, 0);
    alloc.allocate_ui_set(&mut device, layout, 0);
    alloc.allocate_bindless_set(&mut device, layout, 16, 0);
    assert_eq!(device.live_count(MockObjectKind::DescriptorPool), 4);

    alloc.cleanup(&mut device);
    assert_eq!(device.live_count(MockObjectKind::DescriptorPool), 0);
    assert!(alloc.pool_stats().is_empty());
}
