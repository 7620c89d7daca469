use super::*;
use crate::config::RenderConfig;
use crate::device::{MockGraphicsDevice, MockObjectKind};
use crate::test_support::quiet_config;

fn entry(i: u64) -> BindlessEntry {
    BindlessEntry {
        view: ImageViewHandle(1000 + i),
        sampler: SamplerHandle(2000 + i),
    }
}

fn setup(max: u32) -> (MockGraphicsDevice, DescriptorPoolAllocator, BindlessTextureTable) {
    let mut device = MockGraphicsDevice::new();
    let config = RenderConfig {
        max_bindless_textures: max,
        ..quiet_config()
    };
    let mut allocator = DescriptorPoolAllocator::new(&config);
    let table = BindlessTextureTable::new(&mut device, &mut allocator, max, 0).unwrap();
    (device, allocator, table)
}

fn written_views(device: &MockGraphicsDevice, set: DescriptorSetHandle) -> Vec<ImageViewHandle> {
    device
        .descriptor_writes(set)
        .into_iter()
        .filter_map(|w| match w.resource {
            DescriptorResource::SampledImage { view, .. } => Some(view),
            _ => None,
        })
        .collect()
}

#[test]
fn test_new_table_allocates_two_generations() {
    let (_device, _allocator, table) = setup(16);
    assert_ne!(table.generation_set(0), table.generation_set(1));
    assert!(!table.generation_set(0).is_null());
    assert!(table.is_empty());
    assert_eq!(table.max_textures(), 16);
}

#[test]
fn test_update_writes_inactive_and_swaps() {
    let (mut device, _allocator, mut table) = setup(16);
    let before = table.active_generation();

    let written = table.update(&mut device, &[entry(0), entry(1)]);

    assert_eq!(written, 2);
    assert_ne!(table.active_generation(), before);
    assert_eq!(table.len(), 2);
    assert_eq!(written_views(&device, table.active_set()), vec![ImageViewHandle(1000), ImageViewHandle(1001)]);
    assert!(device.descriptor_writes(table.generation_set(before)).is_empty());
}

#[test]
fn test_second_update_leaves_first_generation_intact() {
    let (mut device, _allocator, mut table) = setup(16);

    table.update(&mut device, &[entry(0), entry(1)]);
    let first_set = table.active_set();
    table.update(&mut device, &[entry(5)]);

    assert_ne!(table.active_set(), first_set);
    assert_eq!(written_views(&device, first_set), vec![ImageViewHandle(1000), ImageViewHandle(1001)]);
    assert_eq!(written_views(&device, table.active_set()), vec![ImageViewHandle(1005)]);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_update_over_capacity_truncates() {
    let (mut device, _allocator, mut table) = setup(4);
    let entries: Vec<BindlessEntry> = (0..10).map(entry).collect();

    let written = table.update(&mut device, &entries);

    assert_eq!(written, 4);
    assert_eq!(written_views(&device, table.active_set()).len(), 4);
}

#[test]
fn test_layout_is_update_after_bind_runtime_array() {
    let desc = BindlessTextureTable::layout_desc(64);
    assert!(desc.update_after_bind);
    assert_eq!(desc.bindings.len(), 1);
    assert!(desc.bindings[0].variable_count);
    assert_eq!(desc.bindings[0].count, 64);
}

#[test]
fn test_creation_fails_without_pool() {
    let mut device = MockGraphicsDevice::new();
    device.fail_pool_creation = true;
    let mut allocator = DescriptorPoolAllocator::new(&quiet_config());
    let result = BindlessTextureTable::new(&mut device, &mut allocator, 8, 0);
    assert!(result.is_err());
    assert_eq!(device.live_count(MockObjectKind::DescriptorSetLayout), 0);
}

#[test]
fn test_cleanup_releases_sets_and_layout() {
    let (mut device, mut allocator, mut table) = setup(8);
    table.cleanup(&mut device, &mut allocator, 3);
    assert_eq!(device.live_count(MockObjectKind::DescriptorSetLayout), 0);
    let bindless = allocator
        .pool_stats()
        .into_iter()
        .find(|s| s.id == crate::descriptor::PoolId::Bindless)
        .unwrap();
    assert_eq!(bindless.allocated, 0);
}

#[test]
fn test_shrinking_update_rewrites_stale_slots_with_fallback() {
    let (mut device, _allocator, mut table) = setup(16);
    table.set_fallback(Some(entry(99)));

    table.update(&mut device, &[entry(0), entry(1), entry(2)]);
    let generation = table.active_generation();
    table.update(&mut device, &[entry(3)]);
    table.update(&mut device, &[entry(4)]);

    assert_eq!(table.active_generation(), generation);
    assert_eq!(table.len(), 1);
    assert_eq!(
        written_views(&device, table.active_set()),
        vec![ImageViewHandle(1004), ImageViewHandle(1099), ImageViewHandle(1099)]
    );
}

#[test]
fn test_stale_slots_are_left_without_fallback() {
    let (mut device, _allocator, mut table) = setup(16);

    table.update(&mut device, &[entry(0), entry(1)]);
    table.update(&mut device, &[]);
    table.update(&mut device, &[entry(2)]);

    assert_eq!(table.len(), 1);
    assert_eq!(written_views(&device, table.active_set()), vec![ImageViewHandle(1002), ImageViewHandle(1001)]);
}
