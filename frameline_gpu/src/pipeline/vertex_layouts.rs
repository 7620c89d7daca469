/// Interning of vertex input layouts
///
/// Meshes and pipeline snapshots refer to a layout by a small id, so that
/// snapshot comparison does not walk attribute lists.

use rustc_hash::FxHashMap;

use crate::device::VertexLayout;

/// Interned vertex layout identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VertexLayoutId(pub u32);

/// Layout interner; ids are stable for the registry lifetime
#[derive(Default)]
pub struct VertexLayoutRegistry {
    layouts: Vec<VertexLayout>,
    ids: FxHashMap<VertexLayout, VertexLayoutId>,
}

impl VertexLayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `layout`, registering it on first sight
    pub fn intern(&mut self, layout: &VertexLayout) -> VertexLayoutId {
        if let Some(id) = self.ids.get(layout) {
            return *id;
        }
        let id = VertexLayoutId(self.layouts.len() as u32);
        self.layouts.push(layout.clone());
        self.ids.insert(layout.clone(), id);
        id
    }

    pub fn get(&self, id: VertexLayoutId) -> Option<&VertexLayout> {
        self.layouts.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
#[path = "vertex_layouts_tests.rs"]
mod tests;
