/// Program resource and shader reflection merging
///
/// The shader compiler/reflection collaborator hands over, per stage, the
/// compiled code plus the buffer and image bindings it declares. A program
/// merges every stage into one descriptor-set layout per set index. A set
/// holding a runtime-sized image array (`count == 0`) is the bindless set
/// and uses the shared bindless table layout instead of its own.

use std::collections::BTreeMap;

use slotmap::new_key_type;

use crate::device::{
    DescriptorBindingDesc, DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, DescriptorType,
    GraphicsDevice, PipelineLayoutDesc, PipelineLayoutHandle, ShaderModuleHandle, ShaderStage,
    ShaderStageFlags, TextureShape,
};
use crate::error::{Error, Result};
use crate::pipeline::ProgramIdentity;
use crate::{engine_debug, engine_error};

const SOURCE: &str = "frameline::Program";

new_key_type! {
    /// Stable key of a program inside a `RenderContext`
    pub struct ProgramKey;
}

// ===== REFLECTION INPUT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Uniform,
    Storage,
}

/// Buffer binding declared by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    pub set: u32,
    pub binding: u32,
    /// Size in bytes of one element
    pub size: u32,
    pub count: u32,
    pub kind: BufferKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Sampled,
    Storage,
}

/// Image binding declared by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBinding {
    pub set: u32,
    pub binding: u32,
    pub shape: TextureShape,
    /// Array length; 0 declares a runtime-sized (bindless) array
    pub count: u32,
    pub kind: ImageKind,
}

/// Reflection of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReflection {
    pub stage: ShaderStage,
    pub buffers: Vec<BufferBinding>,
    pub images: Vec<ImageBinding>,
    pub push_constant_size: u32,
}

/// Compiled stage plus its reflection
#[derive(Debug, Clone)]
pub struct ShaderStageDesc {
    pub code: Vec<u32>,
    pub reflection: StageReflection,
}

// ===== MERGED LAYOUT =====

/// Layout of one descriptor set of a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetLayoutInfo {
    pub set: u32,
    pub desc: DescriptorSetLayoutDesc,
    /// Served by the bindless table layout
    pub bindless: bool,
}

/// Merged reflection of every stage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergedReflection {
    /// Dense, indexed by set number (gaps get an empty layout)
    pub sets: Vec<SetLayoutInfo>,
    pub push_constant_size: u32,
    pub push_constant_stages: ShaderStageFlags,
}

impl MergedReflection {
    pub fn bindless_set(&self) -> Option<u32> {
        self.sets.iter().find(|s| s.bindless).map(|s| s.set)
    }
}

/// Merge per-stage reflection into one layout per set
///
/// Stage flags of a slot declared by several stages are combined. Two
/// stages declaring different descriptor kinds or counts at the same slot
/// is an error.
pub fn merge_reflection(stages: &[StageReflection]) -> Result<MergedReflection> {
    let mut slots: BTreeMap<(u32, u32), DescriptorBindingDesc> = BTreeMap::new();
    let mut bindless_sets: Vec<u32> = Vec::new();
    let mut merged = MergedReflection::default();

    let mut add = |set: u32, slot: DescriptorBindingDesc| -> Result<()> {
        match slots.get_mut(&(set, slot.binding)) {
            Some(existing) => {
                if existing.descriptor_type != slot.descriptor_type || existing.count != slot.count {
                    return Err(Error::InvalidResource(format!(
                        "conflicting declarations at set {} binding {}: {:?}[{}] vs {:?}[{}]",
                        set, slot.binding, existing.descriptor_type, existing.count, slot.descriptor_type, slot.count
                    )));
                }
                existing.stages |= slot.stages;
            }
            None => {
                slots.insert((set, slot.binding), slot);
            }
        }
        Ok(())
    };

    for stage in stages {
        let stage_flags = ShaderStageFlags::from(stage.stage);

        for buffer in &stage.buffers {
            let descriptor_type = match buffer.kind {
                BufferKind::Uniform => DescriptorType::UniformBuffer,
                BufferKind::Storage => DescriptorType::StorageBuffer,
            };
            add(buffer.set, DescriptorBindingDesc {
                binding: buffer.binding,
                descriptor_type,
                count: buffer.count.max(1),
                stages: stage_flags,
                variable_count: false,
            })?;
        }

        for image in &stage.images {
            if image.count == 0 {
                if image.kind != ImageKind::Sampled {
                    return Err(Error::Unsupported(format!(
                        "runtime-sized storage image array at set {} binding {}",
                        image.set, image.binding
                    )));
                }
                if !bindless_sets.contains(&image.set) {
                    bindless_sets.push(image.set);
                }
                continue;
            }
            let descriptor_type = match image.kind {
                ImageKind::Sampled => DescriptorType::SampledImage,
                ImageKind::Storage => DescriptorType::StorageImage,
            };
            add(image.set, DescriptorBindingDesc {
                binding: image.binding,
                descriptor_type,
                count: image.count,
                stages: stage_flags,
                variable_count: false,
            })?;
        }

        if stage.push_constant_size > 0 {
            merged.push_constant_size = merged.push_constant_size.max(stage.push_constant_size);
            merged.push_constant_stages |= stage_flags;
        }
    }

    if bindless_sets.len() > 1 {
        return Err(Error::Unsupported(format!("more than one bindless set: {:?}", bindless_sets)));
    }
    if let Some(set) = bindless_sets.first() {
        if slots.keys().any(|(s, _)| s == set) {
            return Err(Error::InvalidResource(format!(
                "bindless set {} also declares regular bindings", set
            )));
        }
    }

    let set_count = slots
        .keys()
        .map(|(set, _)| set + 1)
        .chain(bindless_sets.iter().map(|set| set + 1))
        .max()
        .unwrap_or(0);

    for set in 0..set_count {
        let bindings: Vec<DescriptorBindingDesc> = slots
            .iter()
            .filter(|((s, _), _)| *s == set)
            .map(|(_, desc)| desc.clone())
            .collect();
        merged.sets.push(SetLayoutInfo {
            set,
            desc: DescriptorSetLayoutDesc { bindings, update_after_bind: false },
            bindless: bindless_sets.contains(&set),
        });
    }

    Ok(merged)
}

// ===== PROGRAM =====

/// Device objects of one program build
struct ProgramObjects {
    modules: Vec<(ShaderStage, ShaderModuleHandle)>,
    /// Layout per set and whether the program owns it
    set_layouts: Vec<(DescriptorSetLayoutHandle, bool)>,
    pipeline_layout: PipelineLayoutHandle,
}

impl ProgramObjects {
    fn create(
        device: &mut dyn GraphicsDevice,
        stages: &[ShaderStageDesc],
        merged: &MergedReflection,
        bindless_layout: DescriptorSetLayoutHandle,
    ) -> Result<Self> {
        let mut objects = Self {
            modules: Vec::new(),
            set_layouts: Vec::new(),
            pipeline_layout: PipelineLayoutHandle::NULL,
        };
        if let Err(e) = objects.build(device, stages, merged, bindless_layout) {
            objects.destroy(device);
            return Err(e);
        }
        Ok(objects)
    }

    fn build(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stages: &[ShaderStageDesc],
        merged: &MergedReflection,
        bindless_layout: DescriptorSetLayoutHandle,
    ) -> Result<()> {
        for stage in stages {
            let module = device.create_shader_module(stage.reflection.stage, &stage.code)?;
            self.modules.push((stage.reflection.stage, module));
        }

        for info in &merged.sets {
            if info.bindless {
                if bindless_layout.is_null() {
                    return Err(Error::InvalidResource(format!(
                        "set {} is bindless but no bindless table exists", info.set
                    )));
                }
                self.set_layouts.push((bindless_layout, false));
            } else {
                let layout = device.create_descriptor_set_layout(&info.desc)?;
                self.set_layouts.push((layout, true));
            }
        }

        self.pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDesc {
            set_layouts: self.set_layouts.iter().map(|(layout, _)| *layout).collect(),
            push_constant_size: merged.push_constant_size,
            push_constant_stages: merged.push_constant_stages,
        })?;
        Ok(())
    }

    fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if !self.pipeline_layout.is_null() {
            device.destroy_pipeline_layout(self.pipeline_layout);
            self.pipeline_layout = PipelineLayoutHandle::NULL;
        }
        for (layout, owned) in self.set_layouts.drain(..) {
            if owned {
                device.destroy_descriptor_set_layout(layout);
            }
        }
        for (_, module) in self.modules.drain(..) {
            device.destroy_shader_module(module);
        }
    }
}

/// Linked shader program
pub struct Program {
    id: u64,
    generation: u64,
    just_reloaded: bool,
    merged: MergedReflection,
    objects: ProgramObjects,
}

impl Program {
    /// Build a program from compiled stages
    ///
    /// `bindless_layout` is the bindless table layout (NULL when no table exists).
    pub fn create(
        device: &mut dyn GraphicsDevice,
        id: u64,
        stages: &[ShaderStageDesc],
        bindless_layout: DescriptorSetLayoutHandle,
    ) -> Result<Self> {
        let merged = Self::validate(id, stages)?;
        let objects = ProgramObjects::create(device, stages, &merged, bindless_layout)?;
        Ok(Self {
            id,
            generation: 0,
            just_reloaded: false,
            merged,
            objects,
        })
    }

    fn validate(id: u64, stages: &[ShaderStageDesc]) -> Result<MergedReflection> {
        let has = |stage: ShaderStage| stages.iter().any(|s| s.reflection.stage == stage);
        let valid = if has(ShaderStage::Compute) {
            stages.len() == 1
        } else {
            has(ShaderStage::Vertex)
        };
        if !valid {
            engine_error!(SOURCE, "Program {}: needs one compute stage or a vertex stage", id);
            return Err(Error::InvalidResource("invalid program stage combination".to_string()));
        }

        let reflections: Vec<StageReflection> = stages.iter().map(|s| s.reflection.clone()).collect();
        merge_reflection(&reflections).map_err(|e| {
            engine_error!(SOURCE, "Program {}: reflection merge failed: {}", id, e);
            e
        })
    }

    /// Replace the program with freshly compiled stages
    ///
    /// The device must be idle: the previous objects are destroyed at once.
    /// On failure the previous build stays in place.
    pub fn reload(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stages: &[ShaderStageDesc],
        bindless_layout: DescriptorSetLayoutHandle,
    ) -> Result<()> {
        let merged = Self::validate(self.id, stages)?;
        let objects = ProgramObjects::create(device, stages, &merged, bindless_layout)?;

        let mut old = std::mem::replace(&mut self.objects, objects);
        old.destroy(device);
        self.merged = merged;
        self.generation += 1;
        self.just_reloaded = true;
        engine_debug!(SOURCE, "Program {} reloaded (generation {})", self.id, self.generation);
        Ok(())
    }

    pub fn identity(&self) -> ProgramIdentity {
        ProgramIdentity { id: self.id, generation: self.generation }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the program was reloaded since its last bind
    pub fn just_reloaded(&self) -> bool {
        self.just_reloaded
    }

    /// Clear the reload flag once the new build has been bound
    pub fn acknowledge_reload(&mut self) {
        self.just_reloaded = false;
    }

    pub fn is_compute(&self) -> bool {
        self.module(ShaderStage::Compute).is_some()
    }

    pub fn module(&self, stage: ShaderStage) -> Option<ShaderModuleHandle> {
        self.objects
            .modules
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, module)| *module)
    }

    pub fn pipeline_layout(&self) -> PipelineLayoutHandle {
        self.objects.pipeline_layout
    }

    /// Layout of descriptor set `set`
    pub fn set_layout(&self, set: u32) -> Option<DescriptorSetLayoutHandle> {
        self.objects.set_layouts.get(set as usize).map(|(layout, _)| *layout)
    }

    pub fn set_count(&self) -> u32 {
        self.objects.set_layouts.len() as u32
    }

    pub fn reflection(&self) -> &MergedReflection {
        &self.merged
    }

    /// Destroy every owned device object
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.objects.destroy(device);
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
