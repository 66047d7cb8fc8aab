use log::*;

use super::compiled::{CompiledStage, Reflector, ShaderResources};
use super::json::*;
use super::{ShaderLang, Stage};

pub mod descriptors;
pub mod semantics;
pub mod type_map;

use descriptors::{ResourceCategory, build_descriptors};

/// program-level settings echoed into every reflection document
#[derive(Debug, Clone, Copy)]
pub struct ReflectionOptions {
    pub lang: ShaderLang,
    pub profile_version: u32,
    pub bytecode: bool,
    pub debug_info: bool,
    pub flatten_ubos: bool,
}

/// builds the descriptors of every category of one stage
pub fn reflect_stage<R: Reflector>(
    reflector: &R,
    resources: &ShaderResources,
    stage: Stage,
    file: &str,
    flatten_ubos: bool,
) -> StageReflection {
    let mut reflection = StageReflection {
        file: file.to_string(),
        ..Default::default()
    };

    for category in ResourceCategory::ALL {
        let list = category_resources(resources, category);
        let descriptors = build_descriptors(reflector, category, stage, list, flatten_ubos);
        *category_slot(&mut reflection, category) = descriptors;
    }

    debug!(
        "reflected {stage} stage of {file}: {} inputs, {} uniform buffers, {} textures",
        reflection.inputs.len(),
        reflection.uniform_buffers.len(),
        reflection.textures.len(),
    );

    reflection
}

pub fn reflection_json(options: &ReflectionOptions, compiled: &CompiledStage) -> ReflectionJson {
    let stage_reflection = reflect_stage(
        &compiled.module,
        &compiled.module.resources,
        compiled.stage,
        &compiled.file,
        options.flatten_ubos,
    );

    let mut reflection_json = ReflectionJson {
        language: options.lang,
        profile_version: options.profile_version,
        bytecode: options.bytecode,
        debug_info: options.debug_info,
        flatten_ubos: options.flatten_ubos,
        vs: None,
        fs: None,
        cs: None,
    };

    match compiled.stage {
        Stage::Vertex => reflection_json.vs = Some(stage_reflection),
        Stage::Fragment => reflection_json.fs = Some(stage_reflection),
        Stage::Compute => reflection_json.cs = Some(stage_reflection),
    }

    reflection_json
}

fn category_resources(
    resources: &ShaderResources,
    category: ResourceCategory,
) -> &[super::compiled::Resource] {
    match category {
        ResourceCategory::SubpassInputs => &resources.subpass_inputs,
        ResourceCategory::Inputs => &resources.stage_inputs,
        ResourceCategory::Outputs => &resources.stage_outputs,
        ResourceCategory::Textures => &resources.sampled_images,
        ResourceCategory::SeparateImages => &resources.separate_images,
        ResourceCategory::SeparateSamplers => &resources.separate_samplers,
        ResourceCategory::StorageImages => &resources.storage_images,
        ResourceCategory::StorageBuffers => &resources.storage_buffers,
        ResourceCategory::UniformBuffers => &resources.uniform_buffers,
        ResourceCategory::PushConstantBuffers => &resources.push_constant_buffers,
        ResourceCategory::AtomicCounters => &resources.atomic_counters,
    }
}

fn category_slot(
    reflection: &mut StageReflection,
    category: ResourceCategory,
) -> &mut Vec<ResourceDescriptor> {
    match category {
        ResourceCategory::SubpassInputs => &mut reflection.subpass_inputs,
        ResourceCategory::Inputs => &mut reflection.inputs,
        ResourceCategory::Outputs => &mut reflection.outputs,
        ResourceCategory::Textures => &mut reflection.textures,
        ResourceCategory::SeparateImages => &mut reflection.sep_images,
        ResourceCategory::SeparateSamplers => &mut reflection.sep_samplers,
        ResourceCategory::StorageImages => &mut reflection.storage_images,
        ResourceCategory::StorageBuffers => &mut reflection.storage_buffers,
        ResourceCategory::UniformBuffers => &mut reflection.uniform_buffers,
        ResourceCategory::PushConstantBuffers => &mut reflection.push_cbs,
        ResourceCategory::AtomicCounters => &mut reflection.counters,
    }
}
