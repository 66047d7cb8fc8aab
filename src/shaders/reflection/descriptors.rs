use log::*;

use crate::shaders::Stage;
use crate::shaders::compiled::{Reflector, Resource, StorageClass};
use crate::shaders::json::*;

use super::semantics::vertex_semantic;
use super::type_map::{UNKNOWN_TYPE, resolve_type};

/// the cross-compiler's resource categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    SubpassInputs,
    Inputs,
    Outputs,
    Textures,
    SeparateImages,
    SeparateSamplers,
    StorageImages,
    StorageBuffers,
    UniformBuffers,
    PushConstantBuffers,
    AtomicCounters,
}

impl ResourceCategory {
    /// categories in the order they appear in the reflection document
    pub const ALL: [ResourceCategory; 11] = [
        ResourceCategory::SubpassInputs,
        ResourceCategory::Inputs,
        ResourceCategory::Outputs,
        ResourceCategory::Textures,
        ResourceCategory::SeparateImages,
        ResourceCategory::SeparateSamplers,
        ResourceCategory::StorageImages,
        ResourceCategory::StorageBuffers,
        ResourceCategory::UniformBuffers,
        ResourceCategory::PushConstantBuffers,
        ResourceCategory::AtomicCounters,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ResourceCategory::SubpassInputs => "subpass_inputs",
            ResourceCategory::Inputs => "inputs",
            ResourceCategory::Outputs => "outputs",
            ResourceCategory::Textures => "textures",
            ResourceCategory::SeparateImages => "sep_images",
            ResourceCategory::SeparateSamplers => "sep_samplers",
            ResourceCategory::StorageImages => "storage_images",
            ResourceCategory::StorageBuffers => "storage_buffers",
            ResourceCategory::UniformBuffers => "uniform_buffers",
            ResourceCategory::PushConstantBuffers => "push_cbs",
            ResourceCategory::AtomicCounters => "counters",
        }
    }

    pub fn kind(self, stage: Stage) -> ResourceKind {
        match self {
            ResourceCategory::Inputs if stage == Stage::Vertex => ResourceKind::VertexInput,
            ResourceCategory::Textures => ResourceKind::Texture,
            ResourceCategory::StorageImages => ResourceKind::StorageImage,
            ResourceCategory::StorageBuffers => ResourceKind::StorageBuffer,
            ResourceCategory::UniformBuffers => ResourceKind::UniformBuffer,
            ResourceCategory::PushConstantBuffers => ResourceKind::PushConstantBlock,
            _ => ResourceKind::Generic,
        }
    }
}

const TEXTURE_DIMENSIONS: [&str; 7] = ["1d", "2d", "3d", "cube", "rect", "buffer", "subpass_data"];

const TEXTURE_FORMATS: [&str; 40] = [
    "unknown",
    "Rgba32f",
    "Rgba16f",
    "R32f",
    "Rgba8",
    "Rgba8Snorm",
    "Rg32f",
    "Rg16f",
    "R11fG11fB10f",
    "R16f",
    "Rgba16",
    "Rgb10A2",
    "Rg16",
    "Rg8",
    "R16",
    "R8",
    "Rgba16Snorm",
    "Rg16Snorm",
    "Rg8Snorm",
    "R16Snorm",
    "R8Snorm",
    "Rgba32i",
    "Rgba16i",
    "Rgba8i",
    "R32i",
    "Rg32i",
    "Rg16i",
    "Rg8i",
    "R16i",
    "R8i",
    "Rgba32ui",
    "Rgba16ui",
    "Rgba8ui",
    "R32ui",
    "Rgb10a2ui",
    "Rg32ui",
    "Rg16ui",
    "Rg8ui",
    "R16ui",
    "R8ui",
];

/// the size a flattened uniform block is exposed as, in vec4 slots
pub fn flattened_array_length(block_size: u32) -> u32 {
    block_size.max(16).div_ceil(16)
}

/// turns one category of a stage's resource list into descriptors, in input order
///
/// never fails: types the mapping table does not cover are tagged "unknown"
pub fn build_descriptors<R: Reflector>(
    reflector: &R,
    category: ResourceCategory,
    stage: Stage,
    resources: &[Resource],
    flatten_ubos: bool,
) -> Vec<ResourceDescriptor> {
    let kind = category.kind(stage);

    let mut descriptors = vec![];
    for resource in resources {
        if kind == ResourceKind::StorageBuffer && reflector.is_hlsl_counter_buffer(resource.id) {
            continue;
        }

        descriptors.push(build_descriptor(reflector, kind, resource, flatten_ubos));
    }

    descriptors
}

fn build_descriptor<R: Reflector>(
    reflector: &R,
    kind: ResourceKind,
    resource: &Resource,
    flatten_ubos: bool,
) -> ResourceDescriptor {
    let shader_type = reflector.type_of(resource.type_id);
    if shader_type.is_none() {
        debug!("resource {} has no type {}", resource.id, resource.type_id);
    }

    let storage_class = reflector.storage_class(resource.id);
    let is_push_constant = storage_class == Some(StorageClass::PushConstant);

    let type_decorations = shader_type
        .map(|t| reflector.decorations(t.self_id))
        .unwrap_or_default();
    let is_block = type_decorations.block || type_decorations.buffer_block;
    let is_sized_block = is_block
        && matches!(
            storage_class,
            Some(StorageClass::Uniform | StorageClass::UniformConstant)
        );

    // anonymous blocks are named after their block type, everything else after the variable
    let fallback_id = if is_block && !is_push_constant {
        resource.base_type_id
    } else {
        resource.id
    };
    let name = if resource.name.is_empty() {
        reflector.fallback_name(fallback_id)
    } else {
        resource.name.clone()
    };

    let mask = if kind == ResourceKind::StorageBuffer {
        reflector.buffer_block_flags(resource.id)
    } else {
        reflector.decorations(resource.id)
    };

    let mut descriptor = ResourceDescriptor {
        id: resource.id,
        name,
        kind,
        array_length: shader_type.and_then(|t| array_length(&t.array)),
        location: mask.location,
        descriptor_set: mask.descriptor_set,
        binding: mask.binding,
        attachment_index: mask.input_attachment_index,
        access: AccessFlags {
            write_only: mask.non_readable,
            read_only: mask.non_writable,
        },
        ..Default::default()
    };

    if is_sized_block {
        descriptor.block_size_bytes = Some(reflector.declared_struct_size(resource.base_type_id));

        let stride = reflector.runtime_array_stride(resource.base_type_id);
        if stride != 0 {
            descriptor.unsized_array_stride = Some(stride);
        }
    }

    if kind == ResourceKind::StorageBuffer {
        descriptor.hlsl_counter_buffer_id = reflector.hlsl_counter_buffer(resource.id);
    }

    match kind {
        ResourceKind::UniformBuffer if flatten_ubos => {
            let block_size = descriptor.block_size_bytes.unwrap_or(0);
            descriptor.type_tag = Some("float4".to_string());
            descriptor.array_length = Some(flattened_array_length(block_size));
        }

        ResourceKind::UniformBuffer | ResourceKind::PushConstantBlock => {
            descriptor.members = Some(block_members(reflector, resource.base_type_id));
        }

        ResourceKind::Texture | ResourceKind::StorageImage => {
            let image = shader_type.and_then(|t| t.image).unwrap_or_default();
            descriptor.texture_info = Some(TextureInfo {
                dimension: lookup(&TEXTURE_DIMENSIONS, image.dim).to_string(),
                format: lookup(&TEXTURE_FORMATS, image.format).to_string(),
                multisampled: image.multisampled,
                arrayed: image.arrayed,
            });
        }

        ResourceKind::VertexInput => {
            let type_tag = shader_type.map(resolve_type).unwrap_or(UNKNOWN_TYPE);
            if type_tag == UNKNOWN_TYPE {
                debug!("vertex input '{}' has an unmapped type", descriptor.name);
            }
            descriptor.type_tag = Some(type_tag.to_string());

            if let Some(location) = descriptor.location {
                debug_assert!((location as usize) < super::semantics::VERTEX_ATTRIB_COUNT);
                descriptor.vertex_semantic = vertex_semantic(location);
                if descriptor.vertex_semantic.is_none() {
                    warn!(
                        "vertex input '{}' has out of range location {location}",
                        descriptor.name
                    );
                }
            }
        }

        ResourceKind::StorageBuffer | ResourceKind::Generic => {}
    }

    descriptor
}

fn block_members<R: Reflector>(reflector: &R, block_type_id: u32) -> Vec<BlockMember> {
    let Some(block_type) = reflector.type_of(block_type_id) else {
        return vec![];
    };

    let mut members = vec![];
    for (index, member_type_id) in block_type.member_types.iter().enumerate() {
        let member_type = reflector.type_of(*member_type_id);
        let layout = reflector.member_layout(block_type_id, index);

        members.push(BlockMember {
            name: layout
                .map(|l| l.name.clone())
                .unwrap_or_else(|| format!("_m{index}")),
            type_tag: member_type
                .map(resolve_type)
                .unwrap_or(UNKNOWN_TYPE)
                .to_string(),
            offset: layout.map(|l| l.offset).unwrap_or(0),
            size: layout.map(|l| l.size).unwrap_or(0),
            array_length: member_type.and_then(|t| array_length(&t.array)),
        });
    }

    members
}

/// total element count across all array dimensions
fn array_length(dimensions: &[u32]) -> Option<u32> {
    if dimensions.is_empty() {
        return None;
    }

    Some(dimensions.iter().sum())
}

fn lookup(table: &[&'static str], index: u32) -> &'static str {
    table.get(index as usize).copied().unwrap_or(UNKNOWN_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::shaders::compiled::*;

    fn float_type(id: u32, vec_size: u32, columns: u32) -> ShaderType {
        ShaderType {
            base_type: BaseType::Float,
            vec_size,
            columns,
            array: vec![],
            member_types: vec![],
            self_id: id,
            decorations: Decorations::default(),
            image: None,
            layout: None,
        }
    }

    fn block_type(id: u32, size: u32, members: Vec<(u32, &str, u32, u32)>) -> ShaderType {
        ShaderType {
            base_type: BaseType::Struct,
            vec_size: 1,
            columns: 1,
            array: vec![],
            member_types: members.iter().map(|m| m.0).collect(),
            self_id: id,
            decorations: Decorations {
                block: true,
                ..Default::default()
            },
            image: None,
            layout: Some(StructLayout {
                size,
                runtime_array_stride: 0,
                members: members
                    .iter()
                    .map(|(_, name, offset, size)| MemberLayout {
                        name: name.to_string(),
                        offset: *offset,
                        size: *size,
                    })
                    .collect(),
            }),
        }
    }

    fn variable(storage_class: StorageClass, decorations: Decorations) -> Variable {
        Variable {
            storage_class,
            decorations,
            is_hlsl_counter_buffer: false,
            hlsl_counter_buffer: None,
        }
    }

    fn resource(id: u32, type_id: u32, name: &str) -> Resource {
        Resource {
            id,
            type_id,
            base_type_id: type_id,
            name: name.to_string(),
        }
    }

    fn uniform_module(block_size: u32) -> ShaderModule {
        let mut module = ShaderModule::default();
        module.types.insert(1, float_type(1, 4, 4));
        module.types.insert(2, float_type(2, 4, 1));
        module.types.insert(
            3,
            block_type(3, block_size, vec![(1, "mvp", 0, 64), (2, "tint", 64, 16)]),
        );
        module.variables.insert(
            10,
            variable(
                StorageClass::Uniform,
                Decorations {
                    binding: Some(2),
                    descriptor_set: Some(0),
                    ..Default::default()
                },
            ),
        );
        module.resources.uniform_buffers = vec![resource(10, 3, "")];
        module
    }

    #[test]
    fn anonymous_block_is_named_after_its_type() {
        let module = uniform_module(80);
        let descriptors = build_descriptors(
            &module,
            ResourceCategory::UniformBuffers,
            Stage::Vertex,
            &module.resources.uniform_buffers,
            false,
        );

        let ubo = &descriptors[0];
        assert_eq!(ubo.name, "_3");
        assert_eq!(ubo.kind, ResourceKind::UniformBuffer);
        assert_eq!(ubo.block_size_bytes, Some(80));
        assert_eq!(ubo.binding, Some(2));
        assert_eq!(ubo.descriptor_set, Some(0));
        assert_eq!(ubo.location, None);

        let members = ubo.members.as_ref().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "mvp");
        assert_eq!(members[0].type_tag, "mat4");
        assert_eq!(members[1].offset, 64);
        assert_eq!(members[1].type_tag, "float4");
    }

    #[test]
    fn flattened_uniform_buffers() {
        for (block_size, expected) in [(20, 2), (8, 1), (80, 5)] {
            let module = uniform_module(block_size);
            let descriptors = build_descriptors(
                &module,
                ResourceCategory::UniformBuffers,
                Stage::Fragment,
                &module.resources.uniform_buffers,
                true,
            );

            let ubo = &descriptors[0];
            assert_eq!(ubo.type_tag.as_deref(), Some("float4"));
            assert_eq!(ubo.array_length, Some(expected));
            assert!(ubo.members.is_none());
        }
    }

    #[test]
    fn vertex_inputs_get_semantics() {
        let mut module = ShaderModule::default();
        module.types.insert(1, float_type(1, 3, 1));
        module.types.insert(2, float_type(2, 2, 1));
        for (id, location) in [(10, 0), (11, 6), (12, 10)] {
            module.variables.insert(
                id,
                variable(
                    StorageClass::Input,
                    Decorations {
                        location: Some(location),
                        ..Default::default()
                    },
                ),
            );
        }
        let inputs = vec![
            resource(10, 1, "a_pos"),
            resource(11, 2, "a_uv4"),
            resource(12, 1, "a_color"),
        ];

        let descriptors =
            build_descriptors(&module, ResourceCategory::Inputs, Stage::Vertex, &inputs, false);

        let semantics: Vec<_> = descriptors
            .iter()
            .map(|d| {
                let s = d.vertex_semantic.as_ref().unwrap();
                (s.semantic_name.as_str(), s.semantic_index)
            })
            .collect();
        assert_eq!(semantics, vec![("POSITION", 0), ("TEXCOORD", 4), ("COLOR", 0)]);
        assert_eq!(descriptors[0].type_tag.as_deref(), Some("float3"));
        assert_eq!(descriptors[1].type_tag.as_deref(), Some("float2"));

        // fragment inputs are plain varyings
        let descriptors =
            build_descriptors(&module, ResourceCategory::Inputs, Stage::Fragment, &inputs, false);
        assert!(descriptors.iter().all(|d| d.vertex_semantic.is_none()));
    }

    #[test]
    fn storage_buffers_skip_hlsl_counters() {
        let mut module = ShaderModule::default();
        let mut block = block_type(1, 0, vec![]);
        block.decorations = Decorations {
            buffer_block: true,
            non_writable: true,
            ..Default::default()
        };
        block.layout = Some(StructLayout {
            size: 16,
            runtime_array_stride: 32,
            members: vec![],
        });
        module.types.insert(1, block);
        module.variables.insert(
            10,
            Variable {
                hlsl_counter_buffer: Some(11),
                ..variable(
                    StorageClass::Uniform,
                    Decorations {
                        binding: Some(0),
                        ..Default::default()
                    },
                )
            },
        );
        module.variables.insert(
            11,
            Variable {
                is_hlsl_counter_buffer: true,
                ..variable(StorageClass::Uniform, Decorations::default())
            },
        );
        module.resources.storage_buffers = vec![resource(10, 1, "particles"), resource(11, 1, "")];

        let descriptors = build_descriptors(
            &module,
            ResourceCategory::StorageBuffers,
            Stage::Compute,
            &module.resources.storage_buffers,
            false,
        );

        assert_eq!(descriptors.len(), 1);
        let ssbo = &descriptors[0];
        assert_eq!(ssbo.name, "particles");
        assert_eq!(ssbo.block_size_bytes, Some(16));
        assert_eq!(ssbo.unsized_array_stride, Some(32));
        assert_eq!(ssbo.hlsl_counter_buffer_id, Some(11));
        assert!(ssbo.access.read_only);
        assert!(!ssbo.access.write_only);
    }

    #[test]
    fn textures_and_arrays() {
        let mut module = ShaderModule::default();
        let mut texture = float_type(1, 1, 1);
        texture.base_type = BaseType::SampledImage;
        texture.array = vec![2, 3];
        texture.image = Some(ImageType {
            dim: 3,
            format: 99,
            multisampled: false,
            arrayed: true,
        });
        module.types.insert(1, texture);
        module.variables.insert(
            10,
            variable(StorageClass::UniformConstant, Decorations::default()),
        );

        let descriptors = build_descriptors(
            &module,
            ResourceCategory::Textures,
            Stage::Fragment,
            &[resource(10, 1, "")],
            false,
        );

        let texture = &descriptors[0];
        assert_eq!(texture.name, "_10");
        assert_eq!(texture.array_length, Some(5));
        assert_eq!(texture.binding, None);

        let info = texture.texture_info.as_ref().unwrap();
        assert_eq!(info.dimension, "cube");
        assert_eq!(info.format, "unknown");
        assert!(info.arrayed);
        assert!(!info.multisampled);
    }

    #[test]
    fn push_constants_are_named_after_the_variable() {
        let mut module = uniform_module(80);
        module.variables.insert(
            9,
            variable(StorageClass::PushConstant, Decorations::default()),
        );
        let push_constants = vec![resource(9, 3, "")];

        let descriptors = build_descriptors(
            &module,
            ResourceCategory::PushConstantBuffers,
            Stage::Vertex,
            &push_constants,
            true,
        );

        let block = &descriptors[0];
        assert_eq!(block.name, "_9");
        assert_eq!(block.kind, ResourceKind::PushConstantBlock);
        assert_eq!(block.block_size_bytes, None);
        assert_eq!(block.type_tag, None);

        // flattening only applies to uniform buffers
        let members = block.members.as_ref().unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["mvp", "tint"]);
        assert_eq!(members[1].size, 16);
    }

    #[test]
    fn storage_images_carry_texture_info() {
        let mut module = ShaderModule::default();
        let mut image = float_type(1, 1, 1);
        image.base_type = BaseType::Image;
        image.image = Some(ImageType {
            dim: 1,
            format: 4,
            multisampled: false,
            arrayed: false,
        });
        module.types.insert(1, image);
        module.variables.insert(
            10,
            variable(
                StorageClass::UniformConstant,
                Decorations {
                    binding: Some(3),
                    non_readable: true,
                    ..Default::default()
                },
            ),
        );

        let descriptors = build_descriptors(
            &module,
            ResourceCategory::StorageImages,
            Stage::Compute,
            &[resource(10, 1, "u_output")],
            false,
        );

        let image = &descriptors[0];
        assert_eq!(image.kind, ResourceKind::StorageImage);
        assert_eq!(image.name, "u_output");
        assert_eq!(image.binding, Some(3));
        assert!(image.access.write_only);
        assert!(!image.access.read_only);

        let info = image.texture_info.as_ref().unwrap();
        assert_eq!(info.dimension, "2d");
        assert_eq!(info.format, "Rgba8");
        assert!(!info.arrayed);
    }

    #[test]
    fn build_is_deterministic() {
        let module = uniform_module(48);
        let build = || {
            build_descriptors(
                &module,
                ResourceCategory::UniformBuffers,
                Stage::Vertex,
                &module.resources.uniform_buffers,
                false,
            )
        };

        assert_eq!(build(), build());
    }
}
