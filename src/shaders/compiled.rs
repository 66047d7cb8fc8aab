use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Stage;

/// one stage as handed over by the external cross-compiler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledStage {
    pub stage: Stage,
    /// the source file this stage was compiled from
    pub file: String,
    pub code: StageCode,
    pub module: ShaderModule,
}

/// translated target code, either source text or an opaque bytecode blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum StageCode {
    Source(String),
    Bytecode(Vec<u8>),
}

/// a full program: vertex + fragment, or compute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub stages: Vec<CompiledStage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseType {
    Unknown,
    Void,
    Boolean,
    SByte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Int64,
    UInt64,
    AtomicCounter,
    Half,
    Float,
    Double,
    Struct,
    Image,
    SampledImage,
    Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageClass {
    UniformConstant,
    Input,
    Uniform,
    Output,
    Workgroup,
    Private,
    Function,
    PushConstant,
    AtomicCounter,
    Image,
    StorageBuffer,
}

/// the decorations attached to one id
///
/// a decoration is present only when the field is set, which is what the
/// descriptor builder relies on to keep the emitted reflection sparse
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decorations {
    pub location: Option<u32>,
    pub binding: Option<u32>,
    pub descriptor_set: Option<u32>,
    pub input_attachment_index: Option<u32>,
    pub non_readable: bool,
    pub non_writable: bool,
    pub block: bool,
    pub buffer_block: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    Location,
    Binding,
    DescriptorSet,
    InputAttachmentIndex,
    NonReadable,
    NonWritable,
    Block,
    BufferBlock,
}

impl Decorations {
    pub fn has(&self, decoration: Decoration) -> bool {
        match decoration {
            Decoration::Location => self.location.is_some(),
            Decoration::Binding => self.binding.is_some(),
            Decoration::DescriptorSet => self.descriptor_set.is_some(),
            Decoration::InputAttachmentIndex => self.input_attachment_index.is_some(),
            Decoration::NonReadable => self.non_readable,
            Decoration::NonWritable => self.non_writable,
            Decoration::Block => self.block,
            Decoration::BufferBlock => self.buffer_block,
        }
    }

    /// the integer operand of a decoration, if it carries one
    pub fn get(&self, decoration: Decoration) -> Option<u32> {
        match decoration {
            Decoration::Location => self.location,
            Decoration::Binding => self.binding,
            Decoration::DescriptorSet => self.descriptor_set,
            Decoration::InputAttachmentIndex => self.input_attachment_index,
            _ => None,
        }
    }

    pub fn merge(&self, other: &Decorations) -> Decorations {
        Decorations {
            location: self.location.or(other.location),
            binding: self.binding.or(other.binding),
            descriptor_set: self.descriptor_set.or(other.descriptor_set),
            input_attachment_index: self.input_attachment_index.or(other.input_attachment_index),
            non_readable: self.non_readable || other.non_readable,
            non_writable: self.non_writable || other.non_writable,
            block: self.block || other.block,
            buffer_block: self.buffer_block || other.buffer_block,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageType {
    /// raw dimension enum value (1d, 2d, 3d, cube, rect, buffer, subpass)
    pub dim: u32,
    /// raw image format enum value
    pub format: u32,
    #[serde(default)]
    pub multisampled: bool,
    #[serde(default)]
    pub arrayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLayout {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// declared struct layout, as computed by the cross-compiler's layout rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub size: u32,
    /// byte stride of a trailing runtime-sized array, 0 when there is none
    #[serde(default)]
    pub runtime_array_stride: u32,
    #[serde(default)]
    pub members: Vec<MemberLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderType {
    pub base_type: BaseType,
    #[serde(default = "one")]
    pub vec_size: u32,
    #[serde(default = "one")]
    pub columns: u32,
    /// array dimensions, outermost first
    #[serde(default)]
    pub array: Vec<u32>,
    /// type ids of struct members in declaration order
    #[serde(default)]
    pub member_types: Vec<u32>,
    /// the id decorations of this type are attached to
    pub self_id: u32,
    #[serde(default)]
    pub decorations: Decorations,
    #[serde(default)]
    pub image: Option<ImageType>,
    #[serde(default)]
    pub layout: Option<StructLayout>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub storage_class: StorageClass,
    #[serde(default)]
    pub decorations: Decorations,
    #[serde(default)]
    pub is_hlsl_counter_buffer: bool,
    #[serde(default)]
    pub hlsl_counter_buffer: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: u32,
    pub type_id: u32,
    pub base_type_id: u32,
    #[serde(default)]
    pub name: String,
}

/// the cross-compiler's resource list, one vector per category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderResources {
    pub uniform_buffers: Vec<Resource>,
    pub storage_buffers: Vec<Resource>,
    pub stage_inputs: Vec<Resource>,
    pub stage_outputs: Vec<Resource>,
    pub subpass_inputs: Vec<Resource>,
    pub storage_images: Vec<Resource>,
    pub sampled_images: Vec<Resource>,
    pub atomic_counters: Vec<Resource>,
    pub push_constant_buffers: Vec<Resource>,
    pub separate_images: Vec<Resource>,
    pub separate_samplers: Vec<Resource>,
}

/// queries the descriptor builder needs from a compiled module
pub trait Reflector {
    fn type_of(&self, type_id: u32) -> Option<&ShaderType>;

    fn storage_class(&self, id: u32) -> Option<StorageClass>;

    fn decorations(&self, id: u32) -> Decorations;

    /// variable decorations merged with the access qualifiers of its block type
    fn buffer_block_flags(&self, id: u32) -> Decorations;

    fn is_hlsl_counter_buffer(&self, id: u32) -> bool;

    fn hlsl_counter_buffer(&self, id: u32) -> Option<u32>;

    fn fallback_name(&self, id: u32) -> String {
        format!("_{id}")
    }

    fn declared_struct_size(&self, type_id: u32) -> u32 {
        self.type_of(type_id)
            .and_then(|t| t.layout.as_ref())
            .map(|l| l.size)
            .unwrap_or(0)
    }

    fn runtime_array_stride(&self, type_id: u32) -> u32 {
        self.type_of(type_id)
            .and_then(|t| t.layout.as_ref())
            .map(|l| l.runtime_array_stride)
            .unwrap_or(0)
    }

    fn member_layout(&self, type_id: u32, index: usize) -> Option<&MemberLayout> {
        self.type_of(type_id)
            .and_then(|t| t.layout.as_ref())
            .and_then(|l| l.members.get(index))
    }
}

/// an in-memory dump of a cross-compiled module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderModule {
    pub types: BTreeMap<u32, ShaderType>,
    pub variables: BTreeMap<u32, Variable>,
    pub resources: ShaderResources,
}

impl Reflector for ShaderModule {
    fn type_of(&self, type_id: u32) -> Option<&ShaderType> {
        self.types.get(&type_id)
    }

    fn storage_class(&self, id: u32) -> Option<StorageClass> {
        self.variables.get(&id).map(|v| v.storage_class)
    }

    fn decorations(&self, id: u32) -> Decorations {
        if let Some(var) = self.variables.get(&id) {
            return var.decorations.clone();
        }

        // a type's self id is the id of the type that owns its decorations
        self.types
            .get(&id)
            .map(|t| t.decorations.clone())
            .unwrap_or_default()
    }

    fn buffer_block_flags(&self, id: u32) -> Decorations {
        let Some(var) = self.variables.get(&id) else {
            return Decorations::default();
        };

        let access = self
            .resources
            .storage_buffers
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| self.types.get(&r.base_type_id))
            .map(|t| Decorations {
                non_readable: t.decorations.non_readable,
                non_writable: t.decorations.non_writable,
                ..Default::default()
            })
            .unwrap_or_default();

        var.decorations.merge(&access)
    }

    fn is_hlsl_counter_buffer(&self, id: u32) -> bool {
        self.variables
            .get(&id)
            .is_some_and(|v| v.is_hlsl_counter_buffer)
    }

    fn hlsl_counter_buffer(&self, id: u32) -> Option<u32> {
        self.variables.get(&id).and_then(|v| v.hlsl_counter_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorations_are_sparse() {
        let decorations = Decorations {
            binding: Some(0),
            ..Default::default()
        };

        assert!(decorations.has(Decoration::Binding));
        assert!(!decorations.has(Decoration::Location));
        assert_eq!(decorations.get(Decoration::Binding), Some(0));
        assert_eq!(decorations.get(Decoration::DescriptorSet), None);
    }

    #[test]
    fn module_from_json_dump() {
        let json = r#"{
            "types": {
                "7": { "base_type": "float", "vec_size": 4, "self_id": 7 }
            },
            "variables": {
                "10": {
                    "storage_class": "input",
                    "decorations": { "location": 0 }
                }
            },
            "resources": {
                "stage_inputs": [{ "id": 10, "type_id": 7, "base_type_id": 7, "name": "a_pos" }]
            }
        }"#;

        let module: ShaderModule = serde_json::from_str(json).unwrap();

        assert_eq!(module.resources.stage_inputs.len(), 1);
        assert_eq!(module.storage_class(10), Some(StorageClass::Input));
        assert_eq!(module.decorations(10).location, Some(0));
        assert_eq!(module.type_of(7).unwrap().columns, 1);
        assert_eq!(module.fallback_name(10), "_10");
    }
}
