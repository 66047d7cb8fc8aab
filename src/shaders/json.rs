use serde::{Deserialize, Serialize};

use super::{ShaderLang, Stage};

/// the textual reflection document for one stage of a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionJson {
    pub language: ShaderLang,
    pub profile_version: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bytecode: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub debug_info: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub flatten_ubos: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vs: Option<StageReflection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<StageReflection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cs: Option<StageReflection>,
}

impl ReflectionJson {
    pub fn stage(&self, stage: Stage) -> Option<&StageReflection> {
        match stage {
            Stage::Vertex => self.vs.as_ref(),
            Stage::Fragment => self.fs.as_ref(),
            Stage::Compute => self.cs.as_ref(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// every category a stage can bind, in output order
///
/// empty categories are left out of the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageReflection {
    pub file: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subpass_inputs: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sep_images: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sep_samplers: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub storage_images: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub storage_buffers: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uniform_buffers: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub push_cbs: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counters: Vec<ResourceDescriptor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    VertexInput,
    UniformBuffer,
    Texture,
    StorageImage,
    StorageBuffer,
    PushConstantBlock,
    #[default]
    Generic,
}

/// one bound resource, with only the fields it actually carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: u32,
    pub name: String,
    /// implied by the category the descriptor is listed under
    #[serde(skip)]
    pub kind: ResourceKind,

    #[serde(rename = "array", default, skip_serializing_if = "Option::is_none")]
    pub array_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<u32>,
    #[serde(rename = "set", default, skip_serializing_if = "Option::is_none")]
    pub descriptor_set: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<u32>,
    #[serde(rename = "attachment", default, skip_serializing_if = "Option::is_none")]
    pub attachment_index: Option<u32>,
    #[serde(flatten)]
    pub access: AccessFlags,
    #[serde(rename = "block_size", default, skip_serializing_if = "Option::is_none")]
    pub block_size_bytes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsized_array_stride: Option<u32>,
    #[serde(flatten)]
    pub vertex_semantic: Option<VertexSemantic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hlsl_counter_buffer_id: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<BlockMember>>,
    #[serde(flatten)]
    pub texture_info: Option<TextureInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFlags {
    #[serde(rename = "writeonly", default, skip_serializing_if = "is_false")]
    pub write_only: bool,
    #[serde(rename = "readonly", default, skip_serializing_if = "is_false")]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexSemantic {
    #[serde(rename = "semantic")]
    pub semantic_name: String,
    pub semantic_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMember {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub offset: u32,
    pub size: u32,
    #[serde(rename = "array", default, skip_serializing_if = "Option::is_none")]
    pub array_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub dimension: String,
    pub format: String,
    #[serde(rename = "multisample", default, skip_serializing_if = "is_false")]
    pub multisampled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub arrayed: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}
