use serde::{Deserialize, Serialize};

pub mod binary;
pub mod build_tasks;
pub mod compiled;
pub mod json;
pub mod output;
pub mod reflection;

/// a pipeline stage of one shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Vertex,
    Fragment,
    Compute,
}

impl Stage {
    /// the short name used for output file suffixes and reflection keys
    pub fn short_name(self) -> &'static str {
        match self {
            Stage::Vertex => "vs",
            Stage::Fragment => "fs",
            Stage::Compute => "cs",
        }
    }

    /// the file extension used for split stage sources
    pub fn extension(self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::Fragment => "frag",
            Stage::Compute => "comp",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
            Stage::Compute => "compute",
        };
        f.write_str(name)
    }
}

/// the target language the cross-compiler translated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderLang {
    Gles,
    Hlsl,
    Msl,
    Glsl,
}

impl ShaderLang {
    pub const ALL: [ShaderLang; 4] = [
        ShaderLang::Gles,
        ShaderLang::Hlsl,
        ShaderLang::Msl,
        ShaderLang::Glsl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderLang::Gles => "gles",
            ShaderLang::Hlsl => "hlsl",
            ShaderLang::Msl => "msl",
            ShaderLang::Glsl => "glsl",
        }
    }
}

impl std::fmt::Display for ShaderLang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
