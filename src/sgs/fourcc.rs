use serde::{Serialize, Serializer};

use crate::shaders::{ShaderLang, Stage};

/// a four byte ascii tag, stored on disk in the order it is spelled
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fourcc(pub [u8; 4]);

impl Fourcc {
    pub const fn new(tag: &[u8; 4]) -> Self {
        Fourcc(*tag)
    }

    /// the little-endian integer form, as written by `write_u32::<LittleEndian>`
    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub const fn from_u32(value: u32) -> Self {
        Fourcc(value.to_le_bytes())
    }
}

impl std::fmt::Display for Fourcc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl std::fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fourcc({self})")
    }
}

impl Serialize for Fourcc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// chunks
pub const SGS: Fourcc = Fourcc::new(b"SGS ");
pub const STAG: Fourcc = Fourcc::new(b"STAG");
pub const CODE: Fourcc = Fourcc::new(b"CODE");
pub const DATA: Fourcc = Fourcc::new(b"DATA");
pub const REFL: Fourcc = Fourcc::new(b"REFL");

// languages
pub const LANG_GLES: Fourcc = Fourcc::new(b"GLES");
pub const LANG_HLSL: Fourcc = Fourcc::new(b"HLSL");
pub const LANG_GLSL: Fourcc = Fourcc::new(b"GLSL");
pub const LANG_MSL: Fourcc = Fourcc::new(b"MSL ");

// stages
pub const STAGE_VERTEX: Fourcc = Fourcc::new(b"VERT");
pub const STAGE_FRAGMENT: Fourcc = Fourcc::new(b"FRAG");
pub const STAGE_COMPUTE: Fourcc = Fourcc::new(b"COMP");

// vertex input formats
pub const VERTEX_FORMAT_FLOAT: Fourcc = Fourcc::new(b"FLT1");
pub const VERTEX_FORMAT_FLOAT2: Fourcc = Fourcc::new(b"FLT2");
pub const VERTEX_FORMAT_FLOAT3: Fourcc = Fourcc::new(b"FLT3");
pub const VERTEX_FORMAT_FLOAT4: Fourcc = Fourcc::new(b"FLT4");
pub const VERTEX_FORMAT_INT: Fourcc = Fourcc::new(b"INT1");
pub const VERTEX_FORMAT_INT2: Fourcc = Fourcc::new(b"INT2");
pub const VERTEX_FORMAT_INT3: Fourcc = Fourcc::new(b"INT3");
pub const VERTEX_FORMAT_INT4: Fourcc = Fourcc::new(b"INT4");

// image dimensions
pub const IMAGE_DIM_1D: Fourcc = Fourcc::new(b"1D  ");
pub const IMAGE_DIM_2D: Fourcc = Fourcc::new(b"2D  ");
pub const IMAGE_DIM_3D: Fourcc = Fourcc::new(b"3D  ");
pub const IMAGE_DIM_CUBE: Fourcc = Fourcc::new(b"CUBE");
pub const IMAGE_DIM_RECT: Fourcc = Fourcc::new(b"RECT");
pub const IMAGE_DIM_BUFFER: Fourcc = Fourcc::new(b"BUFF");
pub const IMAGE_DIM_SUBPASS: Fourcc = Fourcc::new(b"SUBP");

pub fn lang_fourcc(lang: ShaderLang) -> Fourcc {
    match lang {
        ShaderLang::Gles => LANG_GLES,
        ShaderLang::Hlsl => LANG_HLSL,
        ShaderLang::Glsl => LANG_GLSL,
        ShaderLang::Msl => LANG_MSL,
    }
}

pub fn lang_from_fourcc(fourcc: Fourcc) -> Option<ShaderLang> {
    ShaderLang::ALL
        .into_iter()
        .find(|lang| lang_fourcc(*lang) == fourcc)
}

pub fn stage_fourcc(stage: Stage) -> Fourcc {
    match stage {
        Stage::Vertex => STAGE_VERTEX,
        Stage::Fragment => STAGE_FRAGMENT,
        Stage::Compute => STAGE_COMPUTE,
    }
}

pub fn stage_from_fourcc(fourcc: Fourcc) -> Option<Stage> {
    [Stage::Vertex, Stage::Fragment, Stage::Compute]
        .into_iter()
        .find(|stage| stage_fourcc(*stage) == fourcc)
}

/// 0 when the type has no vertex format
pub fn vertex_format(type_tag: &str) -> u32 {
    let fourcc = match type_tag {
        "float" => VERTEX_FORMAT_FLOAT,
        "float2" => VERTEX_FORMAT_FLOAT2,
        "float3" => VERTEX_FORMAT_FLOAT3,
        "float4" => VERTEX_FORMAT_FLOAT4,
        "int" => VERTEX_FORMAT_INT,
        "int2" => VERTEX_FORMAT_INT2,
        "int3" => VERTEX_FORMAT_INT3,
        "int4" => VERTEX_FORMAT_INT4,
        _ => return 0,
    };
    fourcc.to_u32()
}

/// 0 when the dimension name is not known
pub fn image_dim(dimension: &str) -> u32 {
    let fourcc = match dimension {
        "1d" => IMAGE_DIM_1D,
        "2d" => IMAGE_DIM_2D,
        "3d" => IMAGE_DIM_3D,
        "cube" => IMAGE_DIM_CUBE,
        "rect" => IMAGE_DIM_RECT,
        "buffer" => IMAGE_DIM_BUFFER,
        "subpass_data" => IMAGE_DIM_SUBPASS,
        _ => return 0,
    };
    fourcc.to_u32()
}
