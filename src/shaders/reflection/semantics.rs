use crate::shaders::json::VertexSemantic;

pub const VERTEX_ATTRIB_COUNT: usize = 18;

/// the attribute names vertex input locations are bound to, indexed by location
pub const VERTEX_ATTRIB_NAMES: [&str; VERTEX_ATTRIB_COUNT] = [
    "POSITION",
    "NORMAL",
    "TEXCOORD0",
    "TEXCOORD1",
    "TEXCOORD2",
    "TEXCOORD3",
    "TEXCOORD4",
    "TEXCOORD5",
    "TEXCOORD6",
    "TEXCOORD7",
    "COLOR0",
    "COLOR1",
    "COLOR2",
    "COLOR3",
    "TANGENT",
    "BINORMAL",
    "BLENDINDICES",
    "BLENDWEIGHT",
];

const SEMANTICS: [(&str, u32); VERTEX_ATTRIB_COUNT] = [
    ("POSITION", 0),
    ("NORMAL", 0),
    ("TEXCOORD", 0),
    ("TEXCOORD", 1),
    ("TEXCOORD", 2),
    ("TEXCOORD", 3),
    ("TEXCOORD", 4),
    ("TEXCOORD", 5),
    ("TEXCOORD", 6),
    ("TEXCOORD", 7),
    ("COLOR", 0),
    ("COLOR", 1),
    ("COLOR", 2),
    ("COLOR", 3),
    ("TANGENT", 0),
    ("BINORMAL", 0),
    ("BLENDINDICES", 0),
    ("BLENDWEIGHT", 0),
];

/// the semantic for a vertex input location, defined for locations in [0, 18)
pub fn vertex_semantic(location: u32) -> Option<VertexSemantic> {
    let (semantic_name, semantic_index) = SEMANTICS.get(location as usize)?;

    Some(VertexSemantic {
        semantic_name: semantic_name.to_string(),
        semantic_index: *semantic_index,
    })
}
