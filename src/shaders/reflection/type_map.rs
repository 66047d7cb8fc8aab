use crate::shaders::compiled::{BaseType, ShaderType};

pub const UNKNOWN_TYPE: &str = "unknown";

struct TypeMapping {
    base_type: BaseType,
    vec_size: u32,
    columns: u32,
    tag: &'static str,
}

const fn mapping(base_type: BaseType, vec_size: u32, columns: u32, tag: &'static str) -> TypeMapping {
    TypeMapping {
        base_type,
        vec_size,
        columns,
        tag,
    }
}

// first match wins
// half vectors share the tags of float vectors of the same width
const TYPE_MAPPINGS: &[TypeMapping] = &[
    mapping(BaseType::Float, 1, 1, "float"),
    mapping(BaseType::Float, 2, 1, "float2"),
    mapping(BaseType::Float, 3, 1, "float3"),
    mapping(BaseType::Float, 4, 1, "float4"),
    // non-square matrices are named mat<column height>x<columns>
    mapping(BaseType::Float, 3, 4, "mat3x4"),
    mapping(BaseType::Float, 4, 3, "mat4x3"),
    mapping(BaseType::Float, 3, 3, "mat3x3"),
    mapping(BaseType::Float, 4, 4, "mat4"),
    mapping(BaseType::Int, 1, 1, "int"),
    mapping(BaseType::Int, 2, 1, "int2"),
    mapping(BaseType::Int, 3, 1, "int3"),
    mapping(BaseType::Int, 4, 1, "int4"),
    mapping(BaseType::Half, 1, 1, "float"),
    mapping(BaseType::Half, 2, 1, "float2"),
    mapping(BaseType::Half, 3, 1, "float3"),
    mapping(BaseType::Half, 4, 1, "float4"),
];

/// canonical type tag for a base type, vector width and column count
pub fn resolve(base_type: BaseType, vec_size: u32, columns: u32) -> &'static str {
    TYPE_MAPPINGS
        .iter()
        .find(|m| m.base_type == base_type && m.vec_size == vec_size && m.columns == columns)
        .map(|m| m.tag)
        .unwrap_or(UNKNOWN_TYPE)
}

pub fn resolve_type(shader_type: &ShaderType) -> &'static str {
    resolve(
        shader_type.base_type,
        shader_type.vec_size,
        shader_type.columns,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_and_matrices() {
        assert_eq!(resolve(BaseType::Float, 3, 1), "float3");
        assert_eq!(resolve(BaseType::Float, 4, 4), "mat4");
        assert_eq!(resolve(BaseType::Float, 3, 3), "mat3x3");
        assert_eq!(resolve(BaseType::Int, 2, 1), "int2");
    }

    #[test]
    fn non_square_matrices() {
        // four float3 columns
        assert_eq!(resolve(BaseType::Float, 3, 4), "mat3x4");
        assert_eq!(resolve(BaseType::Float, 4, 3), "mat4x3");
    }

    #[test]
    fn half_collapses_onto_float() {
        for width in 1..=4 {
            assert_eq!(
                resolve(BaseType::Half, width, 1),
                resolve(BaseType::Float, width, 1)
            );
        }
    }

    #[test]
    fn uncovered_types_are_unknown() {
        assert_eq!(resolve(BaseType::Double, 4, 1), UNKNOWN_TYPE);
        assert_eq!(resolve(BaseType::UInt, 1, 1), UNKNOWN_TYPE);
        assert_eq!(resolve(BaseType::Float, 2, 2), UNKNOWN_TYPE);
    }
}
