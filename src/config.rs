//! option parsing shared by the cli and the pipeline

use std::path::Path;

use thiserror::Error;

use crate::shaders::reflection::semantics::VERTEX_ATTRIB_NAMES;
use crate::shaders::{ShaderLang, Stage};

/// the number of render targets the fragment semantic preamble names
pub const FRAGMENT_TARGET_COUNT: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown shader language '{0}', expected one of gles, hlsl, msl, glsl")]
    UnknownLang(String),
    #[error("no shader stage given")]
    NoStages,
    #[error("a compute stage cannot be combined with vertex or fragment stages")]
    ComputeWithGraphics,
    #[error("{0} stage is given more than once")]
    DuplicateStage(Stage),
}

pub fn parse_shader_lang(name: &str) -> Result<ShaderLang, ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "gles" => Ok(ShaderLang::Gles),
        "hlsl" => Ok(ShaderLang::Hlsl),
        "msl" | "metal" => Ok(ShaderLang::Msl),
        "glsl" => Ok(ShaderLang::Glsl),
        _ => Err(ConfigError::UnknownLang(name.to_string())),
    }
}

/// the profile used when none is given on the command line
pub fn default_profile_version(lang: ShaderLang, requested: u32) -> u32 {
    if requested != 0 {
        return requested;
    }

    match lang {
        ShaderLang::Gles => 200,
        ShaderLang::Hlsl => 50,
        ShaderLang::Glsl => 400,
        ShaderLang::Msl => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

/// `A=1, B; C:2`
pub fn parse_defines(defines: &str) -> Vec<Define> {
    defines
        .split([',', ';'])
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| match d.split_once(['=', ':']) {
            Some((name, value)) => Define {
                name: name.trim().to_string(),
                value: Some(value.trim().to_string()),
            },
            None => Define {
                name: d.to_string(),
                value: None,
            },
        })
        .collect()
}

/// `;`-separated, with backslashes turned into forward slashes
pub fn parse_include_dirs(dirs: &str) -> Vec<String> {
    dirs.split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.replace('\\', "/"))
        .collect()
}

/// lets glsl sources write `layout(location = TEXCOORD0)`
pub fn semantics_preamble() -> String {
    let mut preamble = String::new();

    for (location, name) in VERTEX_ATTRIB_NAMES.iter().enumerate() {
        preamble.push_str(&format!("#define {name} {location}\n"));
    }
    for target in 0..FRAGMENT_TARGET_COUNT {
        preamble.push_str(&format!("#define SV_Target{target} {target}\n"));
    }

    preamble
}

/// a program is vertex and/or fragment, or compute alone
pub fn validate_stages(stages: &[Stage]) -> Result<(), ConfigError> {
    if stages.is_empty() {
        return Err(ConfigError::NoStages);
    }

    for (i, stage) in stages.iter().enumerate() {
        if stages[..i].contains(stage) {
            return Err(ConfigError::DuplicateStage(*stage));
        }
    }

    if stages.contains(&Stage::Compute) && stages.len() > 1 {
        return Err(ConfigError::ComputeWithGraphics);
    }

    Ok(())
}

pub fn is_sgs_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sgs"))
}
