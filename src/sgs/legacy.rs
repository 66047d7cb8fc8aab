//! the older table-based container, signature "SGS1"
//!
//! a fixed header and a stage table with absolute offsets, followed by one
//! block of nul-terminated reflection json and one block of code

use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::*;

use super::{SgsError, commit_bytes};
use crate::shaders::{ShaderLang, Stage};

pub const SIGNATURE: u32 = 0x5347_5331;
pub const VERSION: i32 = 100;

pub const HEADER_SIZE: usize = 5 * 4;
pub const STAGE_ENTRY_SIZE: usize = 5 * 4;

pub fn lang_id(lang: ShaderLang) -> i32 {
    match lang {
        ShaderLang::Gles => 1,
        ShaderLang::Hlsl => 2,
        ShaderLang::Msl => 3,
        ShaderLang::Glsl => 4,
    }
}

pub fn stage_id(stage: Stage) -> i32 {
    match stage {
        Stage::Vertex => 0,
        Stage::Fragment => 1,
        Stage::Compute => 2,
    }
}

#[derive(Debug, Clone, Default)]
struct LegacyStage {
    code: Option<Vec<u8>>,
    reflection: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct LegacySgsFile {
    lang: ShaderLang,
    profile_version: u32,
    stages: Vec<(Stage, LegacyStage)>,
}

impl LegacySgsFile {
    pub fn new(lang: ShaderLang, profile_version: u32) -> Self {
        Self {
            lang,
            profile_version,
            stages: vec![],
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut LegacyStage {
        let index = match self.stages.iter().position(|(s, _)| *s == stage) {
            Some(index) => index,
            None => {
                self.stages.push((stage, LegacyStage::default()));
                self.stages.len() - 1
            }
        };
        &mut self.stages[index].1
    }

    pub fn add_code(&mut self, stage: Stage, source: &str) -> Result<(), SgsError> {
        if source.contains('\0') {
            return Err(SgsError::InteriorNul { stage });
        }
        self.set_code(stage, nul_terminated(source))
    }

    pub fn add_code_bin(&mut self, stage: Stage, bytecode: &[u8]) -> Result<(), SgsError> {
        self.set_code(stage, bytecode.to_vec())
    }

    fn set_code(&mut self, stage: Stage, code: Vec<u8>) -> Result<(), SgsError> {
        let entry = self.stage_mut(stage);
        if entry.code.is_some() {
            return Err(SgsError::DuplicateCode { stage });
        }
        entry.code = Some(code);
        Ok(())
    }

    /// reflection is stored as nul-terminated json text
    pub fn add_reflection(&mut self, stage: Stage, json: &str) -> Result<(), SgsError> {
        if json.contains('\0') {
            return Err(SgsError::InteriorNul { stage });
        }
        let entry = self.stage_mut(stage);
        if entry.reflection.is_some() {
            return Err(SgsError::DuplicateReflection { stage });
        }
        entry.reflection = Some(nul_terminated(json));
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SgsError> {
        let reflect_start = HEADER_SIZE + STAGE_ENTRY_SIZE * self.stages.len();
        let reflect_block_size: usize = self
            .stages
            .iter()
            .filter_map(|(_, s)| s.reflection.as_ref())
            .map(Vec::len)
            .sum();
        let code_start = reflect_start + reflect_block_size;

        let mut bytes = vec![];
        bytes.write_u32::<LittleEndian>(SIGNATURE)?;
        bytes.write_i32::<LittleEndian>(VERSION)?;
        bytes.write_i32::<LittleEndian>(lang_id(self.lang))?;
        bytes.write_i32::<LittleEndian>(self.profile_version as i32)?;
        bytes.write_i32::<LittleEndian>(self.stages.len() as i32)?;

        let mut reflect_offset = reflect_start;
        let mut code_offset = code_start;
        for (stage, entry) in &self.stages {
            let code = entry
                .code
                .as_ref()
                .ok_or(SgsError::MissingCode { stage: *stage })?;
            let reflect_size = entry.reflection.as_ref().map(Vec::len).unwrap_or(0);

            bytes.write_i32::<LittleEndian>(stage_id(*stage))?;
            bytes.write_i32::<LittleEndian>(code.len() as i32)?;
            bytes.write_i32::<LittleEndian>(code_offset as i32)?;
            bytes.write_i32::<LittleEndian>(reflect_size as i32)?;
            bytes.write_i32::<LittleEndian>(reflect_offset as i32)?;

            code_offset += code.len();
            reflect_offset += reflect_size;
        }

        for (_, entry) in &self.stages {
            if let Some(reflection) = &entry.reflection {
                bytes.write_all(reflection)?;
            }
        }
        for (_, entry) in &self.stages {
            if let Some(code) = &entry.code {
                bytes.write_all(code)?;
            }
        }

        Ok(bytes)
    }

    pub fn commit(&self, path: &Path) -> Result<(), SgsError> {
        let bytes = self.to_bytes()?;
        commit_bytes(path, &bytes)?;

        info!("wrote legacy container {}", path.display());
        Ok(())
    }
}

fn nul_terminated(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(0);
    bytes
}
