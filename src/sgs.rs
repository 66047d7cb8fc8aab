//! the chunked sgs shader container
//!
//! ```text
//! SGS  {size, lang, profile_version}
//! STAG {size, stage, CODE|DATA {size, bytes}, [REFL {size, record}]}
//! STAG ...
//! ```
//!
//! every chunk header is a fourcc followed by a little-endian u32 payload size

use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use log::*;
use thiserror::Error;

use crate::shaders::compiled::StageCode;
use crate::shaders::{ShaderLang, Stage};

pub mod fourcc;
pub mod legacy;
mod reader;

pub use fourcc::Fourcc;
pub use reader::read_sgs;

pub const CHUNK_HEADER_SIZE: u32 = 8;

/// written into the size field of the leading SGS chunk; readers ignore it
pub const SGS_SIZE_SENTINEL: u32 = 0;

#[derive(Debug, Error)]
pub enum SgsError {
    #[error("{stage} stage already has code")]
    DuplicateCode { stage: Stage },
    #[error("{stage} stage already has reflection data")]
    DuplicateReflection { stage: Stage },
    #[error("{stage} stage source contains a nul byte")]
    InteriorNul { stage: Stage },
    #[error("{stage} stage has no code")]
    MissingCode { stage: Stage },
    #[error("{stage} stage appears more than once")]
    DuplicateStage { stage: Stage },
    #[error("expected '{expected}' chunk, found '{found}'")]
    UnexpectedChunk { expected: Fourcc, found: Fourcc },
    #[error("unknown {what} '{fourcc}'")]
    UnknownFourcc { what: &'static str, fourcc: Fourcc },
    #[error("'{fourcc}' chunk declares {declared} bytes but only {available} remain")]
    Truncated {
        fourcc: Fourcc,
        declared: u32,
        available: usize,
    },
    #[error("{stage} stage source is not valid utf-8")]
    InvalidSource { stage: Stage },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// one stage entry, keyed by stage and kept in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub code: Option<StageCode>,
    pub reflection: Option<Vec<u8>>,
}

impl StageRecord {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            code: None,
            reflection: None,
        }
    }

    /// code payload as stored on disk, text carries its terminating nul
    fn code_payload(&self) -> Result<(Fourcc, Vec<u8>), SgsError> {
        match &self.code {
            Some(StageCode::Source(text)) => {
                let mut bytes = Vec::with_capacity(text.len() + 1);
                bytes.extend_from_slice(text.as_bytes());
                bytes.push(0);
                Ok((fourcc::CODE, bytes))
            }
            Some(StageCode::Bytecode(data)) => Ok((fourcc::DATA, data.clone())),
            None => Err(SgsError::MissingCode { stage: self.stage }),
        }
    }
}

/// an sgs container being assembled in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgsFile {
    lang: ShaderLang,
    profile_version: u32,
    stages: Vec<StageRecord>,
}

impl SgsFile {
    pub fn new(lang: ShaderLang, profile_version: u32) -> Self {
        Self {
            lang,
            profile_version,
            stages: vec![],
        }
    }

    pub fn lang(&self) -> ShaderLang {
        self.lang
    }

    pub fn profile_version(&self) -> u32 {
        self.profile_version
    }

    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut StageRecord {
        let index = match self.stages.iter().position(|s| s.stage == stage) {
            Some(index) => index,
            None => {
                self.stages.push(StageRecord::new(stage));
                self.stages.len() - 1
            }
        };
        &mut self.stages[index]
    }

    pub fn add_code(&mut self, stage: Stage, source: &str) -> Result<(), SgsError> {
        if source.contains('\0') {
            return Err(SgsError::InteriorNul { stage });
        }
        self.set_code(stage, StageCode::Source(source.to_string()))
    }

    pub fn add_code_bin(&mut self, stage: Stage, bytecode: &[u8]) -> Result<(), SgsError> {
        self.set_code(stage, StageCode::Bytecode(bytecode.to_vec()))
    }

    fn set_code(&mut self, stage: Stage, code: StageCode) -> Result<(), SgsError> {
        let record = self.stage_mut(stage);
        if record.code.is_some() {
            return Err(SgsError::DuplicateCode { stage });
        }
        record.code = Some(code);
        Ok(())
    }

    pub fn add_reflection(&mut self, stage: Stage, record: &[u8]) -> Result<(), SgsError> {
        let entry = self.stage_mut(stage);
        if entry.reflection.is_some() {
            return Err(SgsError::DuplicateReflection { stage });
        }
        entry.reflection = Some(record.to_vec());
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SgsError> {
        let payloads = self
            .stages
            .iter()
            .map(|record| record.code_payload())
            .collect::<Result<Vec<_>, _>>()?;

        let mut bytes = vec![];
        write_chunk_header(&mut bytes, fourcc::SGS, SGS_SIZE_SENTINEL)?;
        bytes.write_u32::<LittleEndian>(fourcc::lang_fourcc(self.lang).to_u32())?;
        bytes.write_u32::<LittleEndian>(self.profile_version)?;

        for (record, (code_fourcc, code)) in self.stages.iter().zip(payloads) {
            let mut stag_size = 4 + CHUNK_HEADER_SIZE + code.len() as u32;
            if let Some(reflection) = &record.reflection {
                stag_size += CHUNK_HEADER_SIZE + reflection.len() as u32;
            }

            write_chunk_header(&mut bytes, fourcc::STAG, stag_size)?;
            bytes.write_u32::<LittleEndian>(fourcc::stage_fourcc(record.stage).to_u32())?;

            write_chunk_header(&mut bytes, code_fourcc, code.len() as u32)?;
            bytes.write_all(&code)?;

            if let Some(reflection) = &record.reflection {
                write_chunk_header(&mut bytes, fourcc::REFL, reflection.len() as u32)?;
                bytes.write_all(reflection)?;
            }
        }

        Ok(bytes)
    }

    /// writes the container next to `path` and moves it into place once complete
    pub fn commit(&self, path: &Path) -> Result<(), SgsError> {
        let bytes = self.to_bytes()?;
        commit_bytes(path, &bytes)?;

        info!(
            "wrote {} ({} stages, {} bytes)",
            path.display(),
            self.stages.len(),
            bytes.len()
        );
        Ok(())
    }
}

fn write_chunk_header<W: Write>(writer: &mut W, fourcc: Fourcc, size: u32) -> std::io::Result<()> {
    writer.write_all(&fourcc.0)?;
    writer.write_u32::<LittleEndian>(size)
}

/// write to a sibling temp file, then rename over the destination
pub(crate) fn commit_bytes(path: &Path, bytes: &[u8]) -> Result<(), SgsError> {
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    let write_error = |source| SgsError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Err(source) = std::fs::write(&tmp_path, bytes) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_error(source));
    }

    if let Err(source) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_error(source));
    }

    Ok(())
}
