use log::*;

use super::fourcc::{self, Fourcc};
use super::{SgsError, SgsFile};
use crate::shaders::compiled::StageCode;

/// a cursor over a chunk payload
struct Chunks<'a> {
    bytes: &'a [u8],
}

impl<'a> Chunks<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn take(&mut self, fourcc: Fourcc, len: usize) -> Result<&'a [u8], SgsError> {
        if self.bytes.len() < len {
            return Err(SgsError::Truncated {
                fourcc,
                declared: len as u32,
                available: self.bytes.len(),
            });
        }
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(head)
    }

    fn fourcc(&mut self, context: Fourcc) -> Result<Fourcc, SgsError> {
        let bytes = self.take(context, 4)?;
        Ok(Fourcc([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u32(&mut self, context: Fourcc) -> Result<u32, SgsError> {
        let bytes = self.take(context, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// reads a chunk header and returns its tag and payload
    fn chunk(&mut self) -> Result<(Fourcc, &'a [u8]), SgsError> {
        let fourcc = self.fourcc(Fourcc(*b"????"))?;
        let size = self.u32(fourcc)?;
        let payload = self.take(fourcc, size as usize)?;
        Ok((fourcc, payload))
    }
}

/// parses a chunked sgs container back into its stages
pub fn read_sgs(bytes: &[u8]) -> Result<SgsFile, SgsError> {
    let mut chunks = Chunks::new(bytes);

    let header = chunks.fourcc(fourcc::SGS)?;
    if header != fourcc::SGS {
        return Err(SgsError::UnexpectedChunk {
            expected: fourcc::SGS,
            found: header,
        });
    }
    // the SGS size field carries no meaning
    let _ = chunks.u32(fourcc::SGS)?;

    let lang_fourcc = chunks.fourcc(fourcc::SGS)?;
    let lang = fourcc::lang_from_fourcc(lang_fourcc).ok_or(SgsError::UnknownFourcc {
        what: "shader language",
        fourcc: lang_fourcc,
    })?;
    let profile_version = chunks.u32(fourcc::SGS)?;

    let mut sgs = SgsFile::new(lang, profile_version);

    while !chunks.is_empty() {
        let (tag, payload) = chunks.chunk()?;
        if tag != fourcc::STAG {
            return Err(SgsError::UnexpectedChunk {
                expected: fourcc::STAG,
                found: tag,
            });
        }
        read_stage(&mut sgs, payload)?;
    }

    debug!(
        "read sgs container: {lang} {profile_version}, {} stages",
        sgs.stages().len()
    );
    Ok(sgs)
}

fn read_stage(sgs: &mut SgsFile, payload: &[u8]) -> Result<(), SgsError> {
    let mut chunks = Chunks::new(payload);

    let stage_fourcc = chunks.fourcc(fourcc::STAG)?;
    let stage = fourcc::stage_from_fourcc(stage_fourcc).ok_or(SgsError::UnknownFourcc {
        what: "stage",
        fourcc: stage_fourcc,
    })?;
    if sgs.stage(stage).is_some() {
        return Err(SgsError::DuplicateStage { stage });
    }

    let (code_fourcc, code) = chunks.chunk()?;
    let code = match code_fourcc {
        fourcc::CODE => {
            let text = code.strip_suffix(&[0]).unwrap_or(code);
            let text = std::str::from_utf8(text).map_err(|_| SgsError::InvalidSource { stage })?;
            StageCode::Source(text.to_string())
        }
        fourcc::DATA => StageCode::Bytecode(code.to_vec()),
        found => {
            return Err(SgsError::UnexpectedChunk {
                expected: fourcc::CODE,
                found,
            });
        }
    };
    sgs.stage_mut(stage).code = Some(code);

    if !chunks.is_empty() {
        let (tag, reflection) = chunks.chunk()?;
        if tag != fourcc::REFL {
            return Err(SgsError::UnexpectedChunk {
                expected: fourcc::REFL,
                found: tag,
            });
        }
        sgs.add_reflection(stage, reflection)?;
    }

    if !chunks.is_empty() {
        warn!(
            "ignoring {} trailing bytes in {stage} stage chunk",
            chunks.bytes.len()
        );
    }

    Ok(())
}
