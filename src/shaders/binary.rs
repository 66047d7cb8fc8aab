//! fixed-layout binary reflection, stored in the REFL chunk of an sgs file
//!
//! all integers are little-endian and every string is a 32 byte nul-padded slot

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use thiserror::Error;

use super::Stage;
use super::json::{ResourceDescriptor, StageReflection};
use crate::sgs::fourcc;

pub const NAME_LEN: usize = 32;

pub const HEADER_SIZE: usize = NAME_LEN + 5 * 4 + 2 * 2;
pub const INPUT_SIZE: usize = NAME_LEN + 4 + NAME_LEN + 4 + 4;
pub const UNIFORM_BUFFER_SIZE: usize = NAME_LEN + 4 + 4 + 2;
pub const TEXTURE_SIZE: usize = NAME_LEN + 4 + 4 + 1 + 1;
pub const BUFFER_SIZE: usize = NAME_LEN + 4 + 4 + 4;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("reflection record is truncated")]
    Truncated(#[from] std::io::Error),
    #[error("reflection record has {0} trailing bytes")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReflectionRecord {
    pub name: String,
    pub flatten_ubos: bool,
    pub debug_info: bool,
    pub inputs: Vec<InputRecord>,
    pub uniform_buffers: Vec<UniformBufferRecord>,
    pub textures: Vec<TextureRecord>,
    pub storage_images: Vec<TextureRecord>,
    pub storage_buffers: Vec<BufferRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputRecord {
    pub name: String,
    pub location: i32,
    pub semantic: String,
    pub semantic_index: u32,
    pub format: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniformBufferRecord {
    pub name: String,
    pub binding: i32,
    pub size_bytes: u32,
    pub array_size: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureRecord {
    pub name: String,
    pub binding: i32,
    pub image_dim: u32,
    pub multisample: bool,
    pub is_array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferRecord {
    pub name: String,
    pub binding: i32,
    pub size_bytes: u32,
    pub array_stride: u32,
}

impl ReflectionRecord {
    /// storage images and buffers are only recorded for compute stages
    pub fn from_stage(
        name: &str,
        stage: Stage,
        reflection: &StageReflection,
        flatten_ubos: bool,
        debug_info: bool,
    ) -> Self {
        let inputs = reflection.inputs.iter().map(input_record).collect();
        let uniform_buffers = reflection
            .uniform_buffers
            .iter()
            .map(uniform_buffer_record)
            .collect();
        let textures = reflection.textures.iter().map(texture_record).collect();

        let (storage_images, storage_buffers) = if stage == Stage::Compute {
            (
                reflection.storage_images.iter().map(texture_record).collect(),
                reflection.storage_buffers.iter().map(buffer_record).collect(),
            )
        } else {
            (vec![], vec![])
        };

        Self {
            name: name.to_string(),
            flatten_ubos,
            debug_info,
            inputs,
            uniform_buffers,
            textures,
            storage_images,
            storage_buffers,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_name(writer, &self.name)?;
        writer.write_u32::<LittleEndian>(self.inputs.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.textures.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.uniform_buffers.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.storage_images.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.storage_buffers.len() as u32)?;
        writer.write_u16::<LittleEndian>(self.flatten_ubos as u16)?;
        writer.write_u16::<LittleEndian>(self.debug_info as u16)?;

        for input in &self.inputs {
            write_name(writer, &input.name)?;
            writer.write_i32::<LittleEndian>(input.location)?;
            write_name(writer, &input.semantic)?;
            writer.write_u32::<LittleEndian>(input.semantic_index)?;
            writer.write_u32::<LittleEndian>(input.format)?;
        }

        for ubo in &self.uniform_buffers {
            write_name(writer, &ubo.name)?;
            writer.write_i32::<LittleEndian>(ubo.binding)?;
            writer.write_u32::<LittleEndian>(ubo.size_bytes)?;
            writer.write_u16::<LittleEndian>(ubo.array_size)?;
        }

        for texture in self.textures.iter().chain(&self.storage_images) {
            write_name(writer, &texture.name)?;
            writer.write_i32::<LittleEndian>(texture.binding)?;
            writer.write_u32::<LittleEndian>(texture.image_dim)?;
            writer.write_u8(texture.multisample as u8)?;
            writer.write_u8(texture.is_array as u8)?;
        }

        for buffer in &self.storage_buffers {
            write_name(writer, &buffer.name)?;
            writer.write_i32::<LittleEndian>(buffer.binding)?;
            writer.write_u32::<LittleEndian>(buffer.size_bytes)?;
            writer.write_u32::<LittleEndian>(buffer.array_stride)?;
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.size());
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    pub fn size(&self) -> usize {
        HEADER_SIZE
            + self.inputs.len() * INPUT_SIZE
            + self.uniform_buffers.len() * UNIFORM_BUFFER_SIZE
            + (self.textures.len() + self.storage_images.len()) * TEXTURE_SIZE
            + self.storage_buffers.len() * BUFFER_SIZE
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self, RecordError> {
        let name = read_name(reader)?;
        let num_inputs = reader.read_u32::<LittleEndian>()?;
        let num_textures = reader.read_u32::<LittleEndian>()?;
        let num_uniform_buffers = reader.read_u32::<LittleEndian>()?;
        let num_storage_images = reader.read_u32::<LittleEndian>()?;
        let num_storage_buffers = reader.read_u32::<LittleEndian>()?;
        let flatten_ubos = reader.read_u16::<LittleEndian>()? != 0;
        let debug_info = reader.read_u16::<LittleEndian>()? != 0;

        let mut inputs = vec![];
        for _ in 0..num_inputs {
            inputs.push(InputRecord {
                name: read_name(reader)?,
                location: reader.read_i32::<LittleEndian>()?,
                semantic: read_name(reader)?,
                semantic_index: reader.read_u32::<LittleEndian>()?,
                format: reader.read_u32::<LittleEndian>()?,
            });
        }

        let mut uniform_buffers = vec![];
        for _ in 0..num_uniform_buffers {
            uniform_buffers.push(UniformBufferRecord {
                name: read_name(reader)?,
                binding: reader.read_i32::<LittleEndian>()?,
                size_bytes: reader.read_u32::<LittleEndian>()?,
                array_size: reader.read_u16::<LittleEndian>()?,
            });
        }

        let mut textures = vec![];
        for _ in 0..num_textures {
            textures.push(read_texture(reader)?);
        }

        let mut storage_images = vec![];
        for _ in 0..num_storage_images {
            storage_images.push(read_texture(reader)?);
        }

        let mut storage_buffers = vec![];
        for _ in 0..num_storage_buffers {
            storage_buffers.push(BufferRecord {
                name: read_name(reader)?,
                binding: reader.read_i32::<LittleEndian>()?,
                size_bytes: reader.read_u32::<LittleEndian>()?,
                array_stride: reader.read_u32::<LittleEndian>()?,
            });
        }

        Ok(Self {
            name,
            flatten_ubos,
            debug_info,
            inputs,
            uniform_buffers,
            textures,
            storage_images,
            storage_buffers,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let record = Self::read(&mut cursor)?;

        let trailing = bytes.len() - cursor.position() as usize;
        if trailing != 0 {
            return Err(RecordError::TrailingBytes(trailing));
        }

        Ok(record)
    }
}

fn input_record(descriptor: &ResourceDescriptor) -> InputRecord {
    let (semantic, semantic_index) = descriptor
        .vertex_semantic
        .as_ref()
        .map(|s| (s.semantic_name.clone(), s.semantic_index))
        .unwrap_or_default();

    InputRecord {
        name: descriptor.name.clone(),
        location: optional_index(descriptor.location),
        semantic,
        semantic_index,
        format: descriptor
            .type_tag
            .as_deref()
            .map(fourcc::vertex_format)
            .unwrap_or(0),
    }
}

fn uniform_buffer_record(descriptor: &ResourceDescriptor) -> UniformBufferRecord {
    let array_size = descriptor.array_length.unwrap_or(1).min(u16::MAX as u32) as u16;

    UniformBufferRecord {
        name: descriptor.name.clone(),
        binding: optional_index(descriptor.binding),
        size_bytes: descriptor.block_size_bytes.unwrap_or(0),
        array_size,
    }
}

fn texture_record(descriptor: &ResourceDescriptor) -> TextureRecord {
    let info = descriptor.texture_info.as_ref();

    TextureRecord {
        name: descriptor.name.clone(),
        binding: optional_index(descriptor.binding),
        image_dim: info.map(|i| fourcc::image_dim(&i.dimension)).unwrap_or(0),
        multisample: info.is_some_and(|i| i.multisampled),
        is_array: info.is_some_and(|i| i.arrayed),
    }
}

fn buffer_record(descriptor: &ResourceDescriptor) -> BufferRecord {
    BufferRecord {
        name: descriptor.name.clone(),
        binding: optional_index(descriptor.binding),
        size_bytes: descriptor.block_size_bytes.unwrap_or(0),
        array_stride: descriptor.unsized_array_stride.unwrap_or(0),
    }
}

/// -1 marks a missing binding or location
fn optional_index(value: Option<u32>) -> i32 {
    value.map(|v| v as i32).unwrap_or(-1)
}

/// names longer than 31 bytes are cut at a char boundary, leaving room for the nul
fn write_name<W: Write>(writer: &mut W, name: &str) -> std::io::Result<()> {
    let mut len = name.len().min(NAME_LEN - 1);
    while !name.is_char_boundary(len) {
        len -= 1;
    }

    let mut slot = [0u8; NAME_LEN];
    slot[..len].copy_from_slice(&name.as_bytes()[..len]);
    writer.write_all(&slot)
}

fn read_name<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut slot = [0u8; NAME_LEN];
    reader.read_exact(&mut slot)?;

    let len = slot.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
    Ok(String::from_utf8_lossy(&slot[..len]).into_owned())
}

fn read_texture<R: Read>(reader: &mut R) -> Result<TextureRecord, RecordError> {
    Ok(TextureRecord {
        name: read_name(reader)?,
        binding: reader.read_i32::<LittleEndian>()?,
        image_dim: reader.read_u32::<LittleEndian>()?,
        multisample: reader.read_u8()? != 0,
        is_array: reader.read_u8()? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::shaders::json::*;

    fn compute_reflection() -> StageReflection {
        StageReflection {
            file: "blur.comp".to_string(),
            uniform_buffers: vec![ResourceDescriptor {
                id: 4,
                name: "Params".to_string(),
                kind: ResourceKind::UniformBuffer,
                binding: Some(0),
                block_size_bytes: Some(32),
                ..Default::default()
            }],
            textures: vec![ResourceDescriptor {
                id: 5,
                name: "u_source".to_string(),
                kind: ResourceKind::Texture,
                binding: Some(1),
                texture_info: Some(TextureInfo {
                    dimension: "2d".to_string(),
                    format: "unknown".to_string(),
                    multisampled: false,
                    arrayed: true,
                }),
                ..Default::default()
            }],
            storage_images: vec![ResourceDescriptor {
                id: 6,
                name: "u_target".to_string(),
                kind: ResourceKind::StorageImage,
                binding: Some(2),
                texture_info: Some(TextureInfo {
                    dimension: "2d".to_string(),
                    format: "Rgba8".to_string(),
                    multisampled: false,
                    arrayed: false,
                }),
                ..Default::default()
            }],
            storage_buffers: vec![ResourceDescriptor {
                id: 7,
                name: "Histogram".to_string(),
                kind: ResourceKind::StorageBuffer,
                binding: Some(3),
                block_size_bytes: Some(0),
                unsized_array_stride: Some(4),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn header_counts_match_records() {
        let record =
            ReflectionRecord::from_stage("blur", Stage::Compute, &compute_reflection(), false, true);
        let bytes = record.to_bytes().unwrap();

        assert_eq!(bytes.len(), record.size());
        assert_eq!(
            bytes.len(),
            HEADER_SIZE + UNIFORM_BUFFER_SIZE + 2 * TEXTURE_SIZE + BUFFER_SIZE
        );

        let counts: Vec<u32> = (0..5)
            .map(|i| {
                let at = NAME_LEN + i * 4;
                u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
            })
            .collect();
        // inputs, textures, uniform buffers, storage images, storage buffers
        assert_eq!(counts, vec![0, 1, 1, 1, 1]);
        assert_eq!(&bytes[NAME_LEN + 20..HEADER_SIZE], &[0, 0, 1, 0]);

        assert_eq!(ReflectionRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn storage_resources_only_for_compute() {
        let record =
            ReflectionRecord::from_stage("blur", Stage::Fragment, &compute_reflection(), false, false);

        assert!(record.storage_images.is_empty());
        assert!(record.storage_buffers.is_empty());
        assert_eq!(record.textures.len(), 1);
    }

    #[test]
    fn long_names_are_truncated() {
        let long_name = "a_very_long_vertex_attribute_name_indeed";
        let mut bytes = vec![];
        write_name(&mut bytes, long_name).unwrap();

        assert_eq!(bytes.len(), NAME_LEN);
        assert_eq!(bytes[NAME_LEN - 1], 0);
        let read = read_name(&mut bytes.as_slice()).unwrap();
        assert_eq!(read, &long_name[..NAME_LEN - 1]);
    }

    #[test]
    fn vertex_inputs() {
        let reflection = StageReflection {
            inputs: vec![ResourceDescriptor {
                id: 1,
                name: "a_uv".to_string(),
                kind: ResourceKind::VertexInput,
                location: Some(2),
                vertex_semantic: Some(VertexSemantic {
                    semantic_name: "TEXCOORD".to_string(),
                    semantic_index: 0,
                }),
                type_tag: Some("float2".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let record = ReflectionRecord::from_stage("quad", Stage::Vertex, &reflection, false, false);
        let input = &record.inputs[0];
        assert_eq!(input.location, 2);
        assert_eq!(input.semantic, "TEXCOORD");
        assert_eq!(input.format, fourcc::VERTEX_FORMAT_FLOAT2.to_u32());

        let bytes = record.to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + INPUT_SIZE);
        assert_eq!(&bytes[HEADER_SIZE + NAME_LEN + 4 + NAME_LEN + 4..], b"FLT2");
    }

    #[test]
    fn flattened_uniform_buffer_size() {
        use crate::shaders::reflection::descriptors::flattened_array_length;

        // a 20 byte block spills into a second float4
        let descriptor = ResourceDescriptor {
            name: "Params".to_string(),
            kind: ResourceKind::UniformBuffer,
            block_size_bytes: Some(20),
            type_tag: Some("float4".to_string()),
            array_length: Some(flattened_array_length(20)),
            ..Default::default()
        };

        let ubo = uniform_buffer_record(&descriptor);
        assert_eq!(ubo.array_size, 2);
        assert_eq!(ubo.size_bytes, 20);
        assert_eq!(ubo.binding, -1);
    }

    #[test]
    fn truncated_record() {
        let record =
            ReflectionRecord::from_stage("blur", Stage::Compute, &compute_reflection(), false, false);
        let bytes = record.to_bytes().unwrap();

        assert!(matches!(
            ReflectionRecord::from_bytes(&bytes[..bytes.len() - 1]),
            Err(RecordError::Truncated(_))
        ));
    }
}
