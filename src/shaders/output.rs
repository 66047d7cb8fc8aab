use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Stage;
use crate::util::file_stem;

const BYTES_PER_LINE: usize = 16;

/// what goes into an output file
#[derive(Debug, Clone, Copy)]
pub enum OutputData<'a> {
    /// written as-is, or nul-terminated inside a c array
    Text(&'a str),
    Binary(&'a [u8]),
}

impl OutputData<'_> {
    fn plain_bytes(&self) -> &[u8] {
        match self {
            OutputData::Text(text) => text.as_bytes(),
            OutputData::Binary(bytes) => bytes,
        }
    }

    fn c_array_bytes(&self) -> Vec<u8> {
        match self {
            OutputData::Text(text) => {
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                bytes
            }
            OutputData::Binary(bytes) => bytes.to_vec(),
        }
    }
}

/// `out/sprite.glsl` -> `out/sprite_vs.glsl`
pub fn stage_output_path(output_path: &Path, stage: Stage) -> PathBuf {
    let stem = file_stem(output_path);

    let file_name = match output_path.extension() {
        Some(ext) => format!("{stem}_{}.{}", stage.short_name(), ext.to_string_lossy()),
        None => format!("{stem}_{}", stage.short_name()),
    };

    output_path.with_file_name(file_name)
}

/// `out/sprite_vs.glsl` -> `out/sprite_vs.glsl.json`
pub fn reflection_output_path(stage_path: &Path) -> PathBuf {
    let mut path = stage_path.as_os_str().to_owned();
    path.push(".json");
    PathBuf::from(path)
}

/// the c array variable of one stage, `<name>_<vs|fs|cs>`
pub fn c_array_name(base: &str, stage: Stage) -> String {
    format!("{base}_{}", stage.short_name())
}

/// writes `data` to `path`, either raw or as a c array declaration
///
/// appending only makes sense for c arrays, where several stages share one file
pub fn write_output(
    path: &Path,
    data: OutputData,
    c_array: Option<&str>,
    append: bool,
) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;

    match c_array {
        Some(var_name) => {
            let source = c_array_source(var_name, &data.c_array_bytes(), !append);
            file.write_all(source.as_bytes())
        }
        None => file.write_all(data.plain_bytes()),
    }
}

pub fn c_array_source(var_name: &str, bytes: &[u8], with_header: bool) -> String {
    let mut source = String::new();

    if with_header {
        source.push_str(&format!(
            "// This file is automatically created by {} v{}\n// \n#pragma once\n\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
        ));
    }

    let _ = write!(
        source,
        "static const unsigned char {var_name}[{}] = {{\n\t",
        bytes.len()
    );

    if bytes.is_empty() {
        source.push_str("};\n");
    }

    for (i, byte) in bytes.iter().enumerate() {
        if i + 1 == bytes.len() {
            let _ = writeln!(source, "0x{byte:02x} }};");
        } else {
            let _ = write!(source, "0x{byte:02x}, ");
        }

        if (i + 1) % BYTES_PER_LINE == 0 {
            source.push_str("\n\t");
        }
    }

    source.push('\n');
    source
}
