use std::path::{Path, PathBuf};

use anyhow::Context;
use log::*;

use super::binary::ReflectionRecord;
use super::compiled::{CompiledProgram, StageCode};
use super::json::ReflectionJson;
use super::output::{
    OutputData, c_array_name, reflection_output_path, stage_output_path, write_output,
};
use super::reflection::{ReflectionOptions, reflect_stage, reflection_json};
use super::{ShaderLang, Stage};
use crate::config;
use crate::sgs::SgsFile;
use crate::sgs::legacy::LegacySgsFile;
use crate::util::file_stem;

#[derive(Debug, Clone)]
pub struct Config {
    pub lang: ShaderLang,
    pub profile_version: u32,
    /// uniform buffers were flattened into vec4 arrays by the cross-compiler
    pub flatten_ubos: bool,
    /// the stage code is compiled bytecode rather than source
    pub bytecode: bool,
    /// bytecode carries debug info
    pub debug_info: bool,
    /// pack every stage into one sgs container at `output_path`
    pub sgs: bool,
    /// write the older table-based container instead of the chunked one
    pub legacy_sgs: bool,
    /// write the textual reflection next to the per-stage code files
    pub reflect: bool,
    /// one reflection file for the whole program instead of one per stage
    pub reflect_path: Option<PathBuf>,
    /// write c array declarations named `<cvar>_<vs|fs|cs>` into `output_path`
    pub cvar: Option<String>,
    /// indent the textual reflection
    pub pretty: bool,
    pub output_path: PathBuf,
}

impl Config {
    pub fn new(lang: ShaderLang, output_path: PathBuf) -> Self {
        Self {
            lang,
            profile_version: config::default_profile_version(lang, 0),
            flatten_ubos: false,
            bytecode: false,
            debug_info: false,
            sgs: config::is_sgs_path(&output_path),
            legacy_sgs: false,
            reflect: false,
            reflect_path: None,
            cvar: None,
            pretty: true,
            output_path,
        }
    }

    fn reflection_options(&self) -> ReflectionOptions {
        ReflectionOptions {
            lang: self.lang,
            profile_version: self.profile_version,
            bytecode: self.bytecode,
            debug_info: self.debug_info,
            flatten_ubos: self.flatten_ubos,
        }
    }
}

/// writes one compiled program, returning every file it wrote
pub fn write_compiled_program(
    config: &Config,
    program: &CompiledProgram,
) -> anyhow::Result<Vec<PathBuf>> {
    let stages: Vec<Stage> = program.stages.iter().map(|s| s.stage).collect();
    config::validate_stages(&stages)?;

    for compiled in &program.stages {
        let is_bytecode = matches!(compiled.code, StageCode::Bytecode(_));
        if is_bytecode != config.bytecode {
            warn!(
                "{} stage of {} is {}, but bytecode output is {}",
                compiled.stage,
                compiled.file,
                if is_bytecode { "bytecode" } else { "source" },
                if config.bytecode { "on" } else { "off" },
            );
        }
    }

    if let Some(parent) = config.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    if config.sgs {
        if config.legacy_sgs {
            write_legacy_sgs(config, program)?;
        } else {
            write_sgs(config, program)?;
        }
        Ok(vec![config.output_path.clone()])
    } else {
        write_stage_files(config, program)
    }
}

fn write_sgs(config: &Config, program: &CompiledProgram) -> anyhow::Result<()> {
    let mut sgs = SgsFile::new(config.lang, config.profile_version);

    for compiled in &program.stages {
        let stage = compiled.stage;
        info!("packing {stage} stage of {}", compiled.file);

        let added = match &compiled.code {
            StageCode::Source(source) => sgs.add_code(stage, source),
            StageCode::Bytecode(bytecode) => sgs.add_code_bin(stage, bytecode),
        };
        added.with_context(|| format!("failed to add {stage} stage of {}", compiled.file))?;

        let reflection = reflect_stage(
            &compiled.module,
            &compiled.module.resources,
            stage,
            &compiled.file,
            config.flatten_ubos,
        );
        let record = ReflectionRecord::from_stage(
            &record_name(&compiled.file),
            stage,
            &reflection,
            config.flatten_ubos,
            config.debug_info,
        );
        sgs.add_reflection(stage, &record.to_bytes()?)
            .with_context(|| format!("failed to add {stage} reflection of {}", compiled.file))?;
    }

    sgs.commit(&config.output_path)
        .with_context(|| format!("failed to write {}", config.output_path.display()))
}

fn write_legacy_sgs(config: &Config, program: &CompiledProgram) -> anyhow::Result<()> {
    let options = config.reflection_options();
    let mut sgs = LegacySgsFile::new(config.lang, config.profile_version);

    for compiled in &program.stages {
        let stage = compiled.stage;
        info!("packing {stage} stage of {} (legacy)", compiled.file);

        let added = match &compiled.code {
            StageCode::Source(source) => sgs.add_code(stage, source),
            StageCode::Bytecode(bytecode) => sgs.add_code_bin(stage, bytecode),
        };
        added.with_context(|| format!("failed to add {stage} stage of {}", compiled.file))?;

        let json = reflection_json(&options, compiled).to_json(false)?;
        sgs.add_reflection(stage, &json)?;
    }

    sgs.commit(&config.output_path)
        .with_context(|| format!("failed to write {}", config.output_path.display()))
}

fn write_stage_files(config: &Config, program: &CompiledProgram) -> anyhow::Result<Vec<PathBuf>> {
    let options = config.reflection_options();
    let mut written = vec![];
    let mut program_reflection: Option<ReflectionJson> = None;

    for (index, compiled) in program.stages.iter().enumerate() {
        let stage = compiled.stage;
        let c_array = config.cvar.as_deref().map(|base| c_array_name(base, stage));

        // c arrays of every stage share the output file
        let path = match &c_array {
            Some(_) => config.output_path.clone(),
            None => stage_output_path(&config.output_path, stage),
        };
        let append = c_array.is_some() && index > 0;

        let data = match &compiled.code {
            StageCode::Source(source) => OutputData::Text(source),
            StageCode::Bytecode(bytecode) => OutputData::Binary(bytecode),
        };
        write_output(&path, data, c_array.as_deref(), append)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {stage} stage of {} to {}", compiled.file, path.display());
        push_unique(&mut written, &path);

        if !config.reflect {
            continue;
        }

        let doc = reflection_json(&options, compiled);

        if config.reflect_path.is_some() {
            program_reflection = Some(match program_reflection.take() {
                Some(merged) => merge_stage(merged, doc),
                None => doc,
            });
            continue;
        }

        let json = doc.to_json(config.pretty && c_array.is_none())?;
        let (reflect_path, reflect_append) = match &c_array {
            Some(_) => (path.clone(), true),
            None => (reflection_output_path(&path), false),
        };
        let refl_var = c_array.as_ref().map(|name| format!("{name}_refl"));

        write_output(
            &reflect_path,
            OutputData::Text(&json),
            refl_var.as_deref(),
            reflect_append,
        )
        .with_context(|| format!("failed to write {}", reflect_path.display()))?;
        push_unique(&mut written, &reflect_path);
    }

    if let (Some(reflect_path), Some(doc)) = (&config.reflect_path, program_reflection) {
        write_program_reflection(config, reflect_path, &doc)?;
        push_unique(&mut written, reflect_path);
    }

    Ok(written)
}

fn write_program_reflection(
    config: &Config,
    reflect_path: &Path,
    doc: &ReflectionJson,
) -> anyhow::Result<()> {
    let json = doc.to_json(config.pretty && config.cvar.is_none())?;
    let refl_var = config.cvar.as_ref().map(|base| format!("{base}_refl"));

    write_output(reflect_path, OutputData::Text(&json), refl_var.as_deref(), false)
        .with_context(|| format!("failed to write {}", reflect_path.display()))?;
    info!("wrote reflection to {}", reflect_path.display());

    Ok(())
}

/// moves the stage of `doc` into `merged`
fn merge_stage(mut merged: ReflectionJson, doc: ReflectionJson) -> ReflectionJson {
    merged.vs = merged.vs.or(doc.vs);
    merged.fs = merged.fs.or(doc.fs);
    merged.cs = merged.cs.or(doc.cs);
    merged
}

fn push_unique(written: &mut Vec<PathBuf>, path: &Path) {
    if !written.iter().any(|p| p == path) {
        written.push(path.to_path_buf());
    }
}

/// the name stored in a binary reflection record
fn record_name(file: &str) -> String {
    file_stem(Path::new(file))
}

/// loads a program dumped by the cross-compiler as json
pub fn read_compiled_program(path: &Path) -> anyhow::Result<CompiledProgram> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let program: CompiledProgram = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse compiled program {}", path.display()))?;

    debug!(
        "read {} stages from {}",
        program.stages.len(),
        path.display()
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sgs::read_sgs;
    use crate::shaders::binary::ReflectionRecord;
    use crate::util::{manifest_path, relative_path};

    fn sprite_program() -> CompiledProgram {
        read_compiled_program(&manifest_path(["shaders", "compiled", "sprite.json"])).unwrap()
    }

    fn tmp_dir() -> PathBuf {
        let tmp_dir_path =
            std::env::temp_dir().join(format!("shader-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&tmp_dir_path).unwrap();
        tmp_dir_path
    }

    #[test]
    fn fixture_program() {
        let program = sprite_program();

        let stages: Vec<Stage> = program.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec![Stage::Vertex, Stage::Fragment]);
    }

    #[test]
    fn packs_sgs_container() {
        let tmp_dir_path = tmp_dir();
        let output_path = tmp_dir_path.join(relative_path(["out", "sprite.sgs"]));

        let config = Config::new(ShaderLang::Gles, output_path.clone());
        assert!(config.sgs);
        assert_eq!(config.profile_version, 200);

        let written = write_compiled_program(&config, &sprite_program()).unwrap();
        assert_eq!(written, vec![output_path.clone()]);

        let sgs = read_sgs(&std::fs::read(&output_path).unwrap()).unwrap();
        assert_eq!(sgs.lang(), ShaderLang::Gles);
        assert_eq!(sgs.stages().len(), 2);

        let vs = sgs.stage(Stage::Vertex).unwrap();
        let record = ReflectionRecord::from_bytes(vs.reflection.as_deref().unwrap()).unwrap();
        assert_eq!(record.name, "sprite");
        assert_eq!(record.inputs.len(), 3);
        assert_eq!(record.inputs[1].semantic, "TEXCOORD");
        assert_eq!(record.uniform_buffers[0].size_bytes, 64);

        let fs = sgs.stage(Stage::Fragment).unwrap();
        let record = ReflectionRecord::from_bytes(fs.reflection.as_deref().unwrap()).unwrap();
        assert_eq!(record.textures[0].name, "u_texture");
        assert_eq!(record.textures[0].binding, 1);

        std::fs::remove_dir_all(&tmp_dir_path).unwrap();
    }

    #[test]
    fn writes_stage_files_with_reflection() {
        let tmp_dir_path = tmp_dir();
        let mut config = Config::new(ShaderLang::Glsl, tmp_dir_path.join("sprite.glsl"));
        config.reflect = true;

        let written = write_compiled_program(&config, &sprite_program()).unwrap();

        let vs_path = tmp_dir_path.join("sprite_vs.glsl");
        let fs_json_path = tmp_dir_path.join("sprite_fs.glsl.json");
        assert_eq!(written.len(), 4);
        assert!(written.contains(&vs_path));
        assert!(written.contains(&fs_json_path));

        let vs_source = std::fs::read_to_string(&vs_path).unwrap();
        assert!(vs_source.contains("gl_Position"));

        let doc: ReflectionJson =
            serde_json::from_str(&std::fs::read_to_string(&fs_json_path).unwrap()).unwrap();
        assert_eq!(doc.profile_version, 400);
        assert!(doc.vs.is_none());
        assert_eq!(doc.fs.unwrap().textures[0].name, "u_texture");

        std::fs::remove_dir_all(&tmp_dir_path).unwrap();
    }

    #[test]
    fn one_reflection_file_per_program() {
        let tmp_dir_path = tmp_dir();
        let mut config = Config::new(ShaderLang::Glsl, tmp_dir_path.join("sprite.glsl"));
        config.reflect = true;
        config.reflect_path = Some(tmp_dir_path.join("sprite.json"));
        config.pretty = false;

        write_compiled_program(&config, &sprite_program()).unwrap();

        let json = std::fs::read_to_string(tmp_dir_path.join("sprite.json")).unwrap();
        assert!(!json.contains('\n'));
        let doc: ReflectionJson = serde_json::from_str(&json).unwrap();
        assert!(doc.vs.is_some() && doc.fs.is_some());

        std::fs::remove_dir_all(&tmp_dir_path).unwrap();
    }

    #[test]
    fn c_arrays_share_one_file() {
        let tmp_dir_path = tmp_dir();
        let output_path = tmp_dir_path.join("sprite.h");
        let mut config = Config::new(ShaderLang::Gles, output_path.clone());
        config.cvar = Some("sprite".to_string());
        config.reflect = true;

        let written = write_compiled_program(&config, &sprite_program()).unwrap();
        assert_eq!(written, vec![output_path.clone()]);

        let header = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(header.matches("#pragma once").count(), 1);
        for name in ["sprite_vs[", "sprite_vs_refl[", "sprite_fs[", "sprite_fs_refl["] {
            assert!(header.contains(name), "missing {name}");
        }

        std::fs::remove_dir_all(&tmp_dir_path).unwrap();
    }

    #[test]
    fn legacy_container() {
        let tmp_dir_path = tmp_dir();
        let output_path = tmp_dir_path.join("sprite.sgs");
        let mut config = Config::new(ShaderLang::Hlsl, output_path.clone());
        config.legacy_sgs = true;

        write_compiled_program(&config, &sprite_program()).unwrap();

        let bytes = std::fs::read(&output_path).unwrap();
        assert_eq!(&bytes[0..4], b"1SGS");
        // header num_stages
        assert_eq!(&bytes[16..20], &2i32.to_le_bytes());

        std::fs::remove_dir_all(&tmp_dir_path).unwrap();
    }

    #[test]
    fn compute_cannot_join_graphics() {
        let mut program = sprite_program();
        program.stages[1].stage = Stage::Compute;

        let config = Config::new(ShaderLang::Glsl, PathBuf::from("unused.glsl"));
        let err = write_compiled_program(&config, &program).unwrap_err();

        assert!(err.to_string().contains("compute"));
    }
}
