use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::*;

use sgs_shader_tools::build_tasks::{self, Config};
use sgs_shader_tools::config;
use sgs_shader_tools::sgs;
use sgs_shader_tools::shaders::binary::ReflectionRecord;
use sgs_shader_tools::shaders::compiled::StageCode;
use sgs_shader_tools::splitter;
use sgs_shader_tools::util::file_stem;

#[derive(Parser, Debug)]
#[command(name = "sgs-shader-tools", version, about = "Shader reflection and sgs packaging")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a cross-compiled program as an sgs container or per-stage files
    Pack {
        /// compiled program dumped as json by the cross-compiler
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// gles, hlsl, msl (or metal), glsl
        #[arg(short, long)]
        lang: String,
        /// 0 picks the language default
        #[arg(short, long, default_value_t = 0)]
        profile: u32,
        #[arg(long)]
        flatten_ubos: bool,
        /// the stage code is bytecode
        #[arg(long)]
        bin: bool,
        #[arg(long)]
        debug_bin: bool,
        /// force sgs output regardless of the output extension
        #[arg(long)]
        sgs: bool,
        /// write the table-based SGS1 container
        #[arg(long)]
        legacy_sgs: bool,
        /// write reflection json, optionally into one file for the whole program
        #[arg(long, num_args = 0..=1)]
        reflect: Option<Option<PathBuf>>,
        /// write c arrays with this variable name prefix
        #[arg(long)]
        cvar: Option<String>,
        /// no indentation in reflection json
        #[arg(long)]
        compact: bool,
    },
    /// Split a combined //@begin_vert / //@begin_frag source into stage files
    Split {
        input: PathBuf,
        /// defaults to the input's directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the stages of an sgs container
    Inspect { input: PathBuf },
    /// Print the #defines that name vertex semantics
    Preamble,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Pack {
            input,
            output,
            lang,
            profile,
            flatten_ubos,
            bin,
            debug_bin,
            sgs: force_sgs,
            legacy_sgs,
            reflect,
            cvar,
            compact,
        } => {
            let lang = config::parse_shader_lang(&lang)?;

            let mut build = Config::new(lang, output);
            build.profile_version = config::default_profile_version(lang, profile);
            build.flatten_ubos = flatten_ubos;
            build.bytecode = bin;
            build.debug_info = debug_bin;
            build.sgs |= force_sgs || legacy_sgs;
            build.legacy_sgs = legacy_sgs;
            build.reflect = reflect.is_some();
            build.reflect_path = reflect.flatten();
            build.cvar = cvar;
            build.pretty = !compact;

            if build.sgs && build.cvar.is_some() {
                bail!("--cvar cannot be combined with sgs output");
            }

            let program = build_tasks::read_compiled_program(&input)?;
            for path in build_tasks::write_compiled_program(&build, &program)? {
                println!("{}", path.display());
            }
        }

        Command::Split { input, out_dir } => split(&input, out_dir)?,

        Command::Inspect { input } => inspect(&input)?,

        Command::Preamble => print!("{}", config::semantics_preamble()),
    }

    Ok(())
}

fn split(input: &Path, out_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let file_name = input.display().to_string();

    if !splitter::has_tagged_blocks(&source) {
        bail!("{file_name} has no //@begin_vert or //@begin_frag blocks");
    }
    let blocks = splitter::split(&file_name, &source)?;
    if blocks.is_empty() {
        bail!("{file_name} has no usable //@begin_vert or //@begin_frag blocks");
    }

    let out_dir = out_dir
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let stem = file_stem(input);

    for block in &blocks {
        let path = out_dir.join(format!("{stem}.{}", block.stage.extension()));
        std::fs::write(&path, block.text(&source))
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!("wrote {} stage to {}", block.stage, path.display());
        println!(
            "{}\t{}\tline bias {}",
            block.stage,
            path.display(),
            block.line_bias(&source)
        );
    }

    Ok(())
}

fn inspect(input: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let container =
        sgs::read_sgs(&bytes).with_context(|| format!("failed to parse {}", input.display()))?;

    let mut stages = vec![];
    for record in container.stages() {
        let (code_kind, code_size) = match &record.code {
            Some(StageCode::Source(text)) => ("source", text.len()),
            Some(StageCode::Bytecode(data)) => ("bytecode", data.len()),
            None => ("none", 0),
        };

        let reflection = match &record.reflection {
            Some(bytes) => Some(
                ReflectionRecord::from_bytes(bytes)
                    .with_context(|| format!("bad {} stage reflection", record.stage))?,
            ),
            None => None,
        };

        stages.push(serde_json::json!({
            "stage": record.stage,
            "code": code_kind,
            "code_size": code_size,
            "reflection": reflection,
        }));
    }

    let summary = serde_json::json!({
        "language": container.lang(),
        "profile_version": container.profile_version(),
        "stages": stages,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
