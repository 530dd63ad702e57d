//! extract-fixups - apply library and blob fixups to extracted vendor blobs

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use extract_fixups::BlobEntry;
use extract_fixups::ExtractModule;
use extract_fixups::ExtractOptions;
use extract_fixups::Extractor;
use extract_fixups::FileOutcome;
use extract_fixups::LibFixupResult;
use extract_fixups::Partition;
use extract_fixups::PatchelfEditor;
use extract_fixups::enumerate_tree;
use extract_fixups::load_module;
use extract_fixups::parse_file_list;
use extract_fixups::sm8250_common;

#[derive(Debug, Parser)]
#[command(name = "extract-fixups")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply blob fixups to an output tree
    Run {
        /// Output tree the blobs are (or will be) extracted to
        #[arg(short, long)]
        output: PathBuf,

        /// Donor tree to copy blobs from; without it the output tree is fixed in place
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// proprietary-files list; defaults to every file in the output tree
        #[arg(short, long)]
        files: Option<PathBuf>,

        /// Module configuration file; defaults to the built-in sm8250-common module
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Android source root used to resolve namespace imports
        #[arg(long)]
        android_root: Option<PathBuf>,

        /// Fail on missing files, missing imports and unresolved dependencies
        #[arg(long)]
        strict: bool,

        /// Skip the post-fixup ELF check
        #[arg(long)]
        no_check_elf: bool,

        /// patchelf binary to use
        #[arg(long, default_value = "patchelf")]
        patchelf: PathBuf,
    },

    /// Resolve a library name for a partition
    ResolveLib {
        /// Library name without the .so extension
        name: String,

        /// Partition: system, system_ext, product, vendor or odm
        partition: String,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the module's fixup rules
    ListRules {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> Result<bool> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            output,
            source,
            files,
            config,
            android_root,
            strict,
            no_check_elf,
            patchelf,
        } => cmd_run(
            &output,
            source.as_deref(),
            files.as_deref(),
            config.as_deref(),
            android_root.as_deref(),
            strict,
            no_check_elf,
            patchelf,
        ),
        Commands::ResolveLib {
            name,
            partition,
            config,
        } => {
            cmd_resolve_lib(&name, &partition, config.as_deref())?;
            Ok(true)
        }
        Commands::ListRules { config } => {
            cmd_list_rules(config.as_deref())?;
            Ok(true)
        }
    }
}

fn load(config: Option<&Path>) -> Result<ExtractModule> {
    match config {
        Some(path) => load_module(path)
            .with_context(|| format!("Failed to load module config: {}", path.display())),
        None => Ok(sm8250_common()?),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    output: &Path,
    source: Option<&Path>,
    files: Option<&Path>,
    config: Option<&Path>,
    android_root: Option<&Path>,
    strict: bool,
    no_check_elf: bool,
    patchelf: PathBuf,
) -> Result<bool> {
    let mut module = load(config)?;

    if let Some(root) = android_root {
        let (merged, issues) = module.with_namespace_imports(root, strict)?;
        for issue in &issues {
            warn!("{}", issue);
        }
        module = merged;
    }

    let entries: Vec<BlobEntry> = match files {
        Some(path) => {
            let list = fs::read_to_string(path)
                .with_context(|| format!("Failed to read file list: {}", path.display()))?;
            parse_file_list(&list)
        }
        None if source.is_some() => bail!("--source requires --files"),
        None => enumerate_tree(output)?,
    };

    if !output.is_dir() && source.is_none() {
        bail!("Output directory does not exist: {}", output.display());
    }

    let editor = PatchelfEditor::new(patchelf);
    let options = ExtractOptions {
        strict,
        check_elf: no_check_elf.then_some(false),
    };
    let extractor = Extractor::new(&module, &editor, options);
    let report = extractor.run(source, output, &entries)?;

    for file in &report.files {
        match &file.outcome {
            FileOutcome::Fixed(applied) if !applied.changed.is_empty() => {
                println!("fixed    {} ({})", file.path, applied.changed.join(", "));
            }
            FileOutcome::Failed(message) => println!("failed   {}", message),
            FileOutcome::Missing => println!("missing  {}", file.path),
            _ => {}
        }
    }
    for issue in &report.check.issues {
        println!("issue    {}", issue);
    }

    let success = report.is_success(strict);
    info!(success, "finished");
    Ok(success)
}

fn cmd_resolve_lib(name: &str, partition: &str, config: Option<&Path>) -> Result<()> {
    let partition: Partition = partition.parse()?;
    let module = load(config)?;

    match module.lib_fixups().resolve(name, partition) {
        LibFixupResult::Rename(new) => println!("{}", new),
        LibFixupResult::Remove => println!("<removed>"),
        LibFixupResult::Unchanged => println!("<unchanged>"),
    }
    Ok(())
}

fn cmd_list_rules(config: Option<&Path>) -> Result<()> {
    let module = load(config)?;
    println!("{} ({})", module.device(), module.vendor());

    println!("\nnamespace imports:");
    for import in module.namespace_imports() {
        println!("  {}", import);
    }

    println!("\nlib fixups:");
    for rule in module.lib_fixups().rules() {
        println!("  {} [{}]", rule.name, rule.fixup);
        for lib in &rule.libs {
            println!("    {}", lib);
        }
    }

    println!("\nblob fixups:");
    for rule in module.blob_fixups().rules() {
        println!("  {} {}", rule.name, rule.fixup);
        for path in &rule.paths {
            println!("    {}", path);
        }
    }
    Ok(())
}
