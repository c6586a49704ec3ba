mod config;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use texkit_core::DocumentAssembler;
use texkit_doi::{
    DoiCache, DoiValidator, HttpResolver, ValidatorOptions, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};

use crate::config::{AssembleConfig, Config, DiffConfig, DoiConfig};
use crate::output::{
    print_assembly_summary, print_diff_preview, print_doi_result, print_doi_summary, Verbosity,
};

const DEFAULT_OUTPUT: &str = "onefile.tex";
const DEFAULT_DIFF_OUTPUT: &str = "diff_output.tex";

#[derive(Parser, Debug)]
#[command(
    name = "texkit",
    about = "Assemble, validate and compare LaTeX documents",
    long_about = "Assemble multi-file LaTeX documents into one file with an inlined APA\n\
                  bibliography, check the DOIs in a BibTeX database, and produce inline\n\
                  LaTeX diffs between two versions of a document.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inline includes and the bibliography into a single file
    #[command(long_about = "Inline every \\input and \\include of a LaTeX document and replace the\n\
                      bibliography command with an APA-formatted thebibliography block holding\n\
                      only the cited entries. Labels, references and captions are checked\n\
                      along the way.")]
    Assemble {
        /// Main LaTeX file
        #[arg(default_value = "main.tex")]
        input: PathBuf,

        /// Output file [default: onefile.tex, onefile.bib with --bib-only]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write only the BibTeX records of cited entries
        #[arg(long)]
        bib_only: bool,

        /// Print the processing report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the DOIs in a BibTeX file are registered
    Doi {
        /// BibTeX file to validate
        #[arg(default_value = "references.bib")]
        bib: PathBuf,

        /// Timeout for DOI resolution in seconds [default: 5]
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Custom user-agent string [default: Chrome browser user-agent]
        #[arg(short = 'u', long)]
        user_agent: Option<String>,

        /// Check at most N uncached DOIs (cached results are always shown)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Clear the DOI validation cache and exit
        #[arg(long)]
        clear_cache: bool,

        /// Cache file [default: ~/.bib_validator]
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Print the validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write an inline LaTeX diff of two document versions
    Diff {
        /// Old version
        old: PathBuf,

        /// New version
        new: PathBuf,

        /// Output file [default: diff_output.tex]
        output: Option<PathBuf>,

        /// Also print changed lines to the terminal
        #[arg(long)]
        preview: bool,
    },
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .target(env_logger::Target::Stderr)
    .init();
}

fn main() {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);

    let (user_config, project_config) = Config::discover_configs();
    let config = Config::merge(user_config, project_config);
    log::debug!("Effective configuration: {config:?}");

    let result = match args.command {
        Commands::Assemble {
            input,
            output,
            bib_only,
            json,
        } => run_assemble(
            &input,
            output,
            bib_only,
            json,
            config.assemble.unwrap_or_default(),
            verbosity,
        ),
        Commands::Doi {
            bib,
            timeout,
            user_agent,
            limit,
            clear_cache,
            cache,
            json,
        } => {
            let doi_config = config.doi.unwrap_or_default();
            let cache_path = cache.or_else(|| doi_config.cache_path.clone());
            if clear_cache {
                run_clear_cache(cache_path, verbosity)
            } else {
                let settings = DoiConfig {
                    timeout_secs: timeout.or(doi_config.timeout_secs),
                    user_agent: user_agent.or(doi_config.user_agent),
                    limit: limit.or(doi_config.limit),
                    cache_path,
                    delay_ms: doi_config.delay_ms,
                };
                run_doi(&bib, settings, json, verbosity)
            }
        }
        Commands::Diff {
            old,
            new,
            output,
            preview,
        } => run_diff(
            &old,
            &new,
            output,
            preview,
            config.diff.unwrap_or_default(),
            verbosity,
        ),
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn run_assemble(
    input: &Path,
    output: Option<PathBuf>,
    bib_only: bool,
    json: bool,
    config: AssembleConfig,
    verbosity: Verbosity,
) -> Result<()> {
    if !input.exists() {
        bail!("Input file '{}' not found", input.display());
    }

    let bib_only = bib_only || config.bibliography_only.unwrap_or(false);
    let json = json || config.json.unwrap_or(false);
    let output = output.or(config.output).unwrap_or_else(|| {
        let default = PathBuf::from(DEFAULT_OUTPUT);
        if bib_only {
            default.with_extension("bib")
        } else {
            default
        }
    });

    if verbosity.show_output() && !json {
        println!("Processing {} -> {}", input.display(), output.display());
    }

    let assembler = DocumentAssembler::new(input);
    let report = if bib_only {
        let assembly = assembler
            .bibliography_only()
            .with_context(|| format!("Failed to process {}", input.display()))?;
        fs::write(&output, &assembly.content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        assembly.report
    } else {
        assembler
            .process_to(&output)
            .with_context(|| format!("Failed to process {}", input.display()))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if verbosity.show_output() {
        println!(
            "{} Successfully created {}",
            "✓".green().bold(),
            output.display()
        );
        print_assembly_summary(&report, verbosity);
    }
    Ok(())
}

fn resolve_cache_path(cache_path: Option<PathBuf>) -> Result<PathBuf> {
    match cache_path {
        Some(path) => Ok(path),
        None => DoiCache::default_path().context("Could not determine home directory for cache"),
    }
}

fn run_clear_cache(cache_path: Option<PathBuf>, verbosity: Verbosity) -> Result<()> {
    let path = resolve_cache_path(cache_path)?;
    DoiCache::open(&path)
        .clear()
        .with_context(|| format!("Failed to clear cache {}", path.display()))?;
    if verbosity.show_output() {
        println!("Cache cleared: {}", path.display());
    }
    Ok(())
}

fn run_doi(bib: &Path, settings: DoiConfig, json: bool, verbosity: Verbosity) -> Result<()> {
    if !bib.exists() {
        bail!("BibTeX file not found: {}", bib.display());
    }

    let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let user_agent = settings.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let resolver =
        HttpResolver::new(timeout, user_agent).context("Failed to build HTTP client")?;
    let cache = DoiCache::open(resolve_cache_path(settings.cache_path)?);

    let mut options = ValidatorOptions {
        limit: settings.limit,
        ..ValidatorOptions::default()
    };
    if let Some(delay_ms) = settings.delay_ms {
        options.delay = Duration::from_millis(delay_ms);
    }

    let show_progress = verbosity.show_output() && !json;
    if show_progress {
        println!("Loading BibTeX file: {}", bib.display());
        println!("Validating DOIs...");
    }

    let mut validator = DoiValidator::new(resolver, cache, options);
    let report = validator.validate_file(bib, |position, total, check| {
        if show_progress {
            print_doi_result(position, total, check, verbosity);
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if verbosity.show_output() {
        print_doi_summary(&report);
    }
    Ok(())
}

fn run_diff(
    old: &Path,
    new: &Path,
    output: Option<PathBuf>,
    preview: bool,
    config: DiffConfig,
    verbosity: Verbosity,
) -> Result<()> {
    for path in [old, new] {
        if !path.exists() {
            bail!("Input file '{}' not found", path.display());
        }
    }
    let output = output
        .or(config.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIFF_OUTPUT));

    let document = texkit_diff::diff_files(old, new, &output)?;

    if preview {
        let old_text = texkit_core::encoding::read_text(old)?;
        let new_text = texkit_core::encoding::read_text(new)?;
        print_diff_preview(&old_text, &new_text);
    }

    if verbosity.show_output() {
        println!(
            "{} Inline diff document created: {}",
            "✓".green().bold(),
            output.display()
        );
        println!("Total lines processed: {}", document.lines_processed);
        println!("\nMacros defined:");
        println!("  \\odiff{{text}} - Red strikethrough for removed text");
        println!("  \\ndiff{{text}} - Green for added text");
        println!("\nTo compile:");
        println!("  pdflatex {}", output.display());
    }
    Ok(())
}
