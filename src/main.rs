//! Kanade CLI - command-line tool for im@s console game file modding.
//!
//! This is the main entry point for the Kanade command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

use kanade::prelude::*;

/// Kanade - im@s game file conversion and translation tool
#[derive(Parser)]
#[command(name = "kanade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a BXR script to editable XML
    BxrToXml {
        /// Input BXR file
        input: PathBuf,

        /// Output XML file (defaults to the input with an .xml extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Convert an edited XML file back to BXR
    XmlToBxr {
        /// Input XML file
        input: PathBuf,

        /// Output BXR file (defaults to the input with a .bxr extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Convert every BXR file under a directory to XML
    BxrBatch {
        /// Root directory to scan for .bxr files
        input: PathBuf,

        /// Output directory (defaults to converting in place)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Re-encode each converted file and compare against the original
        #[arg(long)]
        verify: bool,
    },

    /// List the contents of a BNA archive
    BnaList {
        /// Path to the BNA file
        archive: PathBuf,

        /// Show sizes
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract all files from a BNA archive
    BnaExtract {
        /// Path to the BNA file
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replace one file inside a BNA archive
    BnaReplace {
        /// Path to the BNA file
        archive: PathBuf,

        /// Entry path inside the archive (dir/name)
        entry: String,

        /// File whose contents replace the entry
        file: PathBuf,

        /// Output archive (defaults to rewriting in place)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::BxrToXml {
            input,
            output,
            force,
        } => cmd_bxr_to_xml(&input, output, force),
        Commands::XmlToBxr {
            input,
            output,
            force,
        } => cmd_xml_to_bxr(&input, output, force),
        Commands::BxrBatch {
            input,
            output,
            verify,
        } => cmd_bxr_batch(&input, output.as_deref(), verify),
        Commands::BnaList { archive, detailed } => cmd_bna_list(&archive, detailed),
        Commands::BnaExtract { archive, output } => cmd_bna_extract(&archive, &output),
        Commands::BnaReplace {
            archive,
            entry,
            file,
            output,
            force,
        } => cmd_bna_replace(&archive, &entry, &file, output, force),
    }
}

/// Refuse to clobber existing output unless `--force` was given.
fn check_overwrite(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

fn cmd_bxr_to_xml(input: &Path, output: Option<PathBuf>, force: bool) -> Result<()> {
    let output = output.unwrap_or_else(|| input.with_extension("xml"));
    check_overwrite(&output, force)?;

    let data = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let document =
        Bxr::parse(&data).with_context(|| format!("failed to decode {}", input.display()))?;

    fs::write(&output, document.to_xml_string()?)?;
    println!("Saved to {}", output.display());
    Ok(())
}

fn cmd_xml_to_bxr(input: &Path, output: Option<PathBuf>, force: bool) -> Result<()> {
    let output = output.unwrap_or_else(|| input.with_extension("bxr"));
    check_overwrite(&output, force)?;

    let xml =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let document =
        Bxr::from_xml(&xml).with_context(|| format!("failed to parse {}", input.display()))?;

    fs::write(&output, document.to_bytes()?)?;
    println!("Saved to {}", output.display());
    Ok(())
}

fn cmd_bxr_batch(input: &Path, output: Option<&Path>, verify: bool) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("bxr"))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    if files.is_empty() {
        println!("No .bxr files found under {}", input.display());
        return Ok(());
    }

    println!("Converting {} files...", files.len());
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();

    // Each file is an independent codec invocation; the codec itself is
    // single-threaded and holds no shared state.
    let failures: Vec<String> = files
        .par_iter()
        .filter_map(|path| {
            let result = convert_one(path, input, output, verify);
            pb.inc(1);
            result.err().map(|e| format!("{}: {:#}", path.display(), e))
        })
        .collect();

    pb.finish_with_message("Done");
    println!(
        "Converted {} of {} files in {:?}",
        files.len() - failures.len(),
        files.len(),
        start.elapsed()
    );
    for failure in &failures {
        eprintln!("FAILED {}", failure);
    }
    if !failures.is_empty() {
        bail!("{} files failed to convert", failures.len());
    }
    Ok(())
}

fn convert_one(path: &Path, root: &Path, output: Option<&Path>, verify: bool) -> Result<()> {
    let data = fs::read(path)?;
    let document = Bxr::parse(&data)?;
    let xml = document.to_xml_string()?;

    if verify {
        let reencoded = Bxr::from_xml(&xml)?.to_bytes()?;
        if reencoded != data {
            bail!("re-encoded output differs from the original");
        }
    }

    let xml_path = match output {
        Some(out) => {
            let rel = path.strip_prefix(root).unwrap_or(path);
            let target = out.join(rel).with_extension("xml");
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            target
        }
        None => path.with_extension("xml"),
    };

    fs::write(xml_path, xml)?;
    Ok(())
}

fn cmd_bna_list(archive_path: &Path, detailed: bool) -> Result<()> {
    let data = fs::read(archive_path)
        .with_context(|| format!("failed to read {}", archive_path.display()))?;
    let archive = BnaArchive::parse(&data).context("failed to parse BNA archive")?;

    for entry in archive.entries() {
        if detailed {
            println!("{:>12} {}", entry.size(), entry.full_path());
        } else {
            println!("{}", entry.full_path());
        }
    }
    println!("Total: {} entries", archive.len());
    Ok(())
}

fn cmd_bna_extract(archive_path: &Path, output: &Path) -> Result<()> {
    let data = fs::read(archive_path)
        .with_context(|| format!("failed to read {}", archive_path.display()))?;
    let archive = BnaArchive::parse(&data).context("failed to parse BNA archive")?;

    let pb = ProgressBar::new(archive.len() as u64);
    for entry in archive.entries() {
        let target = entry_target(output, entry.dir(), entry.name())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, entry.data())?;
        pb.inc(1);
    }
    pb.finish_with_message("Done");
    println!("Extracted {} entries to {}", archive.len(), output.display());
    Ok(())
}

/// Resolve where an entry is extracted to. Names come straight from the
/// archive, so anything that would step outside the output directory is
/// rejected rather than resolved.
fn entry_target(output: &Path, dir: &str, name: &str) -> Result<PathBuf> {
    let mut target = output.to_path_buf();
    for part in dir.split('/').chain(std::iter::once(name)) {
        if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
            bail!("refusing to extract entry with unsafe path: {}/{}", dir, name);
        }
        target.push(part);
    }
    Ok(target)
}

fn cmd_bna_replace(
    archive_path: &Path,
    entry: &str,
    file: &Path,
    output: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| archive_path.to_path_buf());
    if output != archive_path {
        check_overwrite(&output, force)?;
    }

    let data = fs::read(archive_path)
        .with_context(|| format!("failed to read {}", archive_path.display()))?;
    let mut archive = BnaArchive::parse(&data).context("failed to parse BNA archive")?;

    let replacement =
        fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    archive
        .replace(entry, replacement)
        .with_context(|| format!("no entry {} in archive", entry))?;

    fs::write(&output, archive.to_bytes())?;
    println!("Saved to {}", output.display());
    Ok(())
}
