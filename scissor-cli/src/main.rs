//! Scissor CLI - splits inline HTML scripts into one external JavaScript file

#![deny(warnings)]

// Global invariants enforced:
// - One input document, two output files, no other side effects
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{ArgAction, Parser};
use scissor_core::{split, SplitOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scissor")]
#[command(about = "Extract inline scripts from an HTML document into one external JavaScript file")]
struct Cli {
    /// Input HTML file
    source: PathBuf,

    /// Output HTML file
    #[arg(long)]
    html: PathBuf,

    /// Output JavaScript file; its file name becomes the script src attribute
    #[arg(long)]
    js: PathBuf,

    /// Place the script reference in <head> with defer (pass false to append
    /// it to <body> instead)
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    script_in_head: bool,

    /// Remove inline scripts without inserting an external script reference
    #[arg(long)]
    only_split: bool,

    /// Insert the external script reference even when no inline script was found
    #[arg(long)]
    always_write_script: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let source = std::fs::read_to_string(&cli.source)
        .with_context(|| format!("Failed to read input file: {}", cli.source.display()))?;

    let js_file_name = cli
        .js
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid JavaScript output path: {}", cli.js.display()))?
        .to_string();

    let options = SplitOptions {
        source,
        js_file_name,
        script_in_head: cli.script_in_head,
        only_split: cli.only_split,
        always_write_script: cli.always_write_script,
    };

    let output = split(&options)
        .with_context(|| format!("Failed to split document: {}", cli.source.display()))?;

    std::fs::write(&cli.html, &output.html)
        .with_context(|| format!("Failed to write HTML output: {}", cli.html.display()))?;
    std::fs::write(&cli.js, &output.js)
        .with_context(|| format!("Failed to write JavaScript output: {}", cli.js.display()))?;

    Ok(())
}
