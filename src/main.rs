use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use discordwiki::{
    AuthorDirectory, Converter, Message, MetadataMode, Options,
    context::ENTRY_SEPARATOR,
    io::{load_authors, load_messages, load_store_authors},
    links::DEFAULT_WIKI_BASE,
    model::parse_messages,
};
use rayon::prelude::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Convert chat message exports into wiki archive entries")]
struct Cli {
    /// Author directory JSON (`memberId`, `wikiAccount`, `displayName`)
    #[arg(long = "authors", value_name = "FILE", conflicts_with = "store")]
    authors: Option<PathBuf>,
    /// Load verified members from a store directory instead
    #[arg(long = "store", value_name = "DIR")]
    store: Option<PathBuf>,
    /// Treat input as raw message text and print the converted body
    #[arg(long = "text")]
    text: bool,
    /// Wrap `--text` output as a forwarded message
    #[arg(long = "forwarded", requires = "text")]
    forwarded: bool,
    #[command(flatten)]
    opts: FormatOpts,
    /// Message JSON files; reads stdin when none are given
    files: Vec<PathBuf>,
}

#[derive(clap::Args, Clone)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "CLI exposes independent formatting flags"
)]
struct FormatOpts {
    /// Resolve each message on its own, without date separators
    #[arg(long = "single")]
    single: bool,
    /// Print full RFC 1123 timestamps instead of `HH:MM`
    #[arg(long = "full-date")]
    full_date: bool,
    /// Append embed and attachment details to each entry
    #[arg(long = "metadata")]
    metadata: bool,
    /// Do not wrap multi-line bodies in `<poem>`
    #[arg(long = "no-poem")]
    no_poem: bool,
    /// Input lists the newest message first
    #[arg(long = "newest-first")]
    newest_first: bool,
    /// Article path of the target wiki
    #[arg(long = "wiki-base", value_name = "URL", default_value = DEFAULT_WIKI_BASE)]
    wiki_base: String,
}

impl FormatOpts {
    fn options(&self) -> Options {
        Options {
            wiki_base: self.wiki_base.clone(),
            simple_date: !self.full_date,
            metadata: if self.metadata {
                MetadataMode::Append
            } else {
                MetadataMode::Suppress
            },
            poem: !self.no_poem,
        }
    }
}

fn load_directory(cli: &Cli) -> anyhow::Result<AuthorDirectory> {
    if let Some(path) = &cli.authors {
        return load_authors(path)
            .with_context(|| format!("failed to load authors from {}", path.display()));
    }
    if let Some(dir) = &cli.store {
        return load_store_authors(dir)
            .with_context(|| format!("failed to load store {}", dir.display()));
    }
    Ok(AuthorDirectory::default())
}

fn render_batch(
    converter: &Converter,
    mut messages: Vec<Message>,
    authors: &AuthorDirectory,
    opts: &FormatOpts,
) -> String {
    if opts.newest_first {
        messages.reverse();
    }
    // Missing references are logged where they are resolved.
    if opts.single {
        messages
            .iter()
            .map(|m| converter.resolve_context(m, authors).wikitext)
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR)
    } else {
        converter.resolve_context_batch(&messages, authors).wikitext
    }
}

fn render_file(
    path: &Path,
    converter: &Converter,
    authors: &AuthorDirectory,
    cli: &Cli,
) -> anyhow::Result<String> {
    if cli.text {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(converter.convert(text.trim_end_matches('\n'), authors, cli.forwarded));
    }
    let messages =
        load_messages(path).with_context(|| format!("failed to load {}", path.display()))?;
    Ok(render_batch(converter, messages, authors, &cli.opts))
}

/// Entry point for the command-line converter.
///
/// Reads message exports from the given files, in parallel, or from stdin,
/// and prints wiki archive entries. Each file becomes one batch; batches are
/// separated by a blank line.
///
/// # Examples
///
/// ```sh
/// # Convert an export using the verified member list
/// discordwiki --authors authors.json messages.json
///
/// # Convert a single message body
/// echo '**hi**' | discordwiki --text
/// ```
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let authors = load_directory(&cli)?;
    debug!(authors = authors.len(), "author directory loaded");
    let converter = Converter::new(cli.opts.options());

    if cli.files.is_empty() {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        let out = if cli.text {
            converter.convert(input.trim_end_matches('\n'), &authors, cli.forwarded)
        } else {
            let messages = parse_messages(&input).context("failed to parse stdin")?;
            render_batch(&converter, messages, &authors, &cli.opts)
        };
        println!("{out}");
        return Ok(());
    }

    let outputs: Vec<String> = cli
        .files
        .par_iter()
        .map(|path| render_file(path, &converter, &authors, &cli))
        .collect::<anyhow::Result<_>>()?;
    println!("{}", outputs.join("\n\n"));
    Ok(())
}
