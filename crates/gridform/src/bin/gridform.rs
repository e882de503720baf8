//! gridform CLI - inspect how a formula tokenizes and parses

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridform::{Locale, ParseOptions};
use gridform_parse::{
    cursor_context, display_units, parse_with_options, tokenize, tokenize_strict,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridform")]
#[command(author, version, about = "Tokenize and parse spreadsheet formulas")]
struct Cli {
    /// Formula locale (en-US or de-DE)
    #[arg(short, long, global = true, default_value_t = Locale::EnUs)]
    locale: Locale,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tokens of a formula
    Tokenize {
        formula: String,

        /// Fail on unterminated strings, sheet names and brackets
        #[arg(long)]
        strict: bool,
    },

    /// Parse a formula and print its tree
    Parse {
        formula: String,

        /// Fail on unterminated strings, sheet names and brackets
        #[arg(long)]
        strict: bool,

        /// Maximum nesting of parentheses and function calls
        #[arg(long, default_value_t = gridform_parse::DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Maximum height of the parsed tree
        #[arg(long, default_value_t = gridform_parse::DEFAULT_MAX_HEIGHT)]
        max_height: usize,
    },

    /// List display units, optionally describing a cursor position
    Units {
        formula: String,

        /// Byte offset of the cursor
        #[arg(short, long)]
        cursor: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(locale = %cli.locale, json = cli.json, "gridform starting");
    match cli.command {
        Commands::Tokenize { formula, strict } => {
            show_tokens(&formula, cli.locale, strict, cli.json)
        }
        Commands::Parse {
            formula,
            strict,
            max_depth,
            max_height,
        } => {
            let options = ParseOptions::default()
                .with_locale(cli.locale)
                .with_max_depth(max_depth)
                .with_max_height(max_height)
                .strict_lexing(strict);
            show_tree(&formula, &options, cli.json)
        }
        Commands::Units { formula, cursor } => show_units(&formula, cli.locale, cursor, cli.json),
    }
}

fn show_tokens(formula: &str, locale: Locale, strict: bool, json: bool) -> Result<()> {
    let table = locale.table();
    let tokens = if strict {
        tokenize_strict(formula, table).with_context(|| format!("Failed to tokenize '{formula}'"))?
    } else {
        tokenize(formula, table)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }
    for token in &tokens {
        println!(
            "{:>4}..{:<4} {:<10} {:<10} {}",
            token.start,
            token.end,
            token.token_type.to_string(),
            token.subtype.to_string(),
            token.value
        );
    }
    Ok(())
}

fn show_tree(formula: &str, options: &ParseOptions, json: bool) -> Result<()> {
    let tree = parse_with_options(formula, options)
        .with_context(|| format!("Failed to parse '{formula}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        println!("={tree}");
        println!("{tree:#?}");
    }
    Ok(())
}

fn show_units(formula: &str, locale: Locale, cursor: Option<usize>, json: bool) -> Result<()> {
    let table = locale.table();
    let units = display_units(formula, table);
    let context = cursor.map(|offset| cursor_context(formula, table, offset));

    if json {
        let value = serde_json::json!({ "units": units, "cursor": context });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    for (i, unit) in units.iter().enumerate() {
        let marker = match &context {
            Some(ctx) if ctx.unit_index == Some(i) => ">",
            _ => " ",
        };
        let kind = format!("{:?}", unit.kind);
        println!("{marker}{i:>3} {:>4}..{:<4} {kind:<12} {}", unit.start, unit.end, unit.text);
    }
    if let Some(ctx) = context {
        match ctx.function {
            Some(name) => println!("inside {name}, argument {}", ctx.argument_index + 1),
            None => println!("not inside a function call"),
        }
    }
    Ok(())
}
