use std::fs;
use std::io;
use std::ops::Range;
use std::process::ExitCode;

use anyhow::Context;
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{CommandFactory, Parser as _};
use log::{debug, LevelFilter};
use sysy_ast::Item;
use sysy_hir::{ResolveError, Resolver, ResolverConfig};
use sysy_lexer::{Lexer, Span, Token};
use sysy_parser::Parser;

use args::*;

mod args;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Lex(input) => {
            let source = read_source(&input.input_file)?;
            Ok(run_lexer(&source, &input.input_file))
        }
        Command::Parse(input) => {
            let source = read_source(&input.input_file)?;
            Ok(run_parser(&source, &input.input_file))
        }
        Command::Resolve(cmd) => {
            let config = ResolverConfig {
                forward_references: !cmd.no_forward_refs,
                runtime_library: !cmd.no_runtime_lib,
            };
            let source = read_source(&cmd.input.input_file)?;
            Ok(run_resolver(&source, &cmd.input.input_file, config))
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Args::command(), "sysyc", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `-v` and `-vv` override `RUST_LOG`; without them the environment decides
fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn read_source(file_path: &str) -> anyhow::Result<String> {
    let source = fs::read_to_string(file_path).with_context(|| format!("failed to read '{}'", file_path))?;
    debug!("read {} byte(s) from {}", source.len(), file_path);
    Ok(source)
}

/// Render one diagnostic against the source with ariadne
fn report(file_path: &str, source: &str, message: &str, span: Span) {
    let range: Range<usize> = span.into();
    let result = Report::build(ReportKind::Error, file_path, range.start)
        .with_message(message)
        .with_label(
            Label::new((file_path, range))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((file_path, Source::from(source)));

    if let Err(e) = result {
        eprintln!("{}: {} ({})", file_path, message, e);
    }
}

fn run_lexer(source: &str, file_path: &str) -> ExitCode {
    println!("=== Lexer Output for {} ===\n", file_path);

    let tokens = match Lexer::tokenize(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            report(file_path, source, &e.message, e.span);
            return ExitCode::FAILURE;
        }
    };

    println!("{:<10} {:<8} {:<12} {}", "SPAN", "LENGTH", "TOKEN TYPE", "VALUE");
    println!("{}", "-".repeat(50));

    for spanned in &tokens {
        let span_str = format!("{}..{}", spanned.span.start, spanned.span.end);
        let len = spanned.span.end - spanned.span.start;
        println!(
            "{:<10} {:<8} {:<12} {}",
            span_str,
            len,
            token_type_name(&spanned.token),
            spanned.token
        );
    }

    println!("\n=== Summary ===");
    println!("Total tokens: {}", tokens.len());

    let keywords = tokens.iter().filter(|t| t.token.is_keyword()).count();
    let idents = tokens.iter().filter(|t| matches!(t.token, Token::Ident(_))).count();
    let literals = tokens.iter().filter(|t| matches!(t.token, Token::IntLiteral(_))).count();
    let operators = tokens.iter().filter(|t| t.token.is_operator()).count();
    let delimiters = tokens.iter().filter(|t| t.token.is_delimiter()).count();

    println!("  Keywords:    {}", keywords);
    println!("  Identifiers: {}", idents);
    println!("  Literals:    {}", literals);
    println!("  Operators:   {}", operators);
    println!("  Delimiters:  {}", delimiters);

    ExitCode::SUCCESS
}

fn token_type_name(token: &Token) -> &'static str {
    match token {
        t if t.is_keyword() => "KEYWORD",
        Token::IntLiteral(_) => "INT",
        Token::Ident(_) => "IDENT",
        t if t.is_operator() => "OPERATOR",
        t if t.is_delimiter() => "DELIMITER",
        Token::Eof => "EOF",
        _ => "OTHER",
    }
}

fn run_parser(source: &str, file_path: &str) -> ExitCode {
    println!("=== Parser Output for {} ===\n", file_path);

    let unit = match Parser::parse(source) {
        Ok(unit) => unit,
        Err(e) => {
            report(file_path, source, &e.message, e.span);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", unit.pretty_print());

    println!("=== Summary ===");
    let fn_count = unit.items.iter().filter(|i| matches!(i, Item::Function(_))).count();
    let decl_count = unit.items.iter().filter(|i| matches!(i, Item::Decl(_))).count();
    println!("Functions:    {}", fn_count);
    println!("Declarations: {}", decl_count);

    ExitCode::SUCCESS
}

fn run_resolver(source: &str, file_path: &str, config: ResolverConfig) -> ExitCode {
    let unit = match Parser::parse(source) {
        Ok(unit) => unit,
        Err(e) => {
            report(file_path, source, &e.message, e.span);
            return ExitCode::FAILURE;
        }
    };

    debug!("resolving {} with {:?}", file_path, config);
    let resolution = Resolver::with_config(config).run(unit);
    if !resolution.is_ok() {
        report_resolve_errors(file_path, source, &resolution.errors);
        return ExitCode::FAILURE;
    }

    println!("=== Resolver Output for {} ===\n", file_path);
    println!("{}", resolution.program.pretty_print());

    println!("=== Summary ===");
    println!("Signatures: {}", resolution.program.signatures.len());
    println!("Globals:    {}", resolution.program.globals.len());
    println!("Functions:  {}", resolution.program.functions.len());

    ExitCode::SUCCESS
}

fn report_resolve_errors(file_path: &str, source: &str, errors: &[ResolveError]) {
    for e in errors {
        report(file_path, source, &e.kind.to_string(), e.span);
    }
    eprintln!("\n{} error(s) found", errors.len());
}
