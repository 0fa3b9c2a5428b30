use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// SysY compiler front end
#[derive(Debug, Parser)]
#[command(name = "sysyc", version, about)]
pub struct Args {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show lexer output (tokens)
    Lex(InputArgs),
    /// Show parser output (AST)
    Parse(InputArgs),
    /// Show name resolution output (HIR)
    Resolve(ResolveCommand),
    /// Print shell completions to stdout
    Completions {
        /// the shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, clap::Args)]
pub struct InputArgs {
    /// the input file.
    pub input_file: String,
}

#[derive(Debug, clap::Args)]
pub struct ResolveCommand {
    #[command(flatten)]
    pub input: InputArgs,
    /// only allow calls to functions defined earlier in the file.
    #[arg(long)]
    pub no_forward_refs: bool,
    /// do not pre-register the runtime library (getint, putint, ...).
    #[arg(long)]
    pub no_runtime_lib: bool,
}
