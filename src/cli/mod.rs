use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ridx")]
#[command(about = "ridx: a disk-resident B+ tree index over record identifiers", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new index file
    Create(CreateArgs),
    /// Insert a key/RID entry
    Insert(EntryArgs),
    /// Delete an exact key/RID entry
    Delete(EntryArgs),
    /// List every RID stored under a key
    Search(SearchArgs),
    /// Walk the leaf level in key order
    Dump(FileArgs),
    /// Print the node tree
    Tree(FileArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KeyKind {
    Int,
    Float,
    Str,
}

#[derive(Args)]
pub struct CreateArgs {
    pub path: PathBuf,
    #[arg(long, value_enum, default_value = "int")]
    pub key_type: KeyKind,
    /// Key width in bytes; defaults to 4 (required width for int/float)
    #[arg(long, default_value_t = 4)]
    pub key_len: usize,
    /// Split threshold; defaults to as many entries as fit a page
    #[arg(long)]
    pub max_keys: Option<usize>,
}

#[derive(Args)]
pub struct EntryArgs {
    pub path: PathBuf,
    pub key: String,
    pub page: i32,
    pub slot: i32,
}

#[derive(Args)]
pub struct SearchArgs {
    pub path: PathBuf,
    pub key: String,
    /// Print only the first/last matching position instead of all RIDs
    #[arg(long)]
    pub first: bool,
    #[arg(long)]
    pub last: bool,
}

#[derive(Args)]
pub struct FileArgs {
    pub path: PathBuf,
}
