use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pb", about = concat!("postbook v", env!("CARGO_PKG_VERSION"), " - who got which postcard, and when"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Run against a book in a different directory
    #[arg(short = 'C', long = "book-dir", global = true)]
    pub book_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new book in the current directory
    Init(InitArgs),
    /// Add, rename, remove or list friends
    Friend(FriendCmd),
    /// Save, remove or list postcards
    Postcard(PostcardCmd),
    /// Show every postcard with the friends it went to and when
    Table,
    /// Write all records as CSV
    Export(ExportArgs),
    /// Load records from a CSV file into an empty book
    Import(ImportArgs),
    /// Erase every friend and record
    Clear,
    /// View or change book settings
    Config(ConfigCmd),
    /// View or manage the recovery journal
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Book name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Reinitialize book.toml even if postbook/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct FriendCmd {
    #[command(subcommand)]
    pub action: FriendAction,
}

#[derive(Subcommand)]
pub enum FriendAction {
    /// Register a new friend
    Add(FriendAddArgs),
    /// Rename a friend everywhere they appear
    Rename(FriendRenameArgs),
    /// Remove a friend and their postcard entries
    Rm(FriendRmArgs),
    /// List friends
    List(FilterArgs),
}

#[derive(Args)]
pub struct FriendAddArgs {
    /// Friend name
    pub name: String,
}

#[derive(Args)]
pub struct FriendRenameArgs {
    /// Current name, or #N for the N-th entry of `pb friend list`
    pub friend: String,
    /// New name
    pub new_name: String,
}

#[derive(Args)]
pub struct FriendRmArgs {
    /// Name, or #N for the N-th entry of `pb friend list`
    pub friend: String,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Only show entries containing this text (case-insensitive)
    #[arg(long, short)]
    pub filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Postcards
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct PostcardCmd {
    #[command(subcommand)]
    pub action: PostcardAction,
}

#[derive(Subcommand)]
pub enum PostcardAction {
    /// Record a postcard sent to friends, or replace one with --edit
    Save(PostcardSaveArgs),
    /// Remove every record of a postcard
    Rm(PostcardRmArgs),
    /// List postcard names
    List(FilterArgs),
}

#[derive(Args)]
pub struct PostcardSaveArgs {
    /// Postcard name
    pub name: String,
    /// Friend who received it (repeatable)
    #[arg(long = "to", value_name = "FRIEND")]
    pub to: Vec<String>,
    /// Replace the records of this existing postcard
    #[arg(long, value_name = "POSTCARD")]
    pub edit: Option<String>,
}

#[derive(Args)]
pub struct PostcardRmArgs {
    /// Postcard name
    pub name: String,
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file with postcard,friend[,date] rows
    pub file: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Set the chrono format used to stamp today's date
    DateFormat(ConfigValueArgs),
    /// Set the header row written on export
    CsvHeader(ConfigValueArgs),
}

#[derive(Args)]
pub struct ConfigValueArgs {
    pub value: String,
}

// ---------------------------------------------------------------------------
// Recovery journal
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the path to the recovery journal
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove every entry, not just old ones
    #[arg(long)]
    pub all: bool,
}
