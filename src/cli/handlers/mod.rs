mod init;
pub use init::cmd_init;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

/// Global override for the starting directory (set by -C flag)
static BOOK_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::book_io;
use crate::io::config_io;
use crate::io::lock::BookLock;
use crate::io::prompt::{AssumeYes, Confirm, StdinConfirm};
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::store::DirStore;
use crate::model::friend::FriendRegistry;
use crate::ops::export::{self, DEFAULT_EXPORT_FILE};
use crate::ops::friend_ops::FriendError;
use crate::ops::search;
use crate::service::Postbook;
use crate::util::date;

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let yes = cli.yes;

    if let Some(ref dir) = cli.book_dir {
        let abs = fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        BOOK_DIR_OVERRIDE
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(abs);
    }

    match cli.command {
        Commands::Init(args) => cmd_init(args, &start_dir()?),

        Commands::Friend(cmd) => match cmd.action {
            FriendAction::Add(args) => cmd_friend_add(args, json),
            FriendAction::Rename(args) => cmd_friend_rename(args, json),
            FriendAction::Rm(args) => cmd_friend_rm(args, json, yes),
            FriendAction::List(args) => cmd_friend_list(args, json),
        },
        Commands::Postcard(cmd) => match cmd.action {
            PostcardAction::Save(args) => cmd_postcard_save(args, json),
            PostcardAction::Rm(args) => cmd_postcard_rm(args, yes),
            PostcardAction::List(args) => cmd_postcard_list(args, json),
        },
        Commands::Table => cmd_table(json),
        Commands::Export(args) => cmd_export(args),
        Commands::Import(args) => cmd_import(args, json),
        Commands::Clear => cmd_clear(yes),
        Commands::Config(cmd) => cmd_config(cmd, json),
        Commands::Recovery(cmd) => cmd_recovery(cmd, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_dir() -> Result<PathBuf, Box<dyn Error>> {
    let override_dir = BOOK_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    match override_dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

fn find_book_dir() -> Result<PathBuf, Box<dyn Error>> {
    Ok(book_io::discover_book(&start_dir()?)?)
}

fn open_book(book_dir: &Path) -> Result<Postbook<DirStore>, Box<dyn Error>> {
    let (config, _doc) = config_io::read_config(book_dir)?;
    Ok(Postbook::open(DirStore::new(book_dir), config)?)
}

/// Discover the book, take its lock, then load it, so the loaded state is
/// the state this command will overwrite.
fn open_book_locked(operation: &str) -> Result<(BookLock, PathBuf, Postbook<DirStore>), Box<dyn Error>> {
    let book_dir = find_book_dir()?;
    let lock = BookLock::acquire_default(&book_dir, operation)?;
    let book = open_book(&book_dir)?;
    Ok((lock, book_dir, book))
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

/// Resolve a friend argument, either a name or `#N` (1-based list position),
/// to the position and name the registry currently holds. A friend actually
/// named `#N` wins over the position.
fn resolve_friend_arg(friends: &FriendRegistry, arg: &str) -> Result<(usize, String), FriendError> {
    let name = arg.trim();
    if let Some(index) = friends.iter().position(|f| f.name == name) {
        return Ok((index, name.to_string()));
    }
    if let Some(digits) = name.strip_prefix('#')
        && let Ok(position) = digits.parse::<usize>()
    {
        return position
            .checked_sub(1)
            .and_then(|index| friends.iter().nth(index).map(|f| (index, f.name.clone())))
            .ok_or_else(|| FriendError::NotFound(name.to_string()));
    }
    Err(FriendError::NotFound(name.to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

fn cmd_friend_add(args: FriendAddArgs, json: bool) -> CmdResult {
    let (_lock, _dir, mut book) = open_book_locked("friend add")?;
    book.add_friend(&args.name)?;
    let name = args.name.trim();
    if json {
        let position = book.list_friends().len();
        return print_json(&FriendJson {
            position,
            name: name.to_string(),
        });
    }
    println!("added friend: {}", name);
    Ok(())
}

fn cmd_friend_rename(args: FriendRenameArgs, json: bool) -> CmdResult {
    let (_lock, _dir, mut book) = open_book_locked("friend rename")?;
    let (index, old_name) = resolve_friend_arg(&book.book().friends, &args.friend)?;
    let rename = book.rename_friend(index, &old_name, &args.new_name)?;
    if json {
        return print_json(&rename_to_json(&rename));
    }
    if rename.old_name == rename.new_name {
        println!("unchanged: {}", rename.new_name);
    } else {
        println!(
            "renamed {} -> {} ({} record entries updated)",
            rename.old_name, rename.new_name, rename.ledger_updates
        );
    }
    Ok(())
}

fn cmd_friend_rm(args: FriendRmArgs, json: bool, yes: bool) -> CmdResult {
    let (_lock, book_dir, mut book) = open_book_locked("friend rm")?;
    let (index, name) = resolve_friend_arg(&book.book().friends, &args.friend)?;

    let lost: Vec<String> = book
        .book()
        .ledger
        .deliveries()
        .filter(|(_, friend, _)| *friend == name)
        .map(|(p, f, d)| format!("{},{},{}", p, f, d))
        .collect();

    let mut confirm = confirmer(yes);
    let Some(removal) = book.remove_friend(index, &name, &mut *confirm)? else {
        println!("cancelled");
        return Ok(());
    };

    let mut body = format!("friend: {}\n", removal.name);
    for line in &lost {
        body.push_str(line);
        body.push('\n');
    }
    recovery::log_deletion(&book_dir, &format!("friend \"{}\"", removal.name), body);

    if json {
        return print_json(&removal_to_json(&removal));
    }
    println!(
        "removed friend: {} ({} postcard entries removed, {} records dropped)",
        removal.name,
        lost.len(),
        removal.records_dropped
    );
    Ok(())
}

fn cmd_friend_list(args: FilterArgs, json: bool) -> CmdResult {
    let book = open_book(&find_book_dir()?)?;
    let hits = search::filter_friends(&book.book().friends, args.filter.as_deref().unwrap_or(""));
    if json {
        return print_json(&friends_to_json(&hits));
    }
    if hits.is_empty() {
        if book.book().friends.is_empty() {
            println!("no friends yet (add one with `pb friend add <name>`)");
        } else {
            println!("no matching friends");
        }
        return Ok(());
    }
    for line in format_friend_list(&hits) {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Postcards
// ---------------------------------------------------------------------------

fn cmd_postcard_save(args: PostcardSaveArgs, json: bool) -> CmdResult {
    let (_lock, _dir, mut book) = open_book_locked("postcard save")?;

    if let Some(unknown) = args.to.iter().find(|f| !book.contains_friend(f)) {
        return Err(format!(
            "unknown friend \"{}\" (add them with `pb friend add`)",
            unknown
        )
        .into());
    }

    let save = book.save_postcard(&args.name, &args.to, args.edit.as_deref())?;
    if json {
        return print_json(&save_to_json(&save));
    }
    println!("{}", format_save(&save));
    Ok(())
}

fn cmd_postcard_rm(args: PostcardRmArgs, yes: bool) -> CmdResult {
    let (_lock, book_dir, mut book) = open_book_locked("postcard rm")?;
    let mut confirm = confirmer(yes);
    let Some(removed) = book.remove_postcard(&args.name, &mut *confirm)? else {
        println!("cancelled");
        return Ok(());
    };

    let mut body = String::new();
    for record in &removed {
        for friend in &record.friends {
            body.push_str(&format!("{},{},{}\n", record.postcard, friend, record.date));
        }
    }
    recovery::log_deletion(&book_dir, &format!("postcard \"{}\"", args.name), body);

    println!("removed postcard: {} ({} records)", args.name, removed.len());
    Ok(())
}

fn cmd_postcard_list(args: FilterArgs, json: bool) -> CmdResult {
    let book = open_book(&find_book_dir()?)?;
    let names = search::filter_postcards(&book.book().ledger, args.filter.as_deref().unwrap_or(""));
    if json {
        return print_json(&names);
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_table(json: bool) -> CmdResult {
    let book = open_book(&find_book_dir()?)?;
    let groups = book.grouped_view();
    if json {
        return print_json(&TableJson { postcards: groups });
    }
    if groups.is_empty() {
        println!("no postcards yet");
        return Ok(());
    }
    for line in format_table(&groups) {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn cmd_export(args: ExportArgs) -> CmdResult {
    let book = open_book(&find_book_dir()?)?;
    for (postcard, friend) in export::unsafe_fields(&book.book().ledger) {
        eprintln!(
            "warning: \"{}\" / \"{}\" contains a comma or line break and will not re-import cleanly",
            postcard, friend
        );
    }

    let csv = book.export_csv();
    match args.output {
        Some(path) => {
            let path = if Path::new(&path).is_dir() {
                Path::new(&path).join(DEFAULT_EXPORT_FILE)
            } else {
                PathBuf::from(path)
            };
            recovery::atomic_write(&path, csv.as_bytes())?;
            eprintln!(
                "exported {} rows to {}",
                book.book().ledger.deliveries().count(),
                path.display()
            );
        }
        None => print!("{}", csv),
    }
    Ok(())
}

fn cmd_import(args: ImportArgs, json: bool) -> CmdResult {
    let text = fs::read_to_string(&args.file)
        .map_err(|e| format!("cannot read {}: {}", args.file, e))?;
    let (_lock, _dir, mut book) = open_book_locked("import")?;
    let result = book.import_csv(&text)?;
    if json {
        return print_json(&import_to_json(&result));
    }
    println!(
        "imported {} records, {} friends",
        result.records_added,
        result.friends_added.len()
    );
    Ok(())
}

fn cmd_clear(yes: bool) -> CmdResult {
    let (_lock, book_dir, mut book) = open_book_locked("clear")?;
    if book.book().is_pristine() {
        println!("nothing to clear");
        return Ok(());
    }

    let snapshot = book.export_csv();
    let friends = book.list_friends().join(", ");
    let mut confirm = confirmer(yes);
    if !book.clear_all(&mut *confirm)? {
        println!("cancelled");
        return Ok(());
    }

    recovery::log_recovery(
        &book_dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Clear,
            description: "all data cleared".to_string(),
            fields: vec![("friends".to_string(), friends)],
            body: snapshot.trim_start_matches(export::BOM).to_string(),
        },
    );
    println!("cleared");
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(cmd: ConfigCmd, json: bool) -> CmdResult {
    let book_dir = find_book_dir()?;
    let Some(action) = cmd.action else {
        let (config, _doc) = config_io::read_config(&book_dir)?;
        if json {
            return print_json(&config);
        }
        println!("name:           {}", config.book.name);
        println!("date format:    {}", config.dates.format);
        println!("csv header:     {}", config.csv.header);
        println!("header markers: {}", config.csv.header_markers.join(", "));
        return Ok(());
    };

    let _lock = BookLock::acquire_default(&book_dir, "config")?;
    let (_config, mut doc) = config_io::read_config(&book_dir)?;
    match action {
        ConfigAction::DateFormat(args) => {
            if !date::is_valid_format(&args.value) {
                return Err(format!("invalid date format: {}", args.value).into());
            }
            config_io::set_date_format(&mut doc, &args.value);
            config_io::write_config(&book_dir, &doc)?;
            println!("date format: {} (today: {})", args.value, date::today_str(&args.value));
        }
        ConfigAction::CsvHeader(args) => {
            let header = args.value.trim();
            if header.is_empty() || header.contains('\n') {
                return Err("csv header must be a single non-empty line".into());
            }
            config_io::set_csv_header(&mut doc, header);
            config_io::write_config(&book_dir, &doc)?;
            println!("csv header: {}", header);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery journal
// ---------------------------------------------------------------------------

fn cmd_recovery(cmd: RecoveryCmd, json: bool) -> CmdResult {
    let book_dir = find_book_dir()?;
    match cmd.action {
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(&book_dir).display());
        }
        Some(RecoveryAction::Prune(args)) => {
            let _lock = BookLock::acquire_default(&book_dir, "recovery prune")?;
            let removed = recovery::prune_recovery(&book_dir, None, args.all)?;
            println!("pruned {} entries", removed);
        }
        None => {
            let entries = recovery::read_recovery_entries(&book_dir, Some(cmd.limit));
            if json {
                let values: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                return print_json(&values);
            }
            if entries.is_empty() {
                println!("no recovery entries");
                return Ok(());
            }
            for entry in &entries {
                print!("{}", entry.to_markdown());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_arg_by_name_or_position() {
        let friends = FriendRegistry::from_names(["Ann", "Bo"]);
        assert_eq!(resolve_friend_arg(&friends, "Bo").unwrap(), (1, "Bo".to_string()));
        assert_eq!(resolve_friend_arg(&friends, " Ann ").unwrap(), (0, "Ann".to_string()));
        assert_eq!(resolve_friend_arg(&friends, "#2").unwrap(), (1, "Bo".to_string()));
    }

    #[test]
    fn friend_arg_out_of_range() {
        let friends = FriendRegistry::from_names(["Ann"]);
        assert!(matches!(resolve_friend_arg(&friends, "#0"), Err(FriendError::NotFound(_))));
        assert!(matches!(resolve_friend_arg(&friends, "#5"), Err(FriendError::NotFound(_))));
        assert!(matches!(resolve_friend_arg(&friends, "Cy"), Err(FriendError::NotFound(_))));
    }

    #[test]
    fn friend_named_like_a_position_is_matched_by_name() {
        let friends = FriendRegistry::from_names(["Ann", "#1"]);
        assert_eq!(resolve_friend_arg(&friends, "#1").unwrap(), (1, "#1".to_string()));
        assert_eq!(resolve_friend_arg(&friends, "#2").unwrap(), (1, "#1".to_string()));
    }

    #[test]
    fn hash_without_digits_is_a_name() {
        let friends = FriendRegistry::from_names(["#team"]);
        assert_eq!(resolve_friend_arg(&friends, "#team").unwrap(), (0, "#team".to_string()));
    }
}
