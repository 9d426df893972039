use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::book_io::BOOK_DIR;
use crate::io::config_io::CONFIG_FILE;

const BOOK_TOML_TEMPLATE: &str = r##"[book]
name = "{name}"

# How today's date is written on new records (chrono strftime syntax).
# Examples: "%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"
[dates]
format = "%Y-%m-%d"

[csv]
# First row written by `pb export`
header = "postcard,friend,date"
# On import, a first line containing any of these is skipped as a header
header_markers = ["postcard", "明信片"]
"##;

/// Infer a book name from a directory name: replace hyphens and underscores
/// with spaces, title-case each word.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_toml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn cmd_init(args: InitArgs, cwd: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let book_dir = cwd.join(BOOK_DIR);
    let config_path = book_dir.join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to rewrite {})",
            book_dir.display(),
            CONFIG_FILE
        )
        .into());
    }

    let name = match args.name {
        Some(n) => n,
        None => cwd
            .file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Postcards".to_string()),
    };

    fs::create_dir_all(&book_dir)?;
    let config = BOOK_TOML_TEMPLATE.replace("{name}", &escape_toml_string(&name));
    fs::write(&config_path, config)?;

    log::info!("initialized book {:?} at {}", name, book_dir.display());
    println!("initialized book \"{}\" in {}/", name, BOOK_DIR);
    Ok(())
}
