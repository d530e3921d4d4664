use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use exif_mem::config::Config;
use exif_mem::{Dispatcher, MetadataRecord};

/// Extensions of the containers the library can open.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

#[derive(Parser, Debug)]
#[command(
    name = "exif-mem-cli",
    version,
    about = "Show and edit Exif, IPTC and XMP metadata of JPEG, PNG and TIFF images"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Print only this key (e.g. Exif.Image.Model, Xmp.dc.title)
    #[arg(short, long, value_name = "KEY")]
    key: Option<String>,

    /// With --key, print the value as decimal bytes
    #[arg(long, requires = "key")]
    bytes: bool,

    /// Set KEY=VALUE from text (repeatable)
    #[arg(long, value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Set KEY=HEX to raw bytes (repeatable)
    #[arg(long = "set-bytes", value_name = "KEY=HEX")]
    set_bytes: Vec<String>,

    /// Write the modified image here instead of in place (single input only)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Keep a .bak copy of every file modified in place
    #[arg(long)]
    backup: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// One metadata change requested on the command line.
#[derive(Debug, Clone, PartialEq)]
enum Assignment {
    Text { key: String, value: String },
    Bytes { key: String, value: Vec<u8> },
}

impl Assignment {
    fn key(&self) -> &str {
        match self {
            Self::Text { key, .. } | Self::Bytes { key, .. } => key,
        }
    }

    fn apply(&self, dispatcher: &Dispatcher, buf: &[u8]) -> exif_mem::Result<Vec<u8>> {
        match self {
            Self::Text { key, value } => dispatcher.try_write_string(buf, key, value),
            Self::Bytes { key, value } => dispatcher.try_write_bytes(buf, key, value),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.backup {
        config.output.backup_originals = true;
    }

    let assignments = parse_assignments(&cli.set, &cli.set_bytes)?;

    let images = collect_images(&cli.paths);
    if images.is_empty() {
        bail!("No supported image files found in the specified paths.");
    }
    if cli.output.is_some() && images.len() != 1 {
        bail!("--output needs exactly one input image, found {}", images.len());
    }
    log::debug!("Found {} image(s)", images.len());

    let dispatcher = Dispatcher::new(config);

    if !assignments.is_empty() {
        let mut failed = 0;
        for path in &images {
            let target = cli.output.as_deref().unwrap_or(path);
            match update_image(&dispatcher, path, target, &assignments) {
                Ok(()) => log::info!("Updated: {}", target.display()),
                Err(e) => {
                    log::error!("Failed to update {}: {e:#}", path.display());
                    failed += 1;
                }
            }
        }
        log::info!(
            "Done: {} succeeded, {failed} failed out of {} images",
            images.len() - failed,
            images.len()
        );
        return Ok(());
    }

    match &cli.key {
        Some(key) => show_key(&dispatcher, &images, key, cli.bytes, cli.json),
        None => show_records(&dispatcher, &images, cli.json),
    }
}

/// Parse `--set` and `--set-bytes` arguments, in that order.
fn parse_assignments(set: &[String], set_bytes: &[String]) -> Result<Vec<Assignment>> {
    let mut assignments = Vec::with_capacity(set.len() + set_bytes.len());
    for arg in set {
        let (key, value) = split_assignment(arg)?;
        assignments.push(Assignment::Text {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    for arg in set_bytes {
        let (key, hex) = split_assignment(arg)?;
        let value = decode_hex(hex).with_context(|| format!("Invalid hex value for {key}"))?;
        assignments.push(Assignment::Bytes {
            key: key.to_string(),
            value,
        });
    }
    Ok(assignments)
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("Expected KEY=VALUE, got '{arg}'"),
    }
}

/// Hex digits with optional whitespace between them.
fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.split_whitespace().collect();
    Ok(hex::decode(digits)?)
}

/// Apply every assignment to the image at `source` and write the result to
/// `target`.
fn update_image(dispatcher: &Dispatcher, source: &Path, target: &Path, assignments: &[Assignment]) -> Result<()> {
    let mut buf = std::fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
    for assignment in assignments {
        buf = assignment
            .apply(dispatcher, &buf)
            .with_context(|| format!("Failed to set {}", assignment.key()))?;
    }

    if target == source && dispatcher.config().output.backup_originals {
        backup_file(source)?;
    }
    std::fs::write(target, &buf).with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

fn show_key(dispatcher: &Dispatcher, images: &[PathBuf], key: &str, as_bytes: bool, json: bool) -> Result<()> {
    let mut results = Vec::new();
    for path in images {
        let buf = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let value = if as_bytes {
            dispatcher.read_tag_bytes(&buf, key).map(|bytes| {
                bytes
                    .iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        } else {
            dispatcher.read_tag_text(&buf, key)
        };

        if json {
            results.push(serde_json::json!({
                "path": path.display().to_string(),
                "key": key,
                "value": value,
            }));
        } else {
            match value {
                Some(v) => println!("{}: {v}", path.display()),
                None => println!("{}: {DIM}(not set){RESET}", path.display()),
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

fn show_records(dispatcher: &Dispatcher, images: &[PathBuf], json: bool) -> Result<()> {
    let mut results = Vec::new();
    for path in images {
        let buf = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let record = dispatcher.read(&buf);
        if json {
            results.push(serde_json::json!({
                "path": path.display().to_string(),
                "metadata": record,
            }));
        } else {
            print_record(path, &record);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 60;

/// Print all metadata of one file, one section per namespace.
fn print_record(path: &Path, record: &MetadataRecord) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let key_width = [&record.exif, &record.iptc, &record.xmp]
        .iter()
        .flat_map(|m| m.keys())
        .map(|k| k.len())
        .max()
        .unwrap_or(0);

    for (title, entries) in [("Exif", &record.exif), ("IPTC", &record.iptc), ("XMP", &record.xmp)] {
        if entries.is_empty() {
            continue;
        }
        println!("  {BOLD}{title}{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (key, value) in entries {
            print_row(key, value, key_width);
        }
        println!();
    }

    if record.is_empty() {
        println!("  {DIM}(no metadata found){RESET}");
        println!();
    }
}

/// Print a single row in the metadata table.
fn print_row(key: &str, val: &str, key_width: usize) {
    let indent = " ".repeat(key_width + 5);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {key:<key_width$} : {line}");
        } else {
            println!("{indent}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

/// Collect image files from a list of paths.
///
/// Directories are walked recursively (following symlinks). Only files with
/// a supported extension are included.
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Create a backup of the original file next to it, once.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const EMPTY_TIFF: &[u8] = b"II*\0\x08\0\0\0\0\0\0\0\0\0";

    // ── arguments ──

    #[test]
    fn assignments_keep_text_after_first_equals() {
        let parsed = parse_assignments(&["Xmp.dc.title=a=b".to_string()], &[]).unwrap();
        assert_eq!(
            parsed,
            vec![Assignment::Text {
                key: "Xmp.dc.title".to_string(),
                value: "a=b".to_string()
            }]
        );
    }

    #[test]
    fn byte_assignments_decode_hex() {
        let parsed = parse_assignments(&[], &["Exif.Photo.UserComment=00ff 10".to_string()]).unwrap();
        assert_eq!(
            parsed,
            vec![Assignment::Bytes {
                key: "Exif.Photo.UserComment".to_string(),
                value: vec![0x00, 0xFF, 0x10]
            }]
        );
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignments(&["no-equals".to_string()], &[]).is_err());
        assert!(parse_assignments(&["=value".to_string()], &[]).is_err());
        assert!(parse_assignments(&[], &["Exif.Image.Artist=abc".to_string()]).is_err());
        assert!(parse_assignments(&[], &["Exif.Image.Artist=zz".to_string()]).is_err());
        assert!(parse_assignments(&[], &["Exif.Image.Artist=0é".to_string()]).is_err());
    }

    // ── is_supported_image ──

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.tif")));
        assert!(!is_supported_image(Path::new("photo.webp")));
        assert!(!is_supported_image(Path::new("readme.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    // ── collect_images ──

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }

    // ── update_image ──

    #[test]
    fn update_in_place_with_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.tif");
        fs::write(&path, EMPTY_TIFF).unwrap();

        let mut config = Config::default();
        config.output.backup_originals = true;
        let dispatcher = Dispatcher::new(config);
        let assignments = parse_assignments(&["Exif.Image.Artist=Jane".to_string()], &[]).unwrap();
        update_image(&dispatcher, &path, &path, &assignments).unwrap();

        assert_eq!(fs::read(dir.path().join("scan.tif.bak")).unwrap(), EMPTY_TIFF);
        let updated = fs::read(&path).unwrap();
        assert_eq!(
            exif_mem::read_tag_text(&updated, "Exif.Image.Artist").as_deref(),
            Some("Jane")
        );
    }

    #[test]
    fn failed_update_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.tif");
        fs::write(&path, EMPTY_TIFF).unwrap();

        let dispatcher = Dispatcher::default();
        let assignments = parse_assignments(&["Bogus.Key=1".to_string()], &[]).unwrap();
        assert!(update_image(&dispatcher, &path, &path, &assignments).is_err());
        assert_eq!(fs::read(&path).unwrap(), EMPTY_TIFF);
    }

    // ── wrap_text ──

    #[test]
    fn wrap_text_breaks_on_words() {
        let lines = wrap_text("alpha beta gamma", 10);
        assert_eq!(lines, vec!["alpha beta", "gamma"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
