// FILE: src/cli/handlers.rs
use crate::{
    cli::{Cli, OutputFormat},
    inline_file_with_options, inline_str_with_options, read_source, InlineOptions, InlineReport, InlineStats,
    InlinerError, Result,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant;

const STDIN_PATH: &str = "-";

// --- INLINE ---
pub fn handle_inline_command(cli: &Cli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_arg(matches, "input")?;
    let output_path = resolve_output_path(
        input_path,
        matches.get_one::<String>("output").map(String::as_str),
        cli.output_directory(),
    );
    let options = cli.build_inline_options(matches);

    if matches.get_flag("watch") {
        if input_path == STDIN_PATH {
            return Err(InlinerError::invalid_format("--watch needs a file input, not stdin"));
        }
        watch_and_inline(input_path, output_path.as_deref(), &options)
    } else {
        inline_once(input_path, output_path.as_deref(), &options, matches)
    }
}

/// `-o` wins; otherwise a configured output directory receives a file with
/// the input's name; otherwise the result goes to stdout.
fn resolve_output_path(
    input_path: &str,
    output: Option<&str>,
    output_directory: Option<&str>,
) -> Option<String> {
    if let Some(output) = output {
        return Some(output.to_string());
    }
    if input_path == STDIN_PATH {
        return None;
    }
    let directory = output_directory?;
    let file_name = Path::new(input_path).file_name()?;
    Some(PathBuf::from(directory).join(file_name).to_string_lossy().into_owned())
}

fn inline_once(
    input_path: &str,
    output_path: Option<&str>,
    options: &InlineOptions,
    matches: &clap::ArgMatches,
) -> Result<()> {
    let stats = run_inline(input_path, output_path, options)?;

    if matches.get_flag("stats") {
        let format = matches
            .get_one::<OutputFormat>("format")
            .cloned()
            .unwrap_or(OutputFormat::Text);
        print_stats(&stats, &format)?;
    }

    Ok(())
}

fn run_inline(input_path: &str, output_path: Option<&str>, options: &InlineOptions) -> Result<InlineStats> {
    if let Some(output_path) = output_path {
        if input_path != STDIN_PATH {
            if let Some(parent) = Path::new(output_path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            return inline_file_with_options(input_path, output_path, options);
        }
    }

    let start_time = Instant::now();
    let source = read_input(input_path)?;
    let (output, report) = inline_str_with_options(&source, options)?;

    match output_path {
        Some(path) => fs::write(path, &output)?,
        None => io::stdout().write_all(output.as_bytes())?,
    }

    Ok(InlineStats {
        source_size: source.len() as u64,
        output_size: output.len() as u64,
        inline_time_ms: start_time.elapsed().as_millis() as u64,
        report,
    })
}

fn read_input(input_path: &str) -> Result<String> {
    if input_path == STDIN_PATH {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    read_source(input_path)
}

/// Statistics go to stderr so they never mix with CSS written to stdout.
fn print_stats(stats: &InlineStats, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(stats).map_err(|e| InlinerError::InvalidFormat {
                message: format!("JSON serialization error: {}", e),
            })?;
            eprintln!("{}", json);
        }
        OutputFormat::Text => {
            eprintln!("📊 Inline Statistics:");
            eprintln!("   Source: {} bytes", stats.source_size);
            eprintln!("   Output: {} bytes", stats.output_size);
            eprintln!("   Time: {}ms", stats.inline_time_ms);
            eprintln!("{}", stats.report);
        }
    }
    Ok(())
}

fn watch_and_inline(input_path: &str, output_path: Option<&str>, options: &InlineOptions) -> Result<()> {
    eprintln!("👀 Watching {} for changes...", input_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    log::error!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| InlinerError::Io(io::Error::new(io::ErrorKind::Other, format!("Failed to create file watcher: {}", e))))?;

    watcher
        .watch(Path::new(input_path), RecursiveMode::NonRecursive)
        .map_err(|e| InlinerError::Io(io::Error::new(io::ErrorKind::Other, format!("Failed to watch file: {}", e))))?;

    match run_inline(input_path, output_path, options) {
        Ok(_) => eprintln!("✅ Initial run successful"),
        Err(e) => eprintln!("❌ Initial run failed: {}", e),
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    continue;
                }
                eprintln!("🔄 File changed, inlining again...");
                match run_inline(input_path, output_path, options) {
                    Ok(stats) => eprintln!(
                        "✅ Done ({} bytes, {}ms)",
                        stats.output_size, stats.inline_time_ms
                    ),
                    Err(e) => eprintln!("❌ Inlining failed: {}", e),
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

// --- CHECK ---
pub fn handle_check_command(cli: &Cli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_arg(matches, "input")?;
    let options = cli.build_inline_options(matches);

    if !Path::new(input_path).is_dir() {
        return check_single_file(input_path, &options).map(|_| ());
    }

    let max_depth = if matches.get_flag("recursive") { usize::MAX } else { 1 };
    let files = collect_css_files(input_path, max_depth)?;
    check_files(&files, &options)
}

fn collect_css_files(dir_path: &str, max_depth: usize) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir_path).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            InlinerError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == "css") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn check_files(files: &[PathBuf], options: &InlineOptions) -> Result<()> {
    let mut error_files = 0;
    for file in files {
        if check_single_file(&file.to_string_lossy(), options).is_err() {
            error_files += 1;
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", files.len());
    println!("   Files with errors: {}", error_files);

    if error_files > 0 {
        Err(InlinerError::invalid_format(format!("{} files have errors", error_files)))
    } else {
        Ok(())
    }
}

fn check_single_file(input_path: &str, options: &InlineOptions) -> Result<InlineReport> {
    println!("🔍 Checking {}", input_path);
    let result = read_input(input_path).and_then(|source| inline_str_with_options(&source, options));

    match result {
        Ok((_, report)) => {
            println!("✅ {}", input_path);
            println!("{}", report);
            Ok(report)
        }
        Err(e) => {
            println!("❌ {} - {}", input_path, e);
            Err(e)
        }
    }
}

fn required_arg<'m>(matches: &'m clap::ArgMatches, name: &str) -> Result<&'m str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| InlinerError::invalid_format(format!("Missing argument '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_output_path() {
        assert_eq!(resolve_output_path("a.css", Some("b.css"), Some("dist")), Some("b.css".to_string()));
        assert_eq!(resolve_output_path("src/a.css", None, None), None);
        assert_eq!(resolve_output_path(STDIN_PATH, None, Some("dist")), None);

        let resolved = resolve_output_path("src/a.css", None, Some("dist")).unwrap();
        assert_eq!(PathBuf::from(resolved), PathBuf::from("dist").join("a.css"));
    }

    #[test]
    fn test_run_inline_creates_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("a.css");
        let output = temp_dir.path().join("dist").join("a.css");
        fs::write(&input, ":root { --w: 1px; } a { width: var(--w); }").unwrap();

        let stats = run_inline(
            input.to_str().unwrap(),
            Some(output.to_str().unwrap()),
            &InlineOptions::default(),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "a { width: 1px; }");
        assert!(stats.report.is_inlined());
    }

    #[test]
    fn test_collect_css_files_respects_depth() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("a.css"), "a { b: c; }").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp_dir.path().join("nested").join("b.css"), "b { c: d; }").unwrap();

        let dir = temp_dir.path().to_str().unwrap();
        assert_eq!(collect_css_files(dir, 1).unwrap().len(), 1);
        assert_eq!(collect_css_files(dir, usize::MAX).unwrap().len(), 2);
    }

    #[test]
    fn test_read_input_distinguishes_missing_from_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.css");
        let binary = temp_dir.path().join("binary.css");
        fs::write(&binary, [0xc3, 0x28]).unwrap();

        assert!(matches!(
            read_input(missing.to_str().unwrap()),
            Err(InlinerError::FileNotFound { .. })
        ));
        assert!(matches!(read_input(binary.to_str().unwrap()), Err(InlinerError::Io(_))));
    }

    #[test]
    fn test_check_files_counts_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.css");
        let bad = temp_dir.path().join("bad.css");
        fs::write(&good, ":root { --a: 1px; } a { width: var(--a); }").unwrap();
        fs::write(&bad, "a { width: 1px;").unwrap();

        let options = InlineOptions::default();
        assert!(check_files(&[good.clone()], &options).is_ok());
        assert!(check_files(&[good, bad], &options).is_err());
    }
}
