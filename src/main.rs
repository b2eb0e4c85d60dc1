//! CSS variable inliner binary

use inline_css_vars::cli::Cli;
use std::process;

fn main() {
    let mut cli = Cli::new();

    if let Err(e) = cli.run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
