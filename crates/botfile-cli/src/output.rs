use std::io::Write;

use anyhow::Result;
use botfile_config::Service;
use colored::Colorize;

const TAG: &str = "[botfile]";

/// Write the patched entry to stdout
pub fn print_service(service: &Service) -> Result<()> {
    let json = service.to_pretty_json()?;
    writeln!(std::io::stdout().lock(), "{json}")?;
    Ok(())
}

/// Single tagged line on stderr
pub fn print_error(msg: &str) {
    eprintln!("{}", error_line(msg).bright_red());
}

pub fn print_usage(usage: &str) {
    for line in usage_lines(usage) {
        eprintln!("{line}");
    }
}

/// First line of `msg` behind the tag
fn error_line(msg: &str) -> String {
    let line = msg.lines().next().unwrap_or_default();
    format!("{TAG} {line}")
}

fn usage_lines(usage: &str) -> impl Iterator<Item = String> + '_ {
    usage.lines().map(|line| format!("{TAG} {line}"))
}
