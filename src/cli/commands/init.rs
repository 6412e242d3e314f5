//! Init command - interactive first-run setup.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, Write};

/// Simple check result for init command.
struct CheckIssue {
    name: String,
    hint: String,
}

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Sikt Setup");
    println!();
    println!("Welcome to Sikt! Let's make sure everything is configured correctly.\n");

    // Step 1: Check prerequisites
    println!("{}", style("Step 1: Checking prerequisites").bold().cyan());
    println!();

    let tool_issues = check_prerequisites();

    if !tool_issues.is_empty() {
        Output::warning("Some tools are missing. Please install them:");
        println!();
        for issue in &tool_issues {
            println!("  {} {} - not found", style("x").red(), style(&issue.name).bold());
            println!("    {} {}", style("->").dim(), style(&issue.hint).dim());
        }
        println!();

        if !prompt_continue("Continue anyway?")? {
            println!();
            Output::info("Setup cancelled. Install the missing tools and run 'sikt init' again.");
            return Ok(());
        }
    } else {
        Output::success("All required tools are installed!");
    }

    println!();

    // Step 2: Check API key
    println!("{}", style("Step 2: Checking API configuration").bold().cyan());
    println!();

    if std::env::var("OPENAI_API_KEY").is_err() {
        Output::warning("OPENAI_API_KEY environment variable is not set.");
        println!();
        println!("  Sikt requires an OpenAI API key for query embeddings and");
        println!("  vision-language inference.");
        println!("  Get your API key from: {}", style("https://platform.openai.com/api-keys").underlined());
        println!();
        println!("  Set it in your shell configuration (~/.bashrc, ~/.zshrc, etc.):");
        println!("  {}", style("export OPENAI_API_KEY='sk-...'").green());
        println!();

        if !prompt_continue("Continue without API key?")? {
            println!();
            Output::info("Setup cancelled. Set your API key and run 'sikt init' again.");
            return Ok(());
        }
    } else {
        Output::success("OpenAI API key is configured!");
    }

    println!();

    // Step 3: Create directories
    println!("{}", style("Step 3: Setting up directories").bold().cyan());
    println!();

    for (label, dir) in [
        ("data", settings.data_dir()),
        ("temp", settings.temp_dir()),
        ("clip output", settings.clip_output_dir()),
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            Output::success(&format!("Created {} directory: {}", label, dir.display()));
        } else {
            Output::info(&format!("{} directory exists: {}", label, dir.display()));
        }
    }

    println!();

    // Step 4: Create config file
    println!("{}", style("Step 4: Configuration file").bold().cyan());
    println!();

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!("  Edit your config with: {}", style("sikt config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();

    // Summary
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Load an indexed corpus", style("sikt import <segments.jsonl>").cyan());
    println!("  {} Ask a question about your videos", style("sikt ask \"<question>\"").cyan());
    println!("  {} Start a conversation", style("sikt chat").cyan());
    println!();
    println!("For more help: {}", style("sikt --help").cyan());

    Ok(())
}

/// Check prerequisites and return any issues.
fn check_prerequisites() -> Vec<CheckIssue> {
    use std::process::Command;

    let mut issues = Vec::new();

    // Clip extraction needs both tools
    for tool in ["ffmpeg", "ffprobe"] {
        if Command::new(tool).arg("-version").output().is_err() {
            issues.push(CheckIssue {
                name: tool.to_string(),
                hint: install_hint(tool).to_string(),
            });
        }
    }

    issues
}

/// Get platform-specific install hint.
fn install_hint(tool: &str) -> &'static str {
    match tool {
        "ffmpeg" | "ffprobe" => {
            if cfg!(target_os = "macos") {
                "Install with: brew install ffmpeg"
            } else if cfg!(target_os = "linux") {
                "Install with: sudo apt install ffmpeg"
            } else {
                "Install from: https://ffmpeg.org/download.html"
            }
        }
        _ => "Check the documentation for installation instructions",
    }
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_lowercase() == "y" || input.trim().to_lowercase() == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_hint_ffmpeg() {
        let hint = install_hint("ffmpeg");
        assert!(hint.contains("ffmpeg"));
    }
}
