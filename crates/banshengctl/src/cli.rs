//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use bansheng_kb::FactKind;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bansheng knowledge base CLI
#[derive(Parser)]
#[command(name = "banshengctl")]
#[command(about = "Bansheng - pregnancy knowledge base for expectant fathers", long_about = None)]
#[command(version = env!("BANSHENG_VERSION"))]
#[command(long_version = env!("BANSHENG_LONG_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/bansheng/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Knowledge database path (overrides [store] path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Open the knowledge base and seed it if the content version changed
    Init {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Show row counts per fact kind
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Ranked search over one fact kind
    Search {
        /// food, symptom, emotional or emergency
        kind: FactKind,

        query: String,

        /// Maximum results (default from [search] config)
        #[arg(long, short)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Look up a food by exact Chinese or English name
    Food {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// List foods in a category
    Category {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Classify a message
    Intent {
        text: String,

        #[arg(long)]
        json: bool,
    },

    /// Walk a symptom decision tree with yes/no answers
    Evaluate {
        /// Symptom id (e.g. symptom_bleeding)
        symptom_id: String,

        /// Answers in question order: y/n, yes/no, true/false, 1/0, 是/否
        #[arg(value_parser = parse_answer)]
        answers: Vec<bool>,

        #[arg(long)]
        json: bool,
    },

    /// Show the system prompt a message would produce
    Prompt {
        message: String,

        /// Due date (YYYY-MM-DD); defaults to mid-pregnancy
        #[arg(long)]
        due_date: Option<NaiveDate>,

        /// Warning sign to list for this week (repeatable)
        #[arg(long = "warn")]
        warning_signs: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

pub fn parse_answer(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "是" => Ok(true),
        "n" | "no" | "false" | "0" | "否" => Ok(false),
        other => Err(format!("expected yes or no, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("Y"), Ok(true));
        assert_eq!(parse_answer("否"), Ok(false));
        assert!(parse_answer("maybe").is_err());
    }

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::try_parse_from([
            "banshengctl", "--db", "/tmp/kb.db", "evaluate", "symptom_bleeding", "y", "n", "n",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/kb.db")));
        match cli.command {
            Commands::Evaluate { symptom_id, answers, .. } => {
                assert_eq!(symptom_id, "symptom_bleeding");
                assert_eq!(answers, vec![true, false, false]);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_parse_search_kind() {
        let cli = Cli::try_parse_from(["banshengctl", "search", "foods", "螃蟹", "-l", "2"]).unwrap();
        match cli.command {
            Commands::Search { kind, limit, .. } => {
                assert_eq!(kind, FactKind::Food);
                assert_eq!(limit, Some(2));
            }
            _ => panic!("expected search"),
        }
    }
}
