//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{LanguagePolicy, Settings};

/// Check and repair links and anchors of a Markdown/AsciiDoc documentation tree
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Root of the documentation tree
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub target: PathBuf,

    /// Analyse and report without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Also write diagnostics to the log file
    #[arg(long)]
    pub keep_logs: bool,

    /// Write the JSON audit of every issue and fix
    #[arg(long)]
    pub keep_audit: bool,

    /// Skip the duplicate-anchor pass
    #[arg(long)]
    pub no_anchor_check: bool,

    /// How languages are grouped when looking for anchor collisions
    #[arg(long, value_enum)]
    pub languages: Option<LanguagePolicy>,

    /// Leave English documents untouched
    #[arg(long)]
    pub skip_english: bool,

    /// Debug-level diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Flags given on the command line win over configuration files.
    pub fn apply(&self, settings: &mut Settings) {
        settings.target = self.target.clone();
        settings.dry_run |= self.dry_run;
        settings.keep_logs |= self.keep_logs;
        settings.keep_audit |= self.keep_audit;
        settings.skip_english |= self.skip_english;
        if self.no_anchor_check {
            settings.check_anchors = false;
        }
        if let Some(policy) = self.languages {
            settings.language_policy = policy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "doclinks",
            "docs",
            "--dry-run",
            "--no-anchor-check",
            "--languages",
            "default-only",
        ]);
        let mut settings = Settings::default();

        cli.apply(&mut settings);

        assert_eq!(settings.target, PathBuf::from("docs"));
        assert!(settings.dry_run);
        assert!(!settings.check_anchors);
        assert_eq!(settings.language_policy, LanguagePolicy::DefaultOnly);
        assert!(!settings.skip_english);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let cli = Cli::parse_from(["doclinks", "docs"]);
        let mut settings = Settings {
            dry_run: true,
            language_policy: LanguagePolicy::Merged,
            ..Settings::default()
        };

        cli.apply(&mut settings);

        assert!(settings.dry_run);
        assert!(settings.check_anchors);
        assert_eq!(settings.language_policy, LanguagePolicy::Merged);
    }
}
