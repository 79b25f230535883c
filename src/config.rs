use std::path::{Path, PathBuf};

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the documentation tree; set from the command line
    #[serde(default)]
    pub target: PathBuf,
    /// Analyse and log without writing any file
    pub dry_run: bool,
    /// Also write diagnostics to `log_file`
    pub keep_logs: bool,
    pub log_file: PathBuf,
    /// Write the JSON audit to `audit_file`
    pub keep_audit: bool,
    pub audit_file: PathBuf,
    /// Run the duplicate-anchor pass before resolution
    pub check_anchors: bool,
    pub language_policy: LanguagePolicy,
    /// Leave English documents untouched (they stay link targets)
    pub skip_english: bool,
    /// Directory under the root whose subdirectories get their own index
    pub components_dir: String,
}

/// How languages are partitioned when looking for anchor collisions.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum LanguagePolicy {
    /// Each language is checked on its own
    #[default]
    Separate,
    /// Only default-language documents are checked
    DefaultOnly,
    /// All languages form one collision domain
    Merged,
}

impl Settings {
    /// Defaults, then `~/.config/doclinks/settings`, then `<target>/.doclinks`.
    pub fn new(target: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/doclinks/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.doclinks",
                    target
                        .to_str()
                        .ok_or(anyhow!("Can't convert target to str"))?
                ))
                .required(false),
            )
            .set_default("dry_run", false)?
            .set_default("keep_logs", false)?
            .set_default("log_file", "doclinks.log")?
            .set_default("keep_audit", false)?
            .set_default("audit_file", "doclinks-audit.json")?
            .set_default("check_anchors", true)?
            .set_default("language_policy", "Separate")?
            .set_default("skip_english", false)?
            .set_default("components_dir", "components")?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let mut settings = settings.try_deserialize::<Settings>()?;
        settings.target = target.to_path_buf();

        anyhow::Ok(settings)
    }

    pub fn for_target(target: &Path) -> Settings {
        Settings {
            target: target.to_path_buf(),
            ..Default::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            target: PathBuf::from("."),
            dry_run: false,
            keep_logs: false,
            log_file: PathBuf::from("doclinks.log"),
            keep_audit: false,
            audit_file: PathBuf::from("doclinks-audit.json"),
            check_anchors: true,
            language_policy: LanguagePolicy::Separate,
            skip_english: false,
            components_dir: "components".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_docs, write_file};

    #[test]
    fn project_file_overrides_defaults() {
        let (_temp_dir, docs_dir) = create_test_docs(|dir| {
            write_file(
                dir,
                ".doclinks.toml",
                "dry_run = true\nlanguage_policy = \"Merged\"\ncomponents_dir = \"parts\"\n",
            );
        });

        let settings = Settings::new(&docs_dir).unwrap();

        assert!(settings.dry_run);
        assert_eq!(settings.language_policy, LanguagePolicy::Merged);
        assert_eq!(settings.components_dir, "parts");
        assert!(settings.check_anchors);
        assert_eq!(settings.target, docs_dir);
    }
}
