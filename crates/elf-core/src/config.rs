//! Merge job configuration
//!
//! A config file names the two inputs and the output of an offline merge:
//!
//! ```json
//! {
//!   "canonical": "data/Cleaned - ISO-20275 - 2020-11-19.csv",
//!   "supplementary": "data/Additional legal forms.txt",
//!   "output": "data/Cleaned - ISO-20275 - 2020-11-20.csv",
//!   "report": "data/merge-report.json",
//!   "code_width": 4
//! }
//! ```

use crate::error::{Error, Result};
use crate::merger::{merge_files, MergeOptions, DEFAULT_CODE_WIDTH};
use crate::report::MergeReport;
use crate::writer::write_csv;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_code_width() -> usize {
    DEFAULT_CODE_WIDTH
}

/// Inputs, output and options of a merge run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Canonical ISO 20275 CSV file
    pub canonical: PathBuf,
    /// Supplementary legal forms file
    pub supplementary: PathBuf,
    /// Merged CSV to write
    pub output: PathBuf,
    /// Optional JSON report to write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
    /// Width of synthetic codes
    #[serde(default = "default_code_width")]
    pub code_width: usize,
}

impl MergeConfig {
    /// Create a config with default options
    pub fn new(
        canonical: impl Into<PathBuf>,
        supplementary: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            canonical: canonical.into(),
            supplementary: supplementary.into(),
            output: output.into(),
            report: None,
            code_width: DEFAULT_CODE_WIDTH,
        }
    }

    /// Load a config file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the config file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Merge options derived from this config
    pub fn options(&self) -> MergeOptions {
        MergeOptions {
            code_width: self.code_width,
        }
    }

    /// Read both inputs, merge them, write the output and the report
    ///
    /// Fails with [`Error::OutputOverwritesInput`] before reading anything
    /// when the output is one of the inputs.
    pub fn run(&self) -> Result<MergeReport> {
        for input in [&self.canonical, &self.supplementary] {
            if same_file(&self.output, input) {
                return Err(Error::OutputOverwritesInput {
                    path: self.output.clone(),
                });
            }
        }

        let merged = merge_files(&self.canonical, &self.supplementary, &self.options())?;
        write_csv(
            &self.output,
            &merged.header,
            &merged.reconciliation.records,
        )?;

        let report = MergeReport::new(
            &self.canonical,
            &self.supplementary,
            &self.output,
            &merged.reconciliation,
        );
        if let Some(path) = &self.report {
            report.save(path)?;
            tracing::info!(path = %path.display(), "saved merge report");
        }

        Ok(report)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::read_canonical;

    const CANONICAL: &str = "\
\"ELF Code\",\"Country of formation\",\"Country Code (ISO 3166-1)\",\"Jurisdiction of formation\",\"Country sub-division code (ISO 3166-2)\",\"Entity Legal Form name Local name\",\"Language\",\"Language Code (ISO 639-1)\",\"Entity Legal Form name Transliterated name (per ISO 01-140-10)\",\"Abbreviations Local language\",\"Abbreviations transliterated\",\"Date created YYYY-MM-DD (ISO 8601)\",\"ELF Status ACTV/INAC\",\"Modification\",\"Modification date YYYY-MM-DD (ISO 8601)\",\"Reason\"
\"254M\",\"Hong Kong\",\"HK\",\"\",\"\",\"私人股份有限公司\",\"Chinese\",\"zh\",\"Si ren gu fen you xian gong si\",\"\",\"\",\"2017-11-30\",\"ACTV\",\"\",\"\",\"\"
\"J4JC\",\"Belgium\",\"BE\",\"\",\"\",\"Commanditaire vennootschap\",\"Dutch\",\"nl\",\"Commanditaire vennootschap\",\"CommV\",\"\",\"2017-11-30\",\"ACTV\",\"\",\"\",\"\"
";

    const SUPPLEMENTARY: &str = "\
Austria,AT,,,Verein,German,de,Verein,\n\
\n\
254M,Hong Kong,HK,,,私人股份有限公司,Chinese,zh,Si ren gu fen you xian gong si,有限公司,,2017-11-30,ACTV,,,\n";

    #[test]
    fn test_config_defaults() {
        let json = r#"{"canonical": "a.csv", "supplementary": "b.txt", "output": "c.csv"}"#;
        let config: MergeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.code_width, 4);
        assert_eq!(config.report, None);
        assert_eq!(config, MergeConfig::new("a.csv", "b.txt", "c.csv"));
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge.json");

        let mut config = MergeConfig::new("a.csv", "b.txt", "c.csv");
        config.report = Some(PathBuf::from("report.json"));
        config.code_width = 5;
        config.save(&path).unwrap();

        let loaded = MergeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.options().code_width, 5);
    }

    #[test]
    fn test_run_writes_output_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("Cleaned - ISO-20275 - 2020-11-19.csv");
        let supplementary = dir.path().join("Additional legal forms.txt");
        fs::write(&canonical, CANONICAL).unwrap();
        fs::write(&supplementary, SUPPLEMENTARY).unwrap();

        let mut config = MergeConfig::new(
            &canonical,
            &supplementary,
            dir.path().join("Cleaned - ISO-20275 - 2020-11-20.csv"),
        );
        config.report = Some(dir.path().join("report.json"));

        let report = config.run().unwrap();
        assert_eq!(report.stats.output_rows, 3);
        assert_eq!(report.stats.merged_completions, 1);
        assert_eq!(report.issue_count(), 0);

        let merged = read_canonical(&config.output).unwrap();
        let original = read_canonical(&canonical).unwrap();
        assert_eq!(merged.header, original.header);

        let summary: Vec<(&str, &str, &str)> = merged
            .records
            .iter()
            .map(|r| (r.code(), r.country(), r.local_abbreviations()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("0001", "Austria", ""),
                ("J4JC", "Belgium", "CommV"),
                ("254M", "Hong Kong", "有限公司"),
            ]
        );

        let saved = MergeReport::load(dir.path().join("report.json")).unwrap();
        assert_eq!(saved.stats, report.stats);
    }

    #[test]
    fn test_run_refuses_to_overwrite_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("Cleaned - ISO-20275 - 2026-10-16.csv");
        let supplementary = dir.path().join("Additional legal forms.txt");
        fs::write(&canonical, CANONICAL).unwrap();
        fs::write(&supplementary, SUPPLEMENTARY).unwrap();

        // Same file reached through a different spelling
        let output = dir
            .path()
            .join(".")
            .join("Cleaned - ISO-20275 - 2026-10-16.csv");
        let config = MergeConfig::new(&canonical, &supplementary, output);

        let err = config.run().unwrap_err();
        assert!(matches!(err, Error::OutputOverwritesInput { .. }));
        assert_eq!(fs::read_to_string(&canonical).unwrap(), CANONICAL);

        let config = MergeConfig::new(&canonical, &supplementary, &supplementary);
        assert!(matches!(
            config.run().unwrap_err(),
            Error::OutputOverwritesInput { .. }
        ));
        assert_eq!(fs::read_to_string(&supplementary).unwrap(), SUPPLEMENTARY);
    }

    #[test]
    fn test_run_rejects_bad_supplementary_row() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("canonical.csv");
        let supplementary = dir.path().join("extra.txt");
        fs::write(&canonical, CANONICAL).unwrap();
        fs::write(&supplementary, "a,b,c\n").unwrap();

        let config = MergeConfig::new(&canonical, &supplementary, dir.path().join("out.csv"));
        let err = config.run().unwrap_err();
        assert!(matches!(err, Error::UnsupportedSupplementaryRow { .. }));
        assert!(!dir.path().join("out.csv").exists());
    }
}
