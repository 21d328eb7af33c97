use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Ok, Result};
use tempfile::TempDir;

mod build;

const BIN: &str = env!("CARGO_BIN_EXE_mailforge");

pub struct CliTest {
    _temp_dir: TempDir,
    project_dir: PathBuf,
}

impl CliTest {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().canonicalize()?;
        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    /// A minimal buildable project: one artifact, one locale.
    pub fn with_project() -> Result<Self> {
        let test = Self::new()?;
        test.write_file(
            "X_IQ/mail-welcome/app/templates/index.hbs",
            "<html><head><style>{{{head_css}}}</style></head>\
             <body><p class=\"lead\">${{ nav.title }}$</p></body></html>",
        )?;
        test.write_file(
            "X_IQ/mail-welcome/app/styles/inline.css",
            ".lead { color: #333; }\n.unused { color: red; }\n\
             @media print { .lead { color: black; } }\n",
        )?;
        test.write_file("vendor/data/en/nav.json", r#"{"title": "Hello"}"#)?;
        Ok(test)
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write file: {}", file_path.display()))?;

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.project_dir
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(BIN);
        cmd.current_dir(&self.project_dir);
        cmd.env("NO_COLOR", "1"); // Disable colors for consistent test output
        cmd
    }

    pub fn build_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.args(["build", "--category", "X_IQ", "--mail", "welcome"]);
        cmd
    }

    pub fn read_file(&self, path: &str) -> Result<String> {
        let file_path = self.project_dir.join(path);
        fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.project_dir.join(path).exists()
    }
}
