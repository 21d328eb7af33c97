//! CLI argument definitions and command dispatch, using clap's derive
//! API.
//!
//! ## Commands
//!
//! - `build`: build one mail artifact for every locale
//! - `serve`: serve the dist tree with live reload
//! - `dev`: watch sources, rebuild on change, serve with live reload

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::{
    build,
    config::{BuildConfig, DEFAULT_LANG_DIR},
    dev,
    serve::{self, ServeOptions},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Take the command if one was provided, otherwise print help.
    pub fn command_or_help(self) -> Option<Command> {
        if self.command.is_none() {
            Self::command().print_help().ok();
        }
        self.command
    }
}

/// Arguments identifying one mail artifact.
#[derive(Debug, Clone, Args)]
pub struct ArtifactArgs {
    /// Category directory (e.g. X_IQ)
    #[arg(short, long)]
    pub category: String,

    /// Artifact name; the build reads <category>/mail-<name>
    #[arg(short, long)]
    pub mail: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct BuildCommand {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Locales to build, comma-separated (default: all discovered)
    #[arg(short, long, value_delimiter = ',')]
    pub locales: Option<Vec<String>>,

    /// Output directory root
    #[arg(long, default_value = "dist")]
    pub dist: PathBuf,

    /// Translations directory
    #[arg(long, default_value = DEFAULT_LANG_DIR)]
    pub lang_dir: PathBuf,

    /// Keep head CSS unminified in the compact output
    #[arg(long)]
    pub no_minify_css: bool,

    /// Collapse inter-tag whitespace in the compact output
    #[arg(long)]
    pub minify_html: bool,

    /// Minify head CSS, inline CSS, and HTML
    #[arg(long)]
    pub minify_all: bool,

    /// Also write index.pretty.html next to each compact output
    #[arg(long)]
    pub pretty: bool,

    /// Keep CSS rules whose selectors are unused in the markup
    #[arg(long)]
    pub no_trim_css: bool,

    /// Skip the non-localized base output at the dist root
    #[arg(long)]
    pub no_base: bool,

    /// Treat a missing translation file or key as fatal for its locale
    #[arg(long)]
    pub fail_on_missing: bool,
}

impl BuildCommand {
    pub fn into_config(self, project_root: PathBuf) -> BuildConfig {
        BuildConfig {
            project_root,
            category: self.artifact.category,
            mail: self.artifact.mail,
            locales: self.locales,
            dist: self.dist,
            lang_dir: self.lang_dir,
            minify_css: !self.no_minify_css,
            minify_html: self.minify_html,
            minify_all: self.minify_all,
            pretty: self.pretty,
            trim_css: !self.no_trim_css,
            fail_on_missing: self.fail_on_missing,
            base: !self.no_base,
            verbose: self.artifact.verbose,
        }
    }
}

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Distribution root to serve from
    #[arg(long, default_value = "dist")]
    pub dist: PathBuf,

    /// Bind host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port
    #[arg(long, default_value_t = 3001)]
    pub port: u16,

    /// Serve index.html even when index.pretty.html exists
    #[arg(long)]
    pub no_prefer_pretty: bool,

    /// Disable the live-reload channel
    #[arg(long)]
    pub no_livereload: bool,
}

#[derive(Debug, Args)]
pub struct DevCommand {
    #[command(flatten)]
    pub artifact: ArtifactArgs,

    /// Bind host for the preview server
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port for the preview server
    #[arg(long, default_value_t = 3001)]
    pub port: u16,

    /// Keep head CSS unminified in dev builds
    #[arg(long)]
    pub no_minify_css: bool,

    /// Disable the live-reload channel
    #[arg(long)]
    pub no_livereload: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a mail artifact: compile and partition CSS, render, inline,
    /// and localize, writing one output pair per locale
    Build(BuildCommand),
    /// Serve the dist tree with live-reload notifications
    Serve(ServeCommand),
    /// Watch sources and rebuild on change, serving the result
    Dev(DevCommand),
}

pub fn run_cli(args: Arguments) -> Result<()> {
    let Some(command) = args.command_or_help() else {
        return Ok(());
    };
    let project_root = std::env::current_dir()?;

    match command {
        Command::Build(cmd) => build::run_build(&cmd.into_config(project_root)),
        Command::Serve(cmd) => serve::run(ServeOptions {
            dist_root: project_root.join(cmd.dist),
            host: cmd.host,
            port: cmd.port,
            prefer_pretty: !cmd.no_prefer_pretty,
            livereload: !cmd.no_livereload,
        }),
        Command::Dev(cmd) => dev::run(cmd, project_root),
    }
}
