//! Command-line interface for vitaltree.
//!
//! This module provides the CLI structure for the `vtree` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FamilyCommand, GenderArg, LoginCommand, PersonCommand, ProfileArgs,
    ProfileCommand, ReadingArgs, StatusCommand, StyleArgs, StyleCommand, TreeCommand,
    VitalsCommand,
};

/// vtree - Track health vitals and keep a family tree
///
/// Everything is stored locally in a single database file. Health profiles
/// can be shared by email, readings exported to CSV, and trends summarized
/// by a generative-text service when an API key is configured.
#[derive(Debug, Parser)]
#[command(name = "vtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with an email address
    Login(LoginCommand),

    /// Sign out
    Logout,

    /// Show who is signed in
    Whoami,

    /// Show storage and session status
    Status(StatusCommand),

    /// Manage health profiles
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Record and review vital signs
    #[command(subcommand)]
    Vitals(VitalsCommand),

    /// Summarize a profile's readings with the insight service
    Insights {
        /// Profile id
        profile_id: String,
    },

    /// Edit the family tree
    #[command(subcommand)]
    Tree(TreeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
