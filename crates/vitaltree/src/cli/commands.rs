//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::health::{Gender, NewProfile, NewRecord};

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Email address used as your identity
    pub email: String,

    /// Display name (defaults to the part of the email before '@')
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Profile management commands.
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// List profiles you own or that are shared with you
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a profile
    Add(ProfileArgs),

    /// Show a profile with its latest reading
    Show {
        /// Profile id
        id: String,
    },

    /// Share a profile with another email address
    Share {
        /// Profile id
        id: String,
        /// Email address to grant access to
        email: String,
    },

    /// Stop sharing a profile with an email address
    Unshare {
        /// Profile id
        id: String,
        /// Email address to revoke
        email: String,
    },

    /// Delete a profile and all of its readings
    Delete {
        /// Profile id
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Fields for a new profile.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Full name
    pub name: String,

    /// Gender
    #[arg(short, long, value_enum, default_value = "male")]
    pub gender: GenderArg,

    /// Date of birth (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_name = "DATE")]
    pub dob: Option<String>,

    /// Blood type, e.g. "O+"
    #[arg(short, long)]
    pub blood_type: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl From<ProfileArgs> for NewProfile {
    fn from(args: ProfileArgs) -> Self {
        Self {
            name: args.name,
            gender: args.gender.into(),
            date_of_birth: args.dob,
            blood_type: args.blood_type,
            notes: args.notes,
        }
    }
}

/// Gender for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenderArg {
    /// Male
    Male,
    /// Female
    Female,
    /// Other or unspecified
    Other,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => Self::Male,
            GenderArg::Female => Self::Female,
            GenderArg::Other => Self::Other,
        }
    }
}

/// Vital sign reading commands.
#[derive(Debug, Subcommand)]
pub enum VitalsCommand {
    /// Record a reading
    Add(ReadingArgs),

    /// List readings for a profile, newest first
    List {
        /// Profile id
        profile_id: String,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the latest reading for a profile
    Last {
        /// Profile id
        profile_id: String,
    },

    /// Delete a reading
    Delete {
        /// Reading id
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Export a profile's readings as CSV
    Export {
        /// Profile id
        profile_id: String,
        /// Output file (defaults to health_data_<name>_<date>.csv)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Fields for a new reading. Omitted values use the entry form defaults.
#[derive(Debug, Args)]
pub struct ReadingArgs {
    /// Profile id
    pub profile_id: String,

    /// Systolic pressure in mmHg (40-250, default 120)
    #[arg(short, long, value_parser = clap::value_parser!(i32).range(40..=250))]
    pub systolic: Option<i32>,

    /// Diastolic pressure in mmHg (40-200, default 80)
    #[arg(short, long, value_parser = clap::value_parser!(i32).range(40..=200))]
    pub diastolic: Option<i32>,

    /// Heart rate in bpm (30-250, default 70)
    #[arg(long, value_parser = clap::value_parser!(i32).range(30..=250))]
    pub heart_rate: Option<i32>,

    /// Oxygen saturation in percent (50-100, default 98)
    #[arg(long, value_parser = clap::value_parser!(i32).range(50..=100))]
    pub spo2: Option<i32>,

    /// When the reading was taken (RFC 3339 or "YYYY-MM-DD HH:MM", defaults to now)
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl ReadingArgs {
    /// Convert to repository input with an already-parsed timestamp.
    #[must_use]
    pub fn into_new_record(self, timestamp: Option<i64>) -> NewRecord {
        NewRecord {
            patient_id: self.profile_id,
            timestamp,
            systolic: self.systolic,
            diastolic: self.diastolic,
            heart_rate: self.heart_rate,
            oxygen_saturation: self.spo2,
            notes: self.notes,
        }
    }
}

/// Family tree commands.
#[derive(Debug, Subcommand)]
pub enum TreeCommand {
    /// Show people and families
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add, edit, or delete people
    #[command(subcommand)]
    Person(PersonCommand),

    /// Add, edit, or delete family units
    #[command(subcommand)]
    Family(FamilyCommand),

    /// Show parents, spouses, and children of a person
    Relations {
        /// Person id
        id: String,
    },

    /// View or change the layout style
    #[command(subcommand)]
    Style(StyleCommand),

    /// Replace the whole tree with the demo data
    Demo {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Write the tree as JSON
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace the tree with a JSON document
    Import {
        /// JSON file to read
        file: PathBuf,
    },
}

/// Person commands.
#[derive(Debug, Subcommand)]
pub enum PersonCommand {
    /// Add a person, or replace one with the same id
    Add {
        /// Person id
        id: String,
        /// Full name
        name: String,
        /// Birth date or year
        #[arg(long, default_value = "")]
        born: String,
        /// Death date or year
        #[arg(long, default_value = "")]
        died: String,
        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
        /// Photo URL
        #[arg(long)]
        photo: Option<String>,
    },

    /// Delete a person and remove them from every family
    Delete {
        /// Person id
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Family unit commands.
#[derive(Debug, Subcommand)]
pub enum FamilyCommand {
    /// Add a family, or replace one with the same id
    Add {
        /// Family id
        id: String,
        /// Label (defaults to the style's family label)
        #[arg(short, long, default_value = "")]
        label: String,
        /// Spouse person id (repeat for two spouses)
        #[arg(short, long = "spouse", value_name = "ID")]
        spouses: Vec<String>,
        /// Child person id (repeatable)
        #[arg(long = "child", value_name = "ID")]
        children: Vec<String>,
        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Delete a family unit (its people are kept)
    Delete {
        /// Family id
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Layout style commands.
#[derive(Debug, Subcommand)]
pub enum StyleCommand {
    /// Show the current style
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change one or more style values
    Set(StyleArgs),

    /// Restore the default style
    Reset,
}

/// Style values to change. Omitted values are left as they are.
#[derive(Debug, Default, Args)]
pub struct StyleArgs {
    /// Label given to new family units
    #[arg(long)]
    pub family_label: Option<String>,
    /// Edge stroke width
    #[arg(long)]
    pub edge_width: Option<f64>,
    /// Person node width
    #[arg(long)]
    pub person_width: Option<f64>,
    /// Person node height
    #[arg(long)]
    pub person_height: Option<f64>,
    /// Family node size
    #[arg(long)]
    pub family_size: Option<f64>,
    /// Separation between generations
    #[arg(long)]
    pub ranksep: Option<f64>,
    /// Separation between nodes in a generation
    #[arg(long)]
    pub nodesep: Option<f64>,
}

impl StyleArgs {
    /// Overlay the given values onto `style`.
    pub fn apply_to(self, style: &mut crate::genealogy::StyleConfig) {
        if let Some(label) = self.family_label {
            style.family_label_default = label;
        }
        if let Some(v) = self.edge_width {
            style.edge_width = v;
        }
        if let Some(v) = self.person_width {
            style.node_size_person.width = v;
        }
        if let Some(v) = self.person_height {
            style.node_size_person.height = v;
        }
        if let Some(v) = self.family_size {
            style.node_size_family = v;
        }
        if let Some(v) = self.ranksep {
            style.ranksep = v;
        }
        if let Some(v) = self.nodesep {
            style.nodesep = v;
        }
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
