//! `vtree` - CLI for vitaltree
//!
//! This binary provides the command-line interface for the health vitals
//! tracker and the family tree editor.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::Parser;
use tracing::debug;

use vitaltree::cli::{
    Cli, Command, ConfigCommand, FamilyCommand, PersonCommand, ProfileCommand, ReadingArgs,
    StyleCommand, TreeCommand, VitalsCommand,
};
use vitaltree::genealogy::{relations_of, Family, Person, TreeData};
use vitaltree::health::{age, export_file_name, write_csv_file, HealthProfile, User, VitalRecord};
use vitaltree::{
    init_logging, Config, GeminiClient, HealthRepository, HealthView, InsightOutcome,
    InsightService, Storage, TreeRepository, TreeView,
};

type Health<'a> = HealthRepository<&'a Storage>;
type Tree<'a> = TreeRepository<&'a Storage>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => run(&config, command),
    }
}

fn run(config: &Config, command: Command) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let health = HealthRepository::new(&storage);
    let tree = TreeRepository::new(&storage).with_demo_seed(config.genealogy.seed_demo_on_empty);

    match command {
        Command::Login(login) => {
            let user = health.login(&login.email, login.name.as_deref())?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            if health.logout()? {
                println!("Logged out.");
            } else {
                println!("Nobody was logged in.");
            }
        }
        Command::Whoami => match health.current_user()? {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("Not logged in. Use `vtree login <email>`."),
        },
        Command::Status(status_cmd) => handle_status(&storage, &health, &tree, status_cmd.json)?,
        Command::Profile(profile_cmd) => handle_profile(&health, profile_cmd)?,
        Command::Vitals(vitals_cmd) => handle_vitals(&health, vitals_cmd)?,
        Command::Insights { profile_id } => handle_insights(config, &health, &profile_id)?,
        Command::Tree(tree_cmd) => handle_tree(&tree, tree_cmd)?,
        Command::Config(config_cmd) => handle_config(config, config_cmd)?,
    }
    Ok(())
}

fn handle_status(
    storage: &Storage,
    health: &Health<'_>,
    tree: &Tree<'_>,
    json: bool,
) -> anyhow::Result<()> {
    let stats = storage.stats()?;
    let user = health.current_user()?;
    let profiles = health.profiles()?.len();
    let records = health.records()?.len();
    let family_tree = tree.load()?;
    let health_view = HealthView::initial(user.is_some());
    let tree_view = TreeView::default();

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "user": user.as_ref().map(|u| &u.email),
            "health_view": health_view,
            "tree_view": tree_view,
            "profiles": profiles,
            "records": records,
            "people": family_tree.people.len(),
            "families": family_tree.families.len(),
            "keys": stats.total_keys,
            "stored_bytes": stats.total_bytes,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("vtree status");
        println!("------------");
        println!("Database:      {}", storage.path().display());
        println!(
            "User:          {}",
            user.as_ref().map_or("(not logged in)", |u| u.email.as_str())
        );
        println!("Opens at:      health {health_view}, tree {tree_view}");
        println!("Profiles:      {profiles}");
        println!("Readings:      {records}");
        println!("People:        {}", family_tree.people.len());
        println!("Families:      {}", family_tree.families.len());
        println!(
            "Stored:        {} keys, {} bytes ({} on disk)",
            stats.total_keys, stats.total_bytes, stats.db_size_bytes
        );
    }
    Ok(())
}

// === Health ===

/// A profile the signed-in user may see, or a not-found error.
fn visible_profile(health: &Health<'_>, user: &User, id: &str) -> anyhow::Result<HealthProfile> {
    match health.profile(id)? {
        Some(profile) if profile.is_visible_to(user) => Ok(profile),
        _ => Err(vitaltree::Error::not_found("profile", id).into()),
    }
}

fn owned_profile(health: &Health<'_>, user: &User, id: &str) -> anyhow::Result<HealthProfile> {
    let profile = visible_profile(health, user, id)?;
    if !profile.is_owned_by(user) {
        bail!("only the owner of profile {id} can change who it is shared with or delete it");
    }
    Ok(profile)
}

fn handle_profile(health: &Health<'_>, cmd: ProfileCommand) -> anyhow::Result<()> {
    let user = health.require_user()?;

    match cmd {
        ProfileCommand::List { json } => {
            let profiles = health.profiles_visible_to(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else if profiles.is_empty() {
                println!("No profiles yet. Create one with `vtree profile add <name>`.");
            } else {
                for profile in &profiles {
                    let shared = if profile.is_owned_by(&user) {
                        ""
                    } else {
                        " (shared with you)"
                    };
                    println!(
                        "{}  {} ({}, {} y){}",
                        profile.id,
                        profile.name,
                        profile.gender,
                        age(&profile.date_of_birth),
                        shared
                    );
                }
            }
        }
        ProfileCommand::Add(args) => {
            let profile = health.create_profile(args.into(), &user)?;
            println!("Created profile {} ({})", profile.name, profile.id);
        }
        ProfileCommand::Show { id } => {
            let profile = visible_profile(health, &user, &id)?;
            let count = health.records_for(&profile.id)?.len();
            print_profile(&profile, count);
            match health.last_record_for(&profile.id)? {
                Some(record) => {
                    println!();
                    println!("Latest reading:");
                    print_record(&record);
                }
                None => println!("No readings recorded."),
            }
        }
        ProfileCommand::Share { id, email } => {
            owned_profile(health, &user, &id)?;
            let profile = health.share_profile(&id, &email)?;
            println!(
                "{} is shared with: {}",
                profile.name,
                profile.shared_with.join(", ")
            );
        }
        ProfileCommand::Unshare { id, email } => {
            owned_profile(health, &user, &id)?;
            let profile = health.unshare_profile(&id, &email)?;
            if profile.shared_with.is_empty() {
                println!("{} is no longer shared.", profile.name);
            } else {
                println!(
                    "{} is shared with: {}",
                    profile.name,
                    profile.shared_with.join(", ")
                );
            }
        }
        ProfileCommand::Delete { id, yes } => {
            let profile = owned_profile(health, &user, &id)?;
            if !yes {
                println!(
                    "This will delete {} and all of their readings.",
                    profile.name
                );
                println!("Use --yes to confirm.");
                return Ok(());
            }
            let removed = health.delete_profile(&id)?;
            println!("Deleted {} and {removed} readings.", profile.name);
        }
    }
    Ok(())
}

fn handle_vitals(health: &Health<'_>, cmd: VitalsCommand) -> anyhow::Result<()> {
    let user = health.require_user()?;

    match cmd {
        VitalsCommand::Add(args) => {
            visible_profile(health, &user, &args.profile_id)?;
            let record = add_reading(health, args)?;
            println!("Recorded reading {}", record.id);
            print_record(&record);
        }
        VitalsCommand::List { profile_id, json } => {
            visible_profile(health, &user, &profile_id)?;
            let records = health.records_for_desc(&profile_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No readings recorded.");
            } else {
                for record in &records {
                    println!(
                        "{}  {}  BP {}/{}  HR {}  SpO2 {}%{}",
                        record.id,
                        format_time(record.timestamp),
                        record.systolic,
                        record.diastolic,
                        record.heart_rate,
                        record.oxygen_saturation,
                        record
                            .notes
                            .as_deref()
                            .map(|n| format!("  {n}"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        VitalsCommand::Last { profile_id } => {
            visible_profile(health, &user, &profile_id)?;
            match health.last_record_for(&profile_id)? {
                Some(record) => print_record(&record),
                None => println!("No readings recorded."),
            }
        }
        VitalsCommand::Delete { id, yes } => {
            let Some(record) = health.records()?.into_iter().find(|r| r.id == id) else {
                return Err(vitaltree::Error::not_found("record", id).into());
            };
            visible_profile(health, &user, &record.patient_id)?;
            if !yes {
                println!("This will delete the reading from {}.", format_time(record.timestamp));
                println!("Use --yes to confirm.");
                return Ok(());
            }
            health.delete_record(&id)?;
            println!("Deleted reading {id}.");
        }
        VitalsCommand::Export { profile_id, output } => {
            let profile = visible_profile(health, &user, &profile_id)?;
            let records = health.records_for(&profile_id)?;
            if records.is_empty() {
                println!("Nothing to export: {} has no readings.", profile.name);
                return Ok(());
            }
            let refs: Vec<&VitalRecord> = records.iter().collect();
            let path = match output {
                Some(path) => path,
                None => PathBuf::from(export_file_name(
                    &profile.name,
                    Local::now().date_naive(),
                )?),
            };
            write_csv_file(&path, &refs)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {} readings to {}", records.len(), path.display());
        }
    }
    Ok(())
}

fn add_reading(health: &Health<'_>, args: ReadingArgs) -> anyhow::Result<VitalRecord> {
    let timestamp = args.at.as_deref().map(parse_time).transpose()?;
    Ok(health.add_record(args.into_new_record(timestamp))?)
}

/// Parse RFC 3339 or a local `YYYY-MM-DD HH:MM` into epoch milliseconds.
fn parse_time(text: &str) -> anyhow::Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp_millis());
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M")
        .with_context(|| format!("unrecognized time '{text}', expected RFC 3339 or YYYY-MM-DD HH:MM"))?;
    let Some(local) = Local.from_local_datetime(&naive).earliest() else {
        bail!("time '{text}' does not exist in the local time zone");
    };
    Ok(local.timestamp_millis())
}

fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp_millis(timestamp).map_or_else(
        || timestamp.to_string(),
        |dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn print_profile(profile: &HealthProfile, record_count: usize) {
    println!("{}", profile.name);
    println!("  Id:            {}", profile.id);
    println!("  Gender:        {}", profile.gender);
    println!(
        "  Born:          {} ({} years)",
        profile.date_of_birth,
        age(&profile.date_of_birth)
    );
    println!(
        "  Blood type:    {}",
        profile.blood_type.as_deref().unwrap_or("-")
    );
    if let Some(notes) = &profile.notes {
        println!("  Notes:         {notes}");
    }
    println!("  Owner:         {}", profile.owner_id);
    if !profile.shared_with.is_empty() {
        println!("  Shared with:   {}", profile.shared_with.join(", "));
    }
    println!("  Readings:      {record_count}");
}

fn print_record(record: &VitalRecord) {
    println!("  Taken:         {}", format_time(record.timestamp));
    println!(
        "  Blood pressure: {}/{} mmHg",
        record.systolic, record.diastolic
    );
    println!("  Heart rate:    {} bpm", record.heart_rate);
    println!("  SpO2:          {}%", record.oxygen_saturation);
    if let Some(notes) = &record.notes {
        println!("  Notes:         {notes}");
    }
}

fn handle_insights(config: &Config, health: &Health<'_>, profile_id: &str) -> anyhow::Result<()> {
    let user = health.require_user()?;
    let profile = visible_profile(health, &user, profile_id)?;
    let records = health.records_for(&profile.id)?;
    if records.is_empty() {
        println!("No readings recorded for {}; nothing to analyze.", profile.name);
        return Ok(());
    }

    let service = InsightService::new(GeminiClient::from_config(&config.insights)?);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    debug!("Requesting insights for {} readings", records.len());
    match runtime.block_on(service.generate(&profile, &records)) {
        InsightOutcome::Generated(text) => println!("{text}"),
        InsightOutcome::Failed(message) => bail!(message),
        InsightOutcome::Busy => println!("An insight request is already running."),
        InsightOutcome::NoRecords => println!("No readings recorded for {}.", profile.name),
    }
    Ok(())
}

// === Genealogy ===

fn handle_tree(tree: &Tree<'_>, cmd: TreeCommand) -> anyhow::Result<()> {
    match cmd {
        TreeCommand::Show { json } => {
            let data = tree.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_tree(&data);
            }
        }
        TreeCommand::Person(PersonCommand::Add {
            id,
            name,
            born,
            died,
            notes,
            photo,
        }) => {
            let person = Person {
                born,
                died,
                notes,
                photo,
                ..Person::new(id, name)
            };
            let label = format!("{} ({})", person.name, person.id);
            tree.upsert_person(person)?;
            println!("Saved {label}");
        }
        TreeCommand::Person(PersonCommand::Delete { id, yes }) => {
            let data = tree.load()?;
            let Some(person) = data.person(&id) else {
                return Err(vitaltree::Error::not_found("person", id).into());
            };
            if !yes {
                println!(
                    "This will delete {} and remove them from every family.",
                    person.name
                );
                println!("Use --yes to confirm.");
                return Ok(());
            }
            tree.delete_person(&id)?;
            println!("Deleted person {id}.");
        }
        TreeCommand::Family(FamilyCommand::Add {
            id,
            label,
            spouses,
            children,
            notes,
        }) => {
            let mut family = Family::new(id, label)
                .with_spouses(spouses)
                .with_children(children);
            family.notes = notes;
            let id = family.id.clone();
            let data = tree.upsert_family(family)?;
            if let Some(saved) = data.family(&id) {
                println!("Saved family {}", describe_family(&data, saved));
            }
        }
        TreeCommand::Family(FamilyCommand::Delete { id, yes }) => {
            if tree.load()?.family(&id).is_none() {
                return Err(vitaltree::Error::not_found("family", id).into());
            }
            if !yes {
                println!("This will delete family {id}. Its people are kept.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            tree.delete_family(&id)?;
            println!("Deleted family {id}.");
        }
        TreeCommand::Relations { id } => {
            let data = tree.load()?;
            let Some(person) = data.person(&id) else {
                return Err(vitaltree::Error::not_found("person", id).into());
            };
            let relations = relations_of(&data, &id);
            println!("{}", person_line(person));
            print_people("Parents", &relations.parents);
            print_people("Spouses", &relations.spouses);
            print_people("Children", &relations.children);
        }
        TreeCommand::Style(style_cmd) => handle_style(tree, style_cmd)?,
        TreeCommand::Demo { yes } => {
            if !yes {
                println!("This will replace the whole tree with the demo data.");
                println!("Use --yes to confirm.");
                return Ok(());
            }
            let data = tree.reset_to_demo()?;
            println!(
                "Loaded demo tree: {} people, {} families.",
                data.people.len(),
                data.families.len()
            );
        }
        TreeCommand::Export { output } => match output {
            Some(path) => {
                tree.export_file(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Exported tree to {}", path.display());
            }
            None => println!("{}", tree.export_json()?),
        },
        TreeCommand::Import { file } => {
            let data = tree
                .import_file(&file)
                .with_context(|| format!("failed to import {}", file.display()))?;
            println!(
                "Imported {} people and {} families from {}",
                data.people.len(),
                data.families.len(),
                file.display()
            );
        }
    }
    Ok(())
}

fn handle_style(tree: &Tree<'_>, cmd: StyleCommand) -> anyhow::Result<()> {
    let style = match cmd {
        StyleCommand::Show { json } => {
            let style = tree.load()?.style;
            if json {
                println!("{}", serde_json::to_string_pretty(&style)?);
                return Ok(());
            }
            style
        }
        StyleCommand::Set(args) => {
            let mut style = tree.load()?.style;
            args.apply_to(&mut style);
            tree.set_style(style)?.style
        }
        StyleCommand::Reset => tree.reset_style()?.style,
    };

    println!("Family label:   {}", style.family_label_default);
    println!("Edge width:     {}", style.edge_width);
    println!(
        "Person node:    {} x {}",
        style.node_size_person.width, style.node_size_person.height
    );
    println!("Family node:    {}", style.node_size_family);
    println!("Rank sep:       {}", style.ranksep);
    println!("Node sep:       {}", style.nodesep);
    Ok(())
}

fn person_line(person: &Person) -> String {
    let lifespan = person.lifespan();
    if lifespan.is_empty() {
        format!("{} ({})", person.name, person.id)
    } else {
        format!("{} ({}) {lifespan}", person.name, person.id)
    }
}

fn name_of<'a>(data: &'a TreeData, id: &'a str) -> &'a str {
    data.person(id).map_or(id, |p| p.name.as_str())
}

fn describe_family(data: &TreeData, family: &Family) -> String {
    let spouses: Vec<&str> = family.spouses.iter().map(|s| name_of(data, s)).collect();
    let children: Vec<&str> = family.children.iter().map(|c| name_of(data, c)).collect();
    format!(
        "{} {} [{}] -> [{}]",
        family.id,
        family.label,
        spouses.join(" + "),
        children.join(", ")
    )
}

fn print_people(heading: &str, people: &[&Person]) {
    if people.is_empty() {
        println!("  {heading}: -");
    } else {
        let lines: Vec<String> = people.iter().map(|p| person_line(p)).collect();
        println!("  {heading}: {}", lines.join("; "));
    }
}

fn print_tree(data: &TreeData) {
    if data.people.is_empty() && data.families.is_empty() {
        println!("The tree is empty. Add people with `vtree tree person add` or load `vtree tree demo --yes`.");
        return;
    }
    println!("People ({})", data.people.len());
    for person in &data.people {
        println!("  {}", person_line(person));
    }
    println!();
    println!("Families ({})", data.families.len());
    for family in &data.families {
        println!("  {}", describe_family(data, family));
    }
}

// === Configuration ===

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let mut shown = config.clone();
            if shown.insights.api_key.is_some() {
                shown.insights.api_key = Some("********".to_string());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Insights]");
                println!("  Model:              {}", shown.insights.model);
                println!("  Endpoint:           {}", shown.insights.endpoint);
                println!(
                    "  Timeout (secs):     {}",
                    shown.insights.request_timeout_secs
                );
                println!(
                    "  API key:            {}",
                    if config.insights.resolved_api_key().is_some() {
                        "configured"
                    } else {
                        "not set"
                    }
                );
                println!();
                println!("[Genealogy]");
                println!(
                    "  Seed demo on empty: {}",
                    shown.genealogy.seed_demo_on_empty
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
