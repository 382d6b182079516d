use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use strata_sdk::{ContentHasher, Commit, Database, DatabaseConfig, Hash, State};

use crate::cli::{Cli, Command, GetArgs, HashArg, LogArgs, OutputFormat, PutArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let db = open_database(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Put(args) => cmd_put(&db, args, format),
        Command::Get(args) => cmd_get(&db, args, format),
        Command::Head => cmd_head(&db, format),
        Command::Log(args) => cmd_log(&db, args, format),
        Command::State(args) => cmd_state(&db, args, format),
        Command::Commits => cmd_commits(&db, format),
        Command::Show(args) => cmd_show(&db, args, format),
        Command::Rollback(args) => cmd_rollback(&db, args, format),
    }
}

/// Application databases are named by the hash of the application name.
pub fn application_hash(name: &str) -> Hash {
    ContentHasher::APPLICATION.hash(name.as_bytes())
}

fn open_database(cli: &Cli) -> anyhow::Result<Database> {
    let mut config = match &cli.config {
        Some(path) => DatabaseConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DatabaseConfig::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    let application = application_hash(&cli.app);
    tracing::debug!(app = %cli.app, application = %application, "opening database");
    Database::open(&config, &application)
        .with_context(|| format!("opening database for application '{}'", cli.app))
}

fn cmd_put(db: &Database, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let tx = db.transactions();
    let ctx = tx.begin();
    let mut keys = Vec::with_capacity(args.values.len());
    for value in args.values {
        let key = Hash::from_bytes(value.as_bytes());
        tx.insert(&ctx, args.namespace.as_str(), key, value.into_bytes())?;
        keys.push(key);
    }
    let commit = tx.commit(&ctx)?;
    let head = if args.no_push { None } else { Some(tx.push(&ctx)?) };

    match format {
        OutputFormat::Json => {
            let report = json!({
                "namespace": args.namespace,
                "keys": keys.iter().map(Hash::to_hex).collect::<Vec<_>>(),
                "commit": commit.to_hex(),
                "head": head.as_ref().map(|state| state.hash().to_hex()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for key in &keys {
                println!("  {} {}/{}", "+".green(), args.namespace, key);
            }
            println!("{} Committed {}", "✓".green().bold(), commit.to_string().yellow());
            match head {
                Some(state) => println!(
                    "{} Pushed head {} (height {})",
                    "✓".green().bold(),
                    state.hash().to_string().yellow(),
                    state.height()
                ),
                None => println!("  commit left in the commit log"),
            }
        }
    }
    Ok(())
}

fn cmd_get(db: &Database, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let resource = db.queries().get(&args.namespace, &args.key)?;
    let value = String::from_utf8_lossy(resource.value());
    match format {
        OutputFormat::Json => {
            let pointer = resource.pointer();
            let report = json!({
                "namespace": pointer.namespace(),
                "key": resource.key().to_hex(),
                "index": pointer.index(),
                "length": pointer.length(),
                "value": value,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => println!("{value}"),
    }
    Ok(())
}

fn cmd_head(db: &Database, format: OutputFormat) -> anyhow::Result<()> {
    let head = db.queries().head()?;
    match (format, head) {
        (OutputFormat::Json, head) => {
            let report = head.as_ref().map(state_json).unwrap_or(serde_json::Value::Null);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        (OutputFormat::Text, None) => println!("{}", "No head state".dimmed()),
        (OutputFormat::Text, Some(state)) => print_state(&state),
    }
    Ok(())
}

fn cmd_log(db: &Database, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let Some(head) = db.queries().head()? else {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Text => println!("{}", "No head state".dimmed()),
        }
        return Ok(());
    };
    let states: Vec<State> = head.history().take(args.limit).collect();
    match format {
        OutputFormat::Json => {
            let report: Vec<_> = states.iter().map(state_json).collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for state in &states {
                println!(
                    "{} {} {} pointers",
                    state.hash().short_hex().yellow(),
                    state.created_at().format("%Y-%m-%d %H:%M:%S%.3f"),
                    state.pointers().len()
                );
            }
        }
    }
    Ok(())
}

fn cmd_state(db: &Database, args: HashArg, format: OutputFormat) -> anyhow::Result<()> {
    let state = db.queries().state(&args.hash)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state_json(&state))?),
        OutputFormat::Text => print_state(&state),
    }
    Ok(())
}

fn cmd_commits(db: &Database, format: OutputFormat) -> anyhow::Result<()> {
    let commits = db.queries().commits()?;
    match format {
        OutputFormat::Json => {
            let report: Vec<_> = commits.iter().map(Hash::to_hex).collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text if commits.is_empty() => println!("{}", "Commit log is empty".dimmed()),
        OutputFormat::Text => {
            for hash in &commits {
                println!("{hash}");
            }
        }
    }
    Ok(())
}

fn cmd_show(db: &Database, args: HashArg, format: OutputFormat) -> anyhow::Result<()> {
    let commit = db.queries().commit(&args.hash)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&commit_json(&commit))?),
        OutputFormat::Text => {
            println!("{} {}", "commit".bold(), commit.hash().to_string().yellow());
            println!("created: {}", commit.created_at().to_rfc3339());
            for value in commit.values() {
                println!(
                    "  {}/{} {}",
                    value.namespace(),
                    value.resource().short_hex(),
                    String::from_utf8_lossy(value.data())
                );
            }
        }
    }
    Ok(())
}

fn cmd_rollback(db: &Database, args: HashArg, format: OutputFormat) -> anyhow::Result<()> {
    db.transactions().rollback(&args.hash)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "rolled_back": args.hash.to_hex() })),
        OutputFormat::Text => {
            println!("{} Rolled back {}", "✓".green().bold(), args.hash.to_string().yellow())
        }
    }
    Ok(())
}

fn print_state(state: &State) {
    println!("{} {}", "state".bold(), state.hash().to_string().yellow());
    println!("height:   {}", state.height());
    println!("created:  {}", state.created_at().to_rfc3339());
    if let Some(previous) = state.previous_hash() {
        println!("previous: {previous}");
    }
    println!("pointers: {}", state.pointers().len());
    for pointer in state.pointers() {
        println!(
            "  {}/{} @{}+{}",
            pointer.namespace(),
            pointer.resource().short_hex(),
            pointer.index(),
            pointer.length()
        );
    }
}

fn state_json(state: &State) -> serde_json::Value {
    json!({
        "hash": state.hash().to_hex(),
        "height": state.height(),
        "created_on": state.created_on(),
        "created_at": state.created_at().to_rfc3339(),
        "previous": state.previous_hash().map(Hash::to_hex),
        "pointers": state.pointers().iter().map(|pointer| json!({
            "namespace": pointer.namespace(),
            "resource": pointer.resource().to_hex(),
            "index": pointer.index(),
            "length": pointer.length(),
        })).collect::<Vec<_>>(),
    })
}

fn commit_json(commit: &Commit) -> serde_json::Value {
    json!({
        "hash": commit.hash().to_hex(),
        "created_on": commit.created_on(),
        "values": commit.values().iter().map(|value| json!({
            "namespace": value.namespace(),
            "resource": value.resource().to_hex(),
            "data": String::from_utf8_lossy(value.data()),
        })).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(base: &std::path::Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["strata", "--base-dir", base.to_str().unwrap(), "--app", "cli-test"];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    fn open(base: &std::path::Path) -> Database {
        Database::open(&DatabaseConfig::new(base), &application_hash("cli-test")).unwrap()
    }

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["put", "users", "alice", "bob"]).unwrap();

        let db = open(dir.path());
        let key = Hash::from_bytes(b"alice");
        assert_eq!(db.queries().get("users", &key).unwrap().value(), b"alice");
        assert!(db.queries().commits().unwrap().is_empty());

        run(dir.path(), &["get", "users", key.to_hex().as_str()]).unwrap();
        run(dir.path(), &["--format", "json", "log"]).unwrap();
        run(dir.path(), &["head"]).unwrap();
    }

    #[test]
    fn unpushed_commit_can_be_shown_and_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["put", "users", "carol", "--no-push"]).unwrap();

        let db = open(dir.path());
        let commits = db.queries().commits().unwrap();
        assert_eq!(commits.len(), 1);
        assert!(db.queries().head().unwrap().is_none());

        let hex = commits[0].to_hex();
        run(dir.path(), &["show", hex.as_str()]).unwrap();
        run(dir.path(), &["rollback", hex.as_str()]).unwrap();
        assert!(db.queries().commits().unwrap().is_empty());
    }

    #[test]
    fn get_without_head_fails() {
        let dir = tempfile::tempdir().unwrap();
        let key = Hash::from_bytes(b"nobody").to_hex();
        assert!(run(dir.path(), &["get", "users", key.as_str()]).is_err());
    }

    #[test]
    fn applications_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["put", "users", "dave"]).unwrap();
        let other = Database::open(&DatabaseConfig::new(dir.path()), &application_hash("other")).unwrap();
        assert!(other.queries().head().unwrap().is_none());
    }
}
