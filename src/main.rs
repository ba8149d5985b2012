//! scopecache - inspect the cache keys used by the dashboard.
//!
//! Prints the storage key and invalidation tag for a kind and scope, using
//! the prefixes from the environment, so they can be looked up in a live
//! cache.
//!
//! ```text
//! scopecache kinds
//! scopecache subject favorites user-42
//! scopecache group contact org-7 contact-99
//! scopecache acting-user leads user-42
//! ```

use anyhow::bail;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use scopecache::config::Config;
use scopecache::keys::{CacheKeyRegistry, CacheKind, GroupKind, SubjectKind};

const USAGE: &str = "usage: scopecache <kinds | subject | group | acting-user> [kind] [scope-id] [extra...]";

fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scopecache=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    info!("Environment: {:?}", config.env);
    debug!("Key prefixes: {:?}", config.key_prefixes);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let registry = CacheKeyRegistry::with_prefixes(config.key_prefixes);

    let output = run(&registry, &args)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn run(registry: &CacheKeyRegistry, args: &[String]) -> anyhow::Result<serde_json::Value> {
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    if command == "kinds" {
        return Ok(json!({
            "subject": SubjectKind::ALL.iter().map(|k| k.token()).collect::<Vec<_>>(),
            "group": GroupKind::ALL.iter().map(|k| k.token()).collect::<Vec<_>>(),
        }));
    }

    let (Some(kind), Some(scope_id)) = (args.get(1), args.get(2)) else {
        bail!(USAGE);
    };
    let extra: Vec<&str> = args[3..].iter().map(String::as_str).collect();

    let key = match command.as_str() {
        "subject" => registry.subject_key(kind.parse()?, scope_id, &extra)?,
        "group" => registry.group_key(kind.parse()?, scope_id, &extra)?,
        "acting-user" => {
            registry.group_key_scoped_to_acting_user(kind.parse()?, scope_id, &extra)?
        }
        other => bail!("unknown family '{}'\n{}", other, USAGE),
    };

    Ok(json!({ "key": key, "tag": key.to_tag() }))
}
