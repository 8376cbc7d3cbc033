//! Quest Bound Engine - command line entry point.
//!
//! Loads a ruleset fixture into memory and drives the script runtime:
//!
//! ```text
//! questbound-engine <fixture.json> graph
//! questbound-engine <fixture.json> run <script> <character> [target]
//! questbound-engine <fixture.json> change <attribute> <character> [target]
//! ```
//!
//! Results are printed as JSON. Nothing is written back to the fixture.

use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questbound_domain::{CharacterId, RulesetId};
use questbound_engine::infrastructure::{memory::MemoryStore, settings::RuntimeSettings};
use questbound_engine::reactive::{CycleReport, DependencyNode};
use questbound_engine::App;

const USAGE: &str = "usage: questbound-engine <fixture.json> (graph | run <script> <character> [target] | change <attribute> <character> [target])";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root so QBSCRIPT_* overrides apply.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "questbound_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((fixture, command)) = args.split_first() else {
        bail!(USAGE);
    };

    let settings = RuntimeSettings::from_env();
    tracing::debug!(?settings, "Runtime settings");

    let store = Arc::new(
        MemoryStore::from_file(fixture)
            .await
            .with_context(|| format!("loading fixture {}", fixture))?,
    );
    let app = App::in_memory(store.clone(), settings);

    match command {
        [cmd] if cmd == "graph" => print_graphs(&app, &store).await,
        [cmd, script, character, rest @ ..] if cmd == "run" && rest.len() <= 1 => {
            let script = store
                .find_script(script)
                .await
                .with_context(|| format!("no script named '{}'", script))?;
            let owner = character_id(&store, character).await?;
            let target = optional_character(&store, rest.first()).await?;
            let result = app
                .use_cases
                .scripts
                .execute_script
                .execute(owner, script.id, None, target)
                .await?;
            print_json(&result)
        }
        [cmd, attribute, character, rest @ ..] if cmd == "change" && rest.len() <= 1 => {
            let owner = store
                .find_character(character)
                .await
                .with_context(|| format!("no character named '{}'", character))?;
            let attribute = store
                .find_attribute(owner.ruleset_id, attribute)
                .await
                .with_context(|| format!("no attribute titled '{}'", attribute))?;
            let target = optional_character(&store, rest.first()).await?;
            let result = app
                .use_cases
                .scripts
                .propagate
                .execute(owner.id, attribute.id, target)
                .await?;
            print_json(&result)
        }
        _ => bail!(USAGE),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphSummary {
    ruleset_id: RulesetId,
    nodes: Vec<DependencyNode>,
    cycles: CycleReport,
}

async fn print_graphs(app: &App, store: &MemoryStore) -> anyhow::Result<()> {
    let mut summaries = Vec::new();
    for ruleset_id in store.ruleset_ids().await {
        let graph = app.use_cases.scripts.build_graph.rebuild(ruleset_id).await?;
        summaries.push(GraphSummary {
            ruleset_id,
            nodes: graph.nodes().to_vec(),
            cycles: graph.detect_cycles(),
        });
    }
    print_json(&summaries)
}

async fn character_id(store: &MemoryStore, name: &str) -> anyhow::Result<CharacterId> {
    store
        .find_character(name)
        .await
        .map(|character| character.id)
        .with_context(|| format!("no character named '{}'", name))
}

async fn optional_character(
    store: &MemoryStore,
    name: Option<&String>,
) -> anyhow::Result<Option<CharacterId>> {
    match name {
        Some(name) => Ok(Some(character_id(store, name).await?)),
        None => Ok(None),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
