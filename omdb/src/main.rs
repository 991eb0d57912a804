//! terraform-provider-omdb - drives the OMDb provider from the command line

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context as _};
use clap::{Args, Parser, Subcommand};
use omdb::config::{
    ATTR_API_BASE_URL, ATTR_API_KEY, ATTR_LOCAL_DIR, ENV_API_BASE_URL, ENV_API_KEY, ENV_LOCAL_DIR,
};
use omdb::models::{ratings_to_dynamic, Rating, ATTR_ID, ATTR_IMDB_ID, ATTR_RATINGS, ATTR_TITLE, ATTR_YEAR};
use omdb::OmdbProvider;
use tfplug::types::{AttributePath, Diagnostic, DiagnosticsExt, DynamicValue};
use tfplug::ProviderServer;
use tracing_subscriber::EnvFilter;

const FILM_DATA_SOURCE: &str = "omdb_film_by_id";
const FILM_RESOURCE: &str = "omdb_film";

#[derive(Parser)]
#[command(name = "terraform-provider-omdb")]
#[command(author, version, about = "Look up films on OMDb and manage local film records")]
#[command(propagate_version = true)]
struct Cli {
    /// OMDb API key
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,

    /// OMDb API base URL
    #[arg(long, global = true, env = ENV_API_BASE_URL)]
    api_base_url: Option<String>,

    /// Directory holding film resource files
    #[arg(long, global = true, env = ENV_LOCAL_DIR)]
    local_dir: Option<PathBuf>,

    /// Log filter, e.g. "info" or "omdb=debug"
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a film by IMDb id
    Lookup {
        /// IMDb id, e.g. tt0111161
        imdb_id: String,
    },

    /// Create a film record
    Create(FilmArgs),

    /// Show a film record
    Read {
        /// Film record id
        id: String,
    },

    /// Replace the contents of a film record
    Update {
        /// Film record id
        id: String,

        #[command(flatten)]
        film: FilmArgs,
    },

    /// Delete a film record
    Delete {
        /// Film record id
        id: String,
    },
}

#[derive(Args)]
struct FilmArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    year: String,

    /// Rating as SOURCE=VALUE; may be repeated
    #[arg(long = "rating", value_parser = parse_rating)]
    ratings: Vec<Rating>,
}

fn parse_rating(raw: &str) -> Result<Rating, String> {
    match raw.split_once('=') {
        Some((source, value)) if !source.is_empty() => Ok(Rating::new(source, value)),
        _ => Err(format!("expected SOURCE=VALUE, got {:?}", raw)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let provider = OmdbProvider::new(
        env!("CARGO_PKG_VERSION"),
        option_env!("OMDB_BUILD_COMMIT").unwrap_or("unknown"),
    );
    let server = ProviderServer::new(provider);

    let diagnostics = server.configure_provider(provider_config(&cli)?).await;
    check(&diagnostics).context("configuring provider")?;

    let state = match cli.command {
        Command::Lookup { imdb_id } => {
            let mut config = DynamicValue::object();
            config.set_string(&AttributePath::new(ATTR_IMDB_ID), imdb_id)?;
            let response = server.read_data_source(FILM_DATA_SOURCE, config).await;
            check(&response.diagnostics).context("looking up film")?;
            Some(response.state)
        }
        Command::Create(film) => {
            let config = film_config(film)?;
            let prior = DynamicValue::null();
            let plan = server
                .plan_resource_change(FILM_RESOURCE, prior.clone(), config.clone())
                .await;
            check(&plan.diagnostics).context("planning film")?;
            let applied = server
                .apply_resource_change(FILM_RESOURCE, prior, plan.planned_state, config)
                .await;
            check(&applied.diagnostics).context("creating film")?;
            Some(applied.new_state)
        }
        Command::Read { id } => {
            let response = server.read_resource(FILM_RESOURCE, id_state(id)?).await;
            check(&response.diagnostics).context("reading film")?;
            response.new_state
        }
        Command::Update { id, film } => {
            let prior = current_state(&server, id).await?;
            let config = film_config(film)?;
            let plan = server
                .plan_resource_change(FILM_RESOURCE, prior.clone(), config.clone())
                .await;
            check(&plan.diagnostics).context("planning film")?;
            if !plan.requires_replace.is_empty() {
                bail!("update would replace the film record");
            }
            let applied = server
                .apply_resource_change(FILM_RESOURCE, prior, plan.planned_state, config)
                .await;
            check(&applied.diagnostics).context("updating film")?;
            Some(applied.new_state)
        }
        Command::Delete { id } => {
            let prior = current_state(&server, id).await?;
            let plan = server
                .plan_resource_change(FILM_RESOURCE, prior.clone(), DynamicValue::null())
                .await;
            check(&plan.diagnostics).context("planning film deletion")?;
            let applied = server
                .apply_resource_change(
                    FILM_RESOURCE,
                    prior,
                    plan.planned_state,
                    DynamicValue::null(),
                )
                .await;
            check(&applied.diagnostics).context("deleting film")?;
            None
        }
    };

    let json = match state {
        Some(state) => String::from_utf8(state.encode_json()?)?,
        None => "null".to_string(),
    };
    println!("{}", json);
    Ok(())
}

fn provider_config(cli: &Cli) -> anyhow::Result<DynamicValue> {
    let mut config = DynamicValue::object();
    if let Some(key) = &cli.api_key {
        config.set_string(&AttributePath::new(ATTR_API_KEY), key.clone())?;
    }
    if let Some(url) = &cli.api_base_url {
        config.set_string(&AttributePath::new(ATTR_API_BASE_URL), url.clone())?;
    }
    if let Some(dir) = &cli.local_dir {
        let dir = dir
            .to_str()
            .ok_or_else(|| anyhow!("local dir {} is not valid UTF-8", dir.display()))?;
        config.set_string(&AttributePath::new(ATTR_LOCAL_DIR), dir.to_string())?;
    }
    Ok(config)
}

fn film_config(film: FilmArgs) -> anyhow::Result<DynamicValue> {
    let mut config = DynamicValue::object();
    config.set_null(&AttributePath::new(ATTR_ID))?;
    config.set_string(&AttributePath::new(ATTR_TITLE), film.title)?;
    config.set_string(&AttributePath::new(ATTR_YEAR), film.year)?;
    if film.ratings.is_empty() {
        config.set_null(&AttributePath::new(ATTR_RATINGS))?;
    } else {
        config.set_value(
            &AttributePath::new(ATTR_RATINGS),
            ratings_to_dynamic(&film.ratings),
        )?;
    }
    Ok(config)
}

fn id_state(id: String) -> anyhow::Result<DynamicValue> {
    let mut state = DynamicValue::object();
    state.set_string(&AttributePath::new(ATTR_ID), id)?;
    Ok(state)
}

/// Refreshed state of an existing film record
async fn current_state(
    server: &ProviderServer<OmdbProvider>,
    id: String,
) -> anyhow::Result<DynamicValue> {
    let response = server.read_resource(FILM_RESOURCE, id_state(id.clone())?).await;
    check(&response.diagnostics).context("reading film")?;
    response
        .new_state
        .ok_or_else(|| anyhow!("film {} does not exist", id))
}

/// Prints every diagnostic and fails if any of them is an error
fn check(diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
    if diagnostics.has_errors() {
        let first = diagnostics
            .iter()
            .find(|d| d.is_error())
            .map(|d| d.summary.clone())
            .unwrap_or_default();
        bail!("{}", first);
    }
    Ok(())
}
