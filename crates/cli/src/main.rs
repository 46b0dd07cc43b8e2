use clap::{Parser, Subcommand};
use contact::actions::{Action, FlagMessageAction, FlagOperation, MassTextAction};
use contact::auth::StaticPermissions;
use contact::config::{self, Config};
use contact::filters::{
    apply_contact_filters, AgeFilter, AgeOperator, ContactFilter, DistrictChoice, DistrictFilter,
    FreeSearchFilter, GenderChoice, GenderFilter, GroupChoice, GroupsFilter,
};
use contact::router::{BackendRegistry, HttpRouter, LogRouter, Router};
use contact::selection::{RecipientResolver, Selection};
use contact::store::{ContactRepository, LocationRepository, MemoryStore, PersistedDispatchLog};
use contact::text::{normalize_text, CharCounter};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "contact")]
#[command(about = "Contact messaging CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Show the character counter for a message.
    Count {
        text: String,
    },

    /// Print a message with typographic punctuation replaced by SMS-safe characters.
    Normalize {
        text: String,
    },

    /// Send a mass text to the given contacts through the configured SMS gateway.
    Send {
        /// Config file path (default: CONTACT_CONFIG_PATH or ~/.contact/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Operator username (must be in config users with contact.can_message).
        #[arg(long, short)]
        user: String,

        /// Contact ids, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        to: Vec<u64>,

        /// Log messages instead of posting them to the gateway.
        #[arg(long)]
        dry_run: bool,

        text: String,
    },

    /// Flag or unflag messages.
    Flag {
        /// Config file path (default: CONTACT_CONFIG_PATH or ~/.contact/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long, short)]
        user: String,

        /// Remove flags instead of adding them.
        #[arg(long)]
        unflag: bool,

        /// Message ids.
        #[arg(required = true)]
        messages: Vec<u64>,
    },

    /// List contacts, optionally filtered.
    Contacts {
        /// Config file path (default: CONTACT_CONFIG_PATH or ~/.contact/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Free-form search; wrap in quotes for whole-word matching.
        #[arg(long)]
        search: Option<String>,

        /// M, F or None.
        #[arg(long)]
        gender: Option<String>,

        /// District location id, or -1 for contacts without a district.
        #[arg(long, allow_hyphen_values = true)]
        district: Option<String>,

        /// Group ids, -1 for contacts without a group.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        group: Vec<String>,

        /// Age comparison: ==, >, < or None (no birthdate on record).
        #[arg(long)]
        age_op: Option<String>,

        /// Age in years, compared with --age-op.
        #[arg(long)]
        age: Option<String>,
    },

    /// List districts by name.
    Districts {
        /// Config file path (default: CONTACT_CONFIG_PATH or ~/.contact/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("contact {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Count { text }) => {
            run_count(&text);
            Ok(())
        }
        Some(Commands::Normalize { text }) => {
            println!("{}", normalize_text(&text));
            Ok(())
        }
        Some(Commands::Send {
            config,
            user,
            to,
            dry_run,
            text,
        }) => run_send(config, user, to, dry_run, text).await,
        Some(Commands::Flag {
            config,
            user,
            unflag,
            messages,
        }) => run_flag(config, user, unflag, messages).await,
        Some(Commands::Contacts {
            config,
            search,
            gender,
            district,
            group,
            age_op,
            age,
        }) => {
            let query = ContactQuery {
                search,
                gender,
                district,
                groups: group,
                age_op,
                age,
            };
            run_contacts(config, query).await
        }
        Some(Commands::Districts { config }) => run_districts(config).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_count(text: &str) {
    let counter = CharCounter::new(text);
    println!("{}", counter.label());
    if !counter.can_submit() {
        std::process::exit(2);
    }
}

async fn load(config_path: Option<PathBuf>) -> anyhow::Result<(Config, PathBuf, Arc<MemoryStore>)> {
    let (config, path) = config::load_config(config_path)?;
    let snapshot = config::resolve_snapshot_path(&config, &path);
    let store = Arc::new(MemoryStore::load(&snapshot).await?);
    Ok((config, snapshot, store))
}

fn print_outcome(outcome: &contact::actions::ActionOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(outcome)?);
    if !outcome.is_success() {
        anyhow::bail!("{}", outcome.message);
    }
    Ok(())
}

async fn run_send(
    config_path: Option<PathBuf>,
    username: String,
    to: Vec<u64>,
    dry_run: bool,
    text: String,
) -> anyhow::Result<()> {
    let (config, snapshot, store) = load(config_path).await?;
    let user = config::resolve_user(&config, &username);
    let permissions = Arc::new(StaticPermissions::from_codes(&config.permissions));

    let router: Arc<dyn Router> = if dry_run {
        Arc::new(LogRouter::new())
    } else {
        let http: Arc<dyn Router> = Arc::new(HttpRouter::new(
            config.router.url.clone(),
            config::resolve_router_token(&config),
        ));
        let registry = BackendRegistry::new(Some(http.clone()));
        registry.register(config.router.backend.clone(), http).await;
        Arc::new(registry)
    };

    // the dispatch record reaches disk before the first send
    let log = Arc::new(PersistedDispatchLog::new(store.clone(), snapshot));
    let action = MassTextAction::new(
        text,
        permissions,
        RecipientResolver::new(store.clone(), store.clone()),
        log,
        router,
    )
    .with_site(config.site_id);
    let outcome = action.perform(&user, &Selection::Contacts(to)).await;
    print_outcome(&outcome)
}

async fn run_flag(
    config_path: Option<PathBuf>,
    username: String,
    unflag: bool,
    messages: Vec<u64>,
) -> anyhow::Result<()> {
    let (config, snapshot, store) = load(config_path).await?;
    let user = config::resolve_user(&config, &username);
    let op = if unflag {
        FlagOperation::Unflag
    } else {
        FlagOperation::Flag
    };
    let action = FlagMessageAction::new(op, store.clone(), store.clone());
    let outcome = action.perform(&user, &Selection::Messages(messages)).await;
    if outcome.is_success() {
        store.save(&snapshot).await?;
    }
    print_outcome(&outcome)
}

/// Contact list filters as given on the command line.
struct ContactQuery {
    search: Option<String>,
    gender: Option<String>,
    district: Option<String>,
    groups: Vec<String>,
    age_op: Option<String>,
    age: Option<String>,
}

async fn run_contacts(config_path: Option<PathBuf>, query: ContactQuery) -> anyhow::Result<()> {
    let (_config, _snapshot, store) = load(config_path).await?;

    let mut filters: Vec<Box<dyn ContactFilter>> = Vec::new();
    if let Some(term) = query.search {
        filters.push(Box::new(FreeSearchFilter::new(term)));
    }
    if let Some(g) = query.gender {
        filters.push(Box::new(GenderFilter::new(g.parse::<GenderChoice>()?)));
    }
    if let Some(d) = query.district {
        filters.push(Box::new(DistrictFilter::new(
            d.parse::<DistrictChoice>()?,
            store.clone(),
        )));
    }
    if !query.groups.is_empty() {
        let choices = query
            .groups
            .iter()
            .map(|g| g.parse::<GroupChoice>())
            .collect::<Result<Vec<_>, _>>()?;
        filters.push(Box::new(GroupsFilter::new(choices)));
    }
    if let Some(op) = query.age_op {
        let age = query.age.unwrap_or_default();
        filters.push(Box::new(AgeFilter::as_of_today(
            op.parse::<AgeOperator>()?,
            &age,
        )));
    }

    let rows = apply_contact_filters(&filters, store.contact_rows().await).await;
    for r in &rows {
        println!(
            "{}\t{}\t{}\t{}",
            r.contact.id,
            r.contact.name,
            r.location.as_ref().map(|l| l.name.as_str()).unwrap_or("-"),
            r.identities.join(",")
        );
    }
    log::info!("{} contacts listed", rows.len());
    Ok(())
}

async fn run_districts(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (_config, _snapshot, store) = load(config_path).await?;
    for d in store.districts().await {
        println!("{}\t{}", d.id, d.name);
    }
    Ok(())
}
