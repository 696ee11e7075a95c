use anyhow::{Context, Result};
use armkit::arm::{format_arm_error, ArmClient, CachedCredential, EnvironmentCredential};
use armkit::config::Settings;
use armkit::resource::{Deletable, Listable, PageOptions, ResourceContainer, Taggable, WaitOptions};
use armkit::services::generic::{GenericResource, ResourceFilter};
use armkit::{ResourceIdentifier, ResourceType};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Command line client for the resource manager
#[derive(Parser, Debug)]
#[command(name = "armctl", version = armkit::VERSION, about, long_about = None)]
struct Args {
    /// Subscription to use (overrides config and AZURE_SUBSCRIPTION_ID)
    #[arg(short, long, global = true)]
    subscription: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose a resource id into its parts (no requests made)
    Id { id: String },
    /// Manage resource groups
    Groups {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// List resources in the subscription or a resource group
    Resources {
        /// Restrict to one resource group
        #[arg(short, long)]
        group: Option<String>,
        /// Resource type, e.g. Microsoft.Compute/virtualMachines
        #[arg(short = 't', long = "type")]
        resource_type: Option<String>,
        /// Name substring
        #[arg(short, long)]
        name: Option<String>,
        /// Tag as key or key=value
        #[arg(long)]
        tag: Option<String>,
    },
    /// List locations available to the subscription
    Locations,
    /// Remember a default subscription in the config file
    UseSubscription { id: String },
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    List,
    Delete {
        name: String,
        /// Return once the delete is accepted
        #[arg(long)]
        no_wait: bool,
    },
    Tag {
        name: String,
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG refines per-target levels, e.g. `armkit::resource::poller=trace`
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("armctl started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("armkit").join("armctl.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".armkit").join("armctl.log");
    }
    PathBuf::from("armctl.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("armctl failed: {:?}", err);
        match err.downcast_ref::<armkit::ArmError>() {
            Some(arm) => eprintln!("Error: {}", format_arm_error(arm)),
            None => eprintln!("Error: {err:?}"),
        }
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut settings = Settings::load();

    match &args.command {
        Command::Id { id } => {
            describe_id(id)?;
            return Ok(());
        }
        Command::UseSubscription { id } => {
            settings.set_subscription(id)?;
            println!("Default subscription set to {}", id);
            return Ok(());
        }
        _ => {}
    }

    let credential = Arc::new(CachedCredential::new(Arc::new(EnvironmentCredential)));
    let config = settings.client_config(credential)?;
    let mut client = ArmClient::new(config);
    if let Some(sub) = args.subscription.or(settings.subscription_id.clone()) {
        client = client.with_default_subscription(sub);
    }
    let subscription = client.resolve_default_subscription().await?;

    match args.command {
        Command::Groups { action } => match action {
            GroupAction::List => {
                let mut groups = subscription.resource_groups()?.list(PageOptions::new())?;
                while let Some(group) = groups.try_next().await? {
                    println!(
                        "{:<40} {:<16} {}",
                        group.data().name,
                        group.data().location,
                        group.data().provisioning_state().unwrap_or("-")
                    );
                }
            }
            GroupAction::Delete { name, no_wait } => {
                let group = subscription.resource_groups()?.operations(&name)?;
                let mut operation = group.start_delete().await?;
                if no_wait {
                    println!("Delete of {} accepted ({})", name, operation.state());
                } else {
                    operation.wait_for_completion(WaitOptions::default()).await?;
                    println!("Deleted {}", name);
                }
            }
            GroupAction::Tag { name, key, value } => {
                let group = subscription.resource_groups()?.operations(&name)?;
                let updated = group.add_tag(&key, &value).await?.into_value()?;
                for (k, v) in &updated.data().tags {
                    println!("{}={}", k, v);
                }
            }
        },
        Command::Resources {
            group,
            resource_type,
            name,
            tag,
        } => {
            let mut filter = ResourceFilter::new();
            if let Some(t) = resource_type {
                filter = filter.resource_type(&ResourceType::parse(&t)?);
            }
            if let Some(n) = name {
                filter = filter.name_contains(&n);
            }
            if let Some(t) = tag {
                filter = match t.split_once('=') {
                    Some((k, v)) => filter.tag(k, Some(v)),
                    None => filter.tag(&t, None),
                };
            }
            let mut resources = match group {
                Some(g) => subscription
                    .resource_groups()?
                    .operations(&g)?
                    .list_resources(filter)?,
                None => subscription.list_resources(filter)?,
            };
            while let Some(resource) = resources.try_next().await? {
                print_resource(&resource);
            }
        }
        Command::Locations => {
            let mut locations = subscription.list_locations()?;
            while let Some(location) = locations.try_next().await? {
                println!("{:<24} {}", location.name, location.display_name);
            }
        }
        Command::Id { .. } | Command::UseSubscription { .. } => {}
    }
    Ok(())
}

fn describe_id(input: &str) -> Result<()> {
    let id = ResourceIdentifier::parse(input).with_context(|| format!("parsing '{}'", input))?;
    println!("id:             {}", id);
    println!("type:           {}", id.resource_type());
    println!("name:           {}", id.name());
    if let Some(sub) = id.subscription_id() {
        println!("subscription:   {}", sub);
    }
    if let Some(rg) = id.resource_group_name() {
        println!("resource group: {}", rg);
    }
    if let Some(ns) = id.provider_namespace() {
        println!("namespace:      {}", ns);
    }
    if let Some(parent) = id.parent() {
        println!("parent:         {}", parent);
    }
    Ok(())
}

fn print_resource(resource: &GenericResource) {
    let data = resource.data();
    println!(
        "{:<32} {:<44} {}",
        data.name, data.resource_type, data.location
    );
}
