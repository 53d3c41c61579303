//! Offline maintenance for the JSON data file: create it, inspect it,
//! restore a backup or load demo content.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde_json::json;
use tracing::{error, info};

use configs::AppConfig;
use models::property::{ListingType, PropertyInput, SceneInput};
use models::user::User;
use service::admin::AdminService;
use service::auth::{AuthError, AuthService, AuthSettings, RegisterInput};
use service::properties::PropertyService;
use service::site::SiteService;
use service::storage::DocumentStore;
use service::users::UserService;

const DEMO_EMAIL: &str = "ahmet.demo@360ev.com";
const DEMO_PASSWORD: &str = "demo123";

#[derive(Parser)]
#[command(name = "store-admin")]
#[command(about = "360 Emlak data file maintenance")]
struct Cli {
    /// Overrides `store.data_file` from config.toml.
    #[arg(long, global = true)]
    data_file: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the data file (and its directory) if missing.
    Init,
    /// Print record counters as JSON.
    Stats,
    /// List backups, newest first.
    Backups,
    /// Replace the data file with a backup from the backup directory.
    Restore { file: String },
    /// Load default categories, cities and a demo listing with a tour.
    Seed,
}

fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(event = "config_invalid", error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(&cfg.app.log_format);

    match run(cli, cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "store-admin failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mut cfg: AppConfig) -> Result<()> {
    if let Some(path) = cli.data_file {
        cfg.store.data_file = path;
    }
    let store = DocumentStore::from_config(&cfg.store).context("opening data file")?;

    match cli.command {
        Command::Init => {
            info!(data_file = %store.path().display(), "data file ready");
        }
        Command::Stats => {
            let stats = AdminService::new(store.clone()).stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Backups => {
            for name in store.list_backups() {
                println!("{name}");
            }
        }
        Command::Restore { file } => {
            if !store.restore_from_backup(&file)? {
                return Err(anyhow!("no usable backup named {file} in {}", store.backup_dir().display()));
            }
            info!(backup = %file, "data restored");
        }
        Command::Seed => seed(store, &cfg)?,
    }
    Ok(())
}

fn seed(store: Arc<DocumentStore>, cfg: &AppConfig) -> Result<()> {
    let site = SiteService::new(store.clone());
    if site.seed_defaults()? {
        info!("default categories and cities written");
    }

    let owner = demo_user(&store, cfg)?;
    let properties = PropertyService::new(store.clone(), cfg.uploads.allowed_extensions.clone());
    let input = PropertyInput {
        title: "Denizli Pamukkale 3+1 Satılık Bahçeli Villa".into(),
        description: "Pamukkale travertenlerine on dakika mesafede, bahçeli, müstakil girişli ve 360 derece sanal turlu villa.".into(),
        category: "residential".into(),
        listing_type: ListingType::Sale,
        price: 4_750_000,
        city: "Denizli".into(),
        district: "Pamukkale".into(),
        address: "Karahayıt Mah. Termal Cad. No: 12".into(),
        area: 210,
        rooms: Some("3+1".into()),
        floor: Some("Bahçe".into()),
        building_age: Some(3),
        images: Vec::new(),
    };
    let property = properties.create(&owner, input)?;
    for (name, filename) in [("Salon", "demo_salon.jpg"), ("Mutfak", "demo_mutfak.jpg")] {
        properties.add_scene(
            &owner,
            &property.id,
            SceneInput {
                name: name.into(),
                filename: filename.into(),
                thumbnail: String::new(),
                width: 4096,
                height: 2048,
                size: 0,
            },
        )?;
    }
    properties.save_hotspots(&owner, &property.id, vec![json!({"from": "Salon", "to": "Mutfak", "pitch": 0, "yaw": 90})])?;
    let published = properties.publish(&owner, &property.id)?;
    info!(property_id = %published.id, owner = %owner.email, "demo listing published");
    Ok(())
}

/// Register the demo account, or reuse it when an earlier seed created it.
fn demo_user(store: &Arc<DocumentStore>, cfg: &AppConfig) -> Result<User> {
    let auth = AuthService::new(store.clone(), AuthSettings::from(&cfg.auth));
    let users = UserService::new(store.clone());
    let input = RegisterInput {
        email: DEMO_EMAIL.into(),
        name: "Ahmet Yılmaz".into(),
        phone: "0258 212 00 00".into(),
        password: DEMO_PASSWORD.into(),
    };
    match auth.register(input) {
        Ok(user) => info!(user_id = %user.id, email = DEMO_EMAIL, "demo user created"),
        Err(AuthError::Conflict) => info!(email = DEMO_EMAIL, "demo user already exists"),
        Err(e) => return Err(e.into()),
    }
    users.get_by_email(DEMO_EMAIL)?.ok_or_else(|| anyhow!("demo user vanished after registration"))
}
