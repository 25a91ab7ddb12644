mod config;
mod error;
mod generate;
mod inventory;
mod jobs;
mod models;
mod session;
mod utils;

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use generate::TemplateRenderer;
use jobs::BatchRunner;
use models::Credentials;
use session::{SessionSettings, SshProvisioner};

/// Render device configs from template.j2 and an inventory, then push them over SSH
#[derive(Parser)]
#[command(name = "netprov", version, about)]
struct Cli {
    /// YAML inventory with a `configure` flag and a `devices` mapping.
    /// The admin password is prompted for unless NETPROV_PASSWORD is set.
    inventory: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout is reserved for the device report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netprov=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load();

    let password = match config::admin_password() {
        Some(password) => password,
        None => dialoguer::Password::new()
            .with_prompt("Enter the admin password for console servers and network devices")
            .allow_empty_password(true)
            .interact()
            .context("failed to read password")?,
    };
    let credentials = Credentials::admin(password);

    run(&cli.inventory, &cfg, &credentials).await
}

async fn run(inventory_path: &Path, cfg: &Config, credentials: &Credentials) -> anyhow::Result<()> {
    let inventory = inventory::load(inventory_path)
        .await
        .context("please pass a valid yaml file")?;

    tracing::info!("Template: {}", cfg.template_path.display());
    tracing::info!("Output dir: {}", cfg.output_dir.display());

    let settings = SessionSettings::from_config(cfg)?;
    tracing::info!("Device type: {}", settings.device_type);

    let renderer = TemplateRenderer::load(&cfg.template_path).await?;
    let runner = BatchRunner::new(renderer, cfg.output_dir.clone(), SshProvisioner::new(settings));

    runner.run(&inventory, credentials).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        let template_path = dir.join("template.j2");
        std::fs::write(&template_path, "hostname {{ HOSTNAME }}\n").unwrap();
        Config {
            template_path,
            output_dir: dir.to_path_buf(),
            ssh_port: 1,
            ssh_timeout_secs: 1,
            ..Config::default()
        }
    }

    fn artifacts(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".txt") || name.ends_with("_session.log"))
            .collect()
    }

    #[tokio::test]
    async fn test_malformed_inventory_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let inventory = dir.path().join("inventory.yml");
        std::fs::write(&inventory, "configure: [true\ndevices: {\n  sw1: {management_ip: 10.0.0.1\n").unwrap();

        let err = run(&inventory, &cfg, &Credentials::admin("pw")).await.unwrap_err();

        assert!(err.to_string().contains("please pass a valid yaml file"));
        assert!(artifacts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_device_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let inventory = dir.path().join("inventory.yml");
        std::fs::write(
            &inventory,
            "configure: true\ndevices:\n  sw1:\n    management_ip: 10.0.0.1\n  sw2:\n    management_ip: 010.0.0.2\n",
        )
        .unwrap();

        assert!(run(&inventory, &cfg, &Credentials::admin("pw")).await.is_err());
        assert!(artifacts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_generate_only_run_writes_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let inventory = dir.path().join("inventory.yml");
        std::fs::write(&inventory, "configure: no\ndevices:\n  sw1:\n    management_ip: 10.0.0.1\n").unwrap();

        run(&inventory, &cfg, &Credentials::admin("pw")).await.unwrap();

        assert_eq!(artifacts(dir.path()), vec!["sw1.txt"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("sw1.txt")).unwrap(), "hostname sw1\n");
    }

    #[test]
    fn test_password_is_not_a_flag() {
        assert!(Cli::try_parse_from(["netprov", "inventory.yml"]).is_ok());
        assert!(Cli::try_parse_from(["netprov", "inventory.yml", "--password", "pw"]).is_err());
        assert!(Cli::try_parse_from(["netprov", "inventory.yml", "pw"]).is_err());
    }
}
