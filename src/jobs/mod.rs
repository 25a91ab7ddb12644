use std::path::PathBuf;

use crate::error::GenerateError;
use crate::generate::{generate_config, TemplateRenderer};
use crate::models::*;
use crate::session::Provisioner;

/// BatchRunner generates config files for a whole inventory and, when the
/// inventory asks for it, pushes them to the devices one at a time
pub struct BatchRunner<P: Provisioner> {
    renderer: TemplateRenderer,
    output_dir: PathBuf,
    provisioner: P,
}

impl<P: Provisioner> BatchRunner<P> {
    pub fn new(renderer: TemplateRenderer, output_dir: PathBuf, provisioner: P) -> Self {
        Self {
            renderer,
            output_dir,
            provisioner,
        }
    }

    /// Run the batch. Only generation errors are returned; push failures are
    /// per-device outcomes in the report.
    pub async fn run(
        &self,
        inventory: &Inventory,
        credentials: &Credentials,
    ) -> Result<BatchReport, GenerateError> {
        let mut report = BatchReport {
            config_files: self.generate_all(inventory).await?,
            devices: Vec::new(),
        };

        if !inventory.configure {
            tracing::info!("configure is false, skipping push to {} devices", inventory.devices.len());
            return Ok(report);
        }

        for device in &inventory.devices {
            let Some(config_file) = report.config_file(&device.hostname).cloned() else {
                continue;
            };
            let outcome = self
                .provisioner
                .push(device, &config_file, credentials)
                .await;
            let line = DeviceReport {
                hostname: device.hostname.clone(),
                outcome,
            };
            println!("{}", line);
            report.devices.push(line);
        }

        tracing::info!(
            "Push finished: {} configured, {} not configured",
            report.configured_count(),
            report.failed_count()
        );
        Ok(report)
    }

    /// Generation phase. The first failing device aborts the run.
    async fn generate_all(
        &self,
        inventory: &Inventory,
    ) -> Result<Vec<(String, PathBuf)>, GenerateError> {
        let mut config_files = Vec::with_capacity(inventory.devices.len());
        for device in &inventory.devices {
            let path = generate_config(&self.renderer, &self.output_dir, device).await?;
            tracing::info!("Generated {} for {}", path.display(), device.hostname);
            config_files.push((device.hostname.clone(), path));
        }
        Ok(config_files)
    }
}
