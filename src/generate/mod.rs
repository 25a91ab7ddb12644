//! Config generation: template rendering, normalization and file output.

mod normalize;
mod writer;

pub use normalize::normalize;
pub use writer::write_config_file;

use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::error::GenerateError;
use crate::models::DeviceRecord;

const TEMPLATE_NAME: &str = "device";

/// TemplateRenderer holds the parsed device template
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Load and parse the template file
    pub async fn load(path: &Path) -> Result<Self, GenerateError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                GenerateError::TemplateNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GenerateError::TemplateRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        tracing::info!("Loaded template {}", path.display());
        Self::from_source(&content)
    }

    /// Build a renderer from template source
    pub fn from_source(content: &str) -> Result<Self, GenerateError> {
        let mut tera = Tera::default();
        // Device configs are plain text
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, content)
            .map_err(|e| GenerateError::TemplateSyntax(error_chain(&e)))?;
        Ok(Self { tera })
    }

    /// Render the template for one device. Exposes HOSTNAME and HOST_DICT.
    pub fn render(
        &self,
        hostname: &str,
        attributes: &serde_json::Value,
    ) -> Result<String, GenerateError> {
        let mut context = Context::new();
        context.insert("HOSTNAME", hostname);
        context.insert("HOST_DICT", attributes);

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| GenerateError::TemplateRender {
                hostname: hostname.to_string(),
                message: error_chain(&e),
            })
    }
}

/// Render, normalize and write the config file for one device
pub async fn generate_config(
    renderer: &TemplateRenderer,
    output_dir: &Path,
    device: &DeviceRecord,
) -> Result<PathBuf, GenerateError> {
    let rendered = renderer.render(&device.hostname, &device.attributes)?;
    let lines = normalize(&rendered);
    write_config_file(output_dir, &device.hostname, &lines).await
}

/// Tera nests the useful message in the source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
