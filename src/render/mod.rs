use anyhow::{Context as _, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tera::{Context, Tera};

use crate::models::platform;

/// Named substitution values handed to a template
pub type Bindings = BTreeMap<String, serde_json::Value>;

/// Interface configuration for Arista EOS
pub const EOS_INTERFACE_TEMPLATE: &str =
    "interface Ethernet1\nno switchport\nip address {{ ip_address }}\nno shutdown";

/// Extension of per-platform template files in the templates directory
const TEMPLATE_EXTENSION: &str = "tera";

/// Renders a template string against a set of bindings
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, bindings: &Bindings) -> Result<String>;
}

/// Tera-backed renderer. Templates are added raw, so nothing is autoescaped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeraRenderer;

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: &str, bindings: &Bindings) -> Result<String> {
        let mut tera = Tera::default();
        tera.add_raw_template("template", template)
            .map_err(|e| anyhow::anyhow!("Invalid template: {}", e))?;

        let mut context = Context::new();
        for (name, value) in bindings {
            context.insert(name.as_str(), value);
        }

        tera.render("template", &context)
            .map_err(|e| anyhow::anyhow!("Template rendering failed: {}", render_cause(&e)))
    }
}

/// Tera's top-level message only names the template; the useful part is in the source chain
fn render_cause(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message = format!("{}: {}", message, cause);
        source = std::error::Error::source(cause);
    }
    message
}

/// Interface templates keyed by platform
#[derive(Debug, Clone)]
pub struct PlatformTemplates {
    templates: HashMap<String, String>,
}

impl PlatformTemplates {
    /// Built-in templates only
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(platform::EOS.to_string(), EOS_INTERFACE_TEMPLATE.to_string());
        Self { templates }
    }

    /// Built-in templates, overridden by `<platform>.tera` files in `dir` when it is set
    pub async fn load(dir: &str) -> Result<Self> {
        let mut templates = Self::builtin();
        if dir.is_empty() {
            return Ok(templates);
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read templates dir {}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_template_file(&path) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            tracing::debug!("Loaded {} template from {}", name, path.display());
            templates.insert(&name, &content);
        }

        Ok(templates)
    }

    pub fn insert(&mut self, platform: &str, template: &str) {
        self.templates.insert(platform.to_string(), template.to_string());
    }

    pub fn get(&self, platform: &str) -> Option<&str> {
        self.templates.get(platform).map(String::as_str)
    }

    pub fn platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Whether a path looks like a per-platform template file
pub fn is_template_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_eos_template() {
        let mut bindings = Bindings::new();
        bindings.insert("ip_address".into(), json!("10.0.0.1/24"));

        let rendered = TeraRenderer.render(EOS_INTERFACE_TEMPLATE, &bindings).unwrap();
        assert_eq!(
            rendered,
            "interface Ethernet1\nno switchport\nip address 10.0.0.1/24\nno shutdown"
        );
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut bindings = Bindings::new();
        bindings.insert("desc".into(), json!("<uplink> & \"core\""));
        let rendered = TeraRenderer.render("description {{ desc }}", &bindings).unwrap();
        assert_eq!(rendered, "description <uplink> & \"core\"");
    }

    #[test]
    fn test_invalid_template() {
        let err = TeraRenderer.render("{% if %}", &Bindings::new()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid template"));
    }

    #[test]
    fn test_missing_binding() {
        let err = TeraRenderer.render("{{ nope }}", &Bindings::new()).unwrap_err();
        assert!(err.to_string().starts_with("Template rendering failed"));
    }

    #[test]
    fn test_builtin_templates() {
        let templates = PlatformTemplates::builtin();
        assert_eq!(templates.get("eos"), Some(EOS_INTERFACE_TEMPLATE));
        assert!(templates.get("junos").is_none());
        assert_eq!(templates.platforms(), vec!["eos"]);
    }

    #[tokio::test]
    async fn test_load_without_dir_is_builtin() {
        let templates = PlatformTemplates::load("").await.unwrap();
        assert_eq!(templates.platforms(), vec!["eos"]);
    }

    #[tokio::test]
    async fn test_load_overrides_from_dir() {
        let dir = std::env::temp_dir().join(format!("forge-lab-templates-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("eos.tera"), "interface Ethernet2\nip address {{ ip_address }}")
            .await
            .unwrap();
        tokio::fs::write(dir.join("ios.tera"), "ip address {{ ip_address }}").await.unwrap();
        tokio::fs::write(dir.join("README"), "not a template").await.unwrap();

        let templates = PlatformTemplates::load(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(templates.platforms(), vec!["eos", "ios"]);
        assert!(templates.get("eos").unwrap().starts_with("interface Ethernet2"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_is_template_file() {
        assert!(is_template_file(Path::new("/t/eos.tera")));
        assert!(!is_template_file(Path::new("/t/eos.j2")));
    }
}
