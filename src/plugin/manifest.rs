use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginId(pub String);

impl PluginId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Contents of a plugin's `plugin.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    pub entry: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default_to_none() {
        let manifest: PluginManifest = toml::from_str(
            r#"
name = "csv-export"
version = "1.2.0"
entry = "csv_export.wasm"
"#,
        )
        .unwrap();

        assert_eq!(manifest.name, "csv-export");
        assert!(manifest.description.is_none());
        assert!(manifest.author.is_none());
    }

    #[test]
    fn entry_is_required() {
        let result = toml::from_str::<PluginManifest>("name = \"x\"\nversion = \"1\"\n");

        assert!(result.is_err());
    }
}
