use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::records::SourcePlatform;
use crate::ConfigError;

fn default_platforms() -> Vec<SourcePlatform> {
    vec![SourcePlatform::Reddit, SourcePlatform::YouTube]
}

/// One tracked brand. Its `name` doubles as the extraction topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    /// Extra spellings matched by the normalizer, e.g. product lines.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<SourcePlatform>,
}

impl BrandConfig {
    /// Generate a URL-safe slug from the brand name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<BrandConfig>,
}

impl BrandsFile {
    /// Extraction topics, one per brand, in file order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.brands.iter().map(|b| b.name.clone()).collect()
    }

    /// Every keyword the normalizer should match: brand names plus their
    /// configured keywords plus `extra`. Blank entries are skipped.
    #[must_use]
    pub fn keywords(&self, extra: &[String]) -> BTreeSet<String> {
        self.brands
            .iter()
            .flat_map(|b| std::iter::once(&b.name).chain(b.keywords.iter()))
            .chain(extra.iter())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Platforms configured for a topic. Unknown topics get every platform.
    #[must_use]
    pub fn platforms_for(&self, topic: &str) -> Vec<SourcePlatform> {
        self.brands
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(topic))
            .map_or_else(default_platforms, |b| b.platforms.clone())
    }
}

/// Load and validate the brands configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BrandsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_brands(&content)
}

/// Parse and validate brands YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_brands(content: &str) -> Result<BrandsFile, ConfigError> {
    let brands_file: BrandsFile = serde_yaml::from_str(content)?;
    validate_brands(&brands_file)?;
    Ok(brands_file)
}

fn validate_brands(brands_file: &BrandsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if brand.platforms.is_empty() {
            return Err(ConfigError::Validation(format!(
                "brand '{}' must list at least one platform",
                brand.name
            )));
        }

        let lower_name = brand.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }

        let slug = brand.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand slug: '{}' (from brand '{}')",
                slug, brand.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand(name: &str) -> BrandConfig {
        BrandConfig {
            name: name.to_string(),
            keywords: Vec::new(),
            platforms: default_platforms(),
        }
    }

    #[test]
    fn slug_special_characters() {
        assert_eq!(brand("Republic of Gamers").slug(), "republic-of-gamers");
        assert_eq!(brand("Tom's Guide").slug(), "toms-guide");
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let yaml = "brands:\n  - name: ASUS\n    keywords: [ROG, Zenbook]\n  - name: Activision\n    platforms: [youtube]\n";
        let file = parse_brands(yaml).unwrap();
        assert_eq!(file.topics(), vec!["ASUS", "Activision"]);
        assert_eq!(
            file.platforms_for("asus"),
            vec![SourcePlatform::Reddit, SourcePlatform::YouTube]
        );
        assert_eq!(file.platforms_for("Activision"), vec![SourcePlatform::YouTube]);
    }

    #[test]
    fn keywords_merge_names_keywords_and_extras() {
        let file = BrandsFile {
            brands: vec![BrandConfig {
                name: "ASUS".to_string(),
                keywords: vec!["ROG".to_string(), "  ".to_string()],
                platforms: default_platforms(),
            }],
        };
        let keywords = file.keywords(&["Call of Duty".to_string()]);
        let expected: Vec<&str> = vec!["ASUS", "Call of Duty", "ROG"];
        assert_eq!(keywords.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn validate_rejects_empty_name() {
        let file = BrandsFile {
            brands: vec![brand("  ")],
        };
        let err = validate_brands(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let file = BrandsFile {
            brands: vec![brand("ASUS"), brand("asus")],
        };
        let err = validate_brands(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate brand name"));
    }

    #[test]
    fn validate_rejects_empty_platforms() {
        let mut b = brand("ASUS");
        b.platforms.clear();
        let err = validate_brands(&BrandsFile { brands: vec![b] }).unwrap_err();
        assert!(err.to_string().contains("at least one platform"));
    }

    #[test]
    fn shipped_brands_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/brands.yaml");
        let file = load_brands(&path).unwrap();
        assert_eq!(file.topics(), vec!["ASUS", "Activision"]);
        assert!(file.keywords(&[]).contains("Warzone"));
    }

    #[test]
    fn missing_brands_file_is_io_error() {
        let err = load_brands(Path::new("/nonexistent/brands.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::BrandsFileIo { .. }));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = parse_brands("brands: [name: ").unwrap_err();
        assert!(matches!(err, ConfigError::BrandsFileParse(_)));
    }
}
