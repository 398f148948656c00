//! The collaborator's result document.
//!
//! The collaborator prints one JSON object:
//!
//! ```json
//! {"app_version": "1.2.3", "build_number": "45", "package_tags": {"web": "1.2.4"}}
//! ```
//!
//! `package_tags` keeps the order the collaborator wrote it in.
//! `build_number` may be a string or a number and may be absent.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Parsed collaborator result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VersionOutcome {
    /// Next application version.
    pub app_version: String,
    /// CI build number, when the collaborator reports one.
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub build_number: Option<String>,
    /// Next tag per package, in document order.
    #[serde(default)]
    pub package_tags: PackageTags,
    /// Echo of the application key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_key: Option<String>,
    /// How the versions were derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl VersionOutcome {
    /// Parse collaborator stdout.
    ///
    /// Accepts the whole output as one document. Failing that, the last
    /// line that starts with `{` is tried, so stray diagnostics printed
    /// before the document are tolerated.
    ///
    /// # Errors
    ///
    /// Returns the error from parsing the whole output when neither attempt
    /// succeeds.
    pub fn parse(stdout: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(stdout.trim()).or_else(|whole| {
            stdout
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| line.starts_with('{'))
                .and_then(|line| serde_json::from_str(line).ok())
                .ok_or(whole)
        })
    }

    /// The application version as semver, if it is one.
    pub fn app_semver(&self) -> Option<semver::Version> {
        semver::Version::parse(self.app_version.trim()).ok()
    }
}

/// Ordered package → tag mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageTags(Vec<(String, String)>);

impl PackageTags {
    /// Whether no packages were tagged.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of tagged packages.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate `(package, tag)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Tag for a package.
    pub fn get(&self, package: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == package).map(|(_, v)| v)
    }
}

impl FromIterator<(String, String)> for PackageTags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for PackageTags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagsVisitor;

        impl<'de> Visitor<'de> for TagsVisitor {
            type Value = PackageTags;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of package names to tags")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(PackageTags::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut tags = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, tag)) = map.next_entry::<String, String>()? {
                    // Later duplicates replace earlier ones in place.
                    match tags.iter_mut().find(|entry: &&mut (String, String)| entry.0 == name) {
                        Some(entry) => entry.1 = tag,
                        None => tags.push((name, tag)),
                    }
                }
                Ok(PackageTags(tags))
            }
        }

        deserializer.deserialize_any(TagsVisitor)
    }
}

impl Serialize for PackageTags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, tag) in &self.0 {
            map.serialize_entry(name, tag)?;
        }
        map.end()
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
