//! Package documents as served by the registry.
//!
//! Registry documents are loosely typed: fields that are usually strings
//! may be objects, arrays or empty strings depending on the age of the
//! package and the tool that published it. The deserializers here accept
//! all commonly seen shapes and normalize them:
//!
//! - Empty strings become `None`
//! - `license` accepts `"MIT"`, `{ "type": "MIT" }` or a list of either
//! - `repository` accepts a URL string or `{ "type", "url" }`
//! - `author` and `maintainers` accept `"Name <email> (url)"` or objects
//! - dependency maps and `engines` ignore entries that are not strings
//! - numeric `dist` fields accept numbers or numeric strings

use std::{collections::BTreeMap, fmt};

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;

fn empty_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn optional_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OptU64Visitor;

    impl<'de> Visitor<'de> for OptU64Visitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a positive integer, string, or null")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok((v >= 0).then_some(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok((v >= 0.0 && v.is_finite()).then_some(v as u64))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.trim().parse::<u64>().ok())
        }

        fn visit_bool<E>(self, _: bool) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: de::MapAccess<'de>,
        {
            while map.next_entry::<de::IgnoredAny, de::IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            while seq.next_element::<de::IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_option(OptU64Visitor)
}

fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => BTreeMap::new(),
    })
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s
            .split([',', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn license_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map.get("type").and_then(license_name),
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(license_name).collect();
            (!names.is_empty()).then(|| names.join(" OR "))
        }
        _ => None,
    }
}

fn flexible_license<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(license_name))
}

fn flexible_repository<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    let url = match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Object(mut map)) => match map.remove("url") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    };
    Ok(url.filter(|u| !u.trim().is_empty()))
}

fn flexible_person<'de, D>(deserializer: D) -> Result<Option<Person>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(Person::from_value))
}

fn person_list<'de, D>(deserializer: D) -> Result<Vec<Person>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(Person::from_value).collect(),
        Some(other) => Person::from_value(other).into_iter().collect(),
        None => Vec::new(),
    })
}

fn flexible_bin<'de, D>(deserializer: D) -> Result<Option<Bin>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(Bin::Single(s)),
        Some(Value::Object(map)) => {
            let commands: BTreeMap<String, String> = map
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect();
            (!commands.is_empty()).then_some(Bin::Map(commands))
        }
        _ => None,
    })
}

/// Author or maintainer entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

impl Person {
    /// Parses the `"Name <email> (url)"` shorthand.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let between = |open: char, close: char| {
            let start = text.find(open)?;
            let end = text[start + 1..].find(close)? + start + 1;
            let inner = text[start + 1..end].trim();
            (!inner.is_empty()).then(|| inner.to_string())
        };

        let name_end = text.find(['<', '(']).unwrap_or(text.len());
        let name = text[..name_end].trim();

        Some(Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            email: between('<', '>'),
            url: between('(', ')'),
        })
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(&s),
            Value::Object(mut map) => {
                let mut take = |key: &str| match map.remove(key) {
                    Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
                    _ => None,
                };
                let person = Self {
                    name: take("name"),
                    email: take("email"),
                    url: take("url"),
                };
                (person != Self::default()).then_some(person)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(name.clone());
        }
        if let Some(email) = &self.email {
            parts.push(format!("<{email}>"));
        }
        if let Some(url) = &self.url {
            parts.push(format!("({url})"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// The `bin` field: a single command named after the package, or a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Bin {
    Single(String),
    Map(BTreeMap<String, String>),
}

impl Bin {
    /// Command names with their target scripts.
    pub fn commands(&self, package_name: &str) -> Vec<(String, String)> {
        match self {
            Self::Single(path) => {
                let command = package_name
                    .rsplit('/')
                    .next()
                    .unwrap_or(package_name)
                    .to_string();
                vec![(command, path.clone())]
            }
            Self::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// `dist` block of a version manifest.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Dist {
    #[serde(default, deserialize_with = "empty_is_none")]
    pub tarball: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub shasum: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub integrity: Option<String>,

    #[serde(
        default,
        rename = "fileCount",
        deserialize_with = "optional_number"
    )]
    pub file_count: Option<u64>,

    #[serde(
        default,
        rename = "unpackedSize",
        deserialize_with = "optional_number"
    )]
    pub unpacked_size: Option<u64>,
}

/// One published version of a package.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub main: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub module: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub types: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub typings: Option<String>,

    #[serde(default, deserialize_with = "flexible_bin")]
    pub bin: Option<Bin>,

    #[serde(default)]
    pub exports: Option<Value>,

    #[serde(default, deserialize_with = "flexible_license")]
    pub license: Option<String>,

    /// Legacy plural form, only consulted when `license` is absent.
    #[serde(default, deserialize_with = "flexible_license", skip_serializing)]
    pub licenses: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub homepage: Option<String>,

    #[serde(default, deserialize_with = "flexible_repository")]
    pub repository: Option<String>,

    #[serde(default, deserialize_with = "flexible_person")]
    pub author: Option<Person>,

    #[serde(default, deserialize_with = "string_list")]
    pub keywords: Vec<String>,

    #[serde(default, deserialize_with = "string_map")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(
        default,
        rename = "devDependencies",
        deserialize_with = "string_map"
    )]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(
        default,
        rename = "peerDependencies",
        deserialize_with = "string_map"
    )]
    pub peer_dependencies: BTreeMap<String, String>,

    #[serde(
        default,
        rename = "optionalDependencies",
        deserialize_with = "string_map"
    )]
    pub optional_dependencies: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "string_map")]
    pub engines: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub deprecated: Option<String>,

    #[serde(default)]
    pub dist: Dist,
}

impl VersionManifest {
    pub fn license_name(&self) -> Option<&str> {
        self.license.as_deref().or(self.licenses.as_deref())
    }

    /// `types`, falling back to the legacy `typings` field.
    pub fn type_definitions(&self) -> Option<&str> {
        self.types.as_deref().or(self.typings.as_deref())
    }

    pub fn bin_commands(&self) -> Vec<(String, String)> {
        self.bin
            .as_ref()
            .map(|bin| bin.commands(&self.name))
            .unwrap_or_default()
    }
}

/// Full registry document for a package.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Packument {
    pub name: String,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "dist-tags", deserialize_with = "string_map")]
    pub dist_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub versions: BTreeMap<String, VersionManifest>,

    #[serde(default)]
    pub time: BTreeMap<String, Value>,

    #[serde(default, deserialize_with = "flexible_license")]
    pub license: Option<String>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub homepage: Option<String>,

    #[serde(default, deserialize_with = "flexible_repository")]
    pub repository: Option<String>,

    #[serde(default, deserialize_with = "string_list")]
    pub keywords: Vec<String>,

    #[serde(default, deserialize_with = "flexible_person")]
    pub author: Option<Person>,

    #[serde(default, deserialize_with = "person_list")]
    pub maintainers: Vec<Person>,

    #[serde(default, deserialize_with = "empty_is_none")]
    pub readme: Option<String>,
}

impl Packument {
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }

    /// Publish timestamp recorded for `version`, if any.
    pub fn published_at(&self, version: &str) -> Option<&str> {
        self.time.get(version).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packument_normalizes_loose_fields() {
        let doc = r#"{
            "name": "loose",
            "description": "",
            "dist-tags": { "latest": "1.0.0", "bogus": 3 },
            "license": { "type": "MIT", "url": "https://x" },
            "repository": { "type": "git", "url": "git+https://github.com/a/loose.git" },
            "author": "Jane Doe <jane@example.com> (https://jane.dev)",
            "maintainers": [{ "name": "jane", "email": "jane@example.com" }, "bob"],
            "keywords": "one, two",
            "time": { "created": "2020-01-01T00:00:00.000Z", "1.0.0": "2020-01-02T00:00:00.000Z", "unpublished": { "time": "x" } },
            "versions": {
                "1.0.0": {
                    "name": "loose",
                    "version": "1.0.0",
                    "licenses": [{ "type": "MIT" }, { "type": "Apache-2.0" }],
                    "bin": "./cli.js",
                    "typings": "index.d.ts",
                    "dependencies": { "a": "^1.0.0", "weird": ["x"] },
                    "engines": ["node >= 0.8"],
                    "dist": {
                        "tarball": "https://registry.npmjs.org/loose/-/loose-1.0.0.tgz",
                        "fileCount": "12",
                        "unpackedSize": 2048
                    }
                }
            }
        }"#;

        let packument: Packument = serde_json::from_str(doc).unwrap();
        assert_eq!(packument.description, None);
        assert_eq!(packument.latest(), Some("1.0.0"));
        assert_eq!(packument.dist_tags.len(), 1);
        assert_eq!(packument.license.as_deref(), Some("MIT"));
        assert_eq!(
            packument.repository.as_deref(),
            Some("git+https://github.com/a/loose.git")
        );
        assert_eq!(packument.keywords, vec!["one", "two"]);
        assert_eq!(packument.maintainers.len(), 2);
        assert_eq!(packument.published_at("1.0.0"), Some("2020-01-02T00:00:00.000Z"));
        assert_eq!(packument.published_at("unpublished"), None);

        let author = packument.author.unwrap();
        assert_eq!(author.name.as_deref(), Some("Jane Doe"));
        assert_eq!(author.email.as_deref(), Some("jane@example.com"));
        assert_eq!(author.url.as_deref(), Some("https://jane.dev"));

        let manifest = &packument.versions["1.0.0"];
        assert_eq!(manifest.license_name(), Some("MIT OR Apache-2.0"));
        assert_eq!(manifest.type_definitions(), Some("index.d.ts"));
        assert_eq!(
            manifest.bin_commands(),
            vec![("loose".to_string(), "./cli.js".to_string())]
        );
        assert_eq!(manifest.dependencies.len(), 1);
        assert!(manifest.engines.is_empty());
        assert_eq!(manifest.dist.file_count, Some(12));
        assert_eq!(manifest.dist.unpacked_size, Some(2048));
        assert!(manifest.dist.integrity.is_none());
    }

    #[test]
    fn test_scoped_bin_command_name() {
        let manifest = VersionManifest {
            name: "@scope/tool".into(),
            bin: Some(Bin::Single("bin/tool.js".into())),
            ..Default::default()
        };
        assert_eq!(manifest.bin_commands()[0].0, "tool");
    }

    #[test]
    fn test_person_display() {
        let person = Person::parse("Alice (https://alice.dev)").unwrap();
        assert_eq!(person.email, None);
        assert_eq!(person.to_string(), "Alice (https://alice.dev)");
        assert!(Person::parse("   ").is_none());
    }
}
