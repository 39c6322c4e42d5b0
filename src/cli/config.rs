//! Build and Compiler Configuration
//!
//! Loads the build config (`dtspack.json`) and the compiler-options subset
//! of `tsconfig.json` the resolver consumes. tsconfig reads are
//! comment-tolerant and follow `extends` chains (nearest config wins, cycle
//! guarded). CLI overrides are merged last by the driver.

use crate::OutputFormat;
use crate::entry::{CollisionStrategy, EntryInput};
use crate::module_resolver::ResolverOptions;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Custom deserializer for boolean options that accepts both bool and string
/// values, for configs containing `"allowJs": "true"`.
fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{s}'. Expected true, false, 'true', or 'false'"
            ))),
        },
    }
}

/// Declaration-bundling options: a plain toggle or an object.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DtsConfig {
    Enabled(bool),
    Options {
        /// Declaration-specific entries, overriding the build entries.
        #[serde(default)]
        entry: Option<EntryInput>,
        /// Resolve imports through tsconfig paths/baseUrl. Off leaves
        /// everything non-relative external.
        #[serde(default)]
        resolve: Option<bool>,
    },
}

impl DtsConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DtsConfig::Enabled(false))
    }

    pub fn entry(&self) -> Option<&EntryInput> {
        match self {
            DtsConfig::Options { entry, .. } => entry.as_ref(),
            DtsConfig::Enabled(_) => None,
        }
    }

    pub fn resolve(&self) -> bool {
        match self {
            DtsConfig::Options { resolve, .. } => resolve.unwrap_or(true),
            DtsConfig::Enabled(_) => true,
        }
    }
}

/// The `dtspack.json` build config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    #[serde(default)]
    pub entry: Option<EntryInput>,
    #[serde(default)]
    pub format: Option<Vec<OutputFormat>>,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default)]
    pub dts: Option<DtsConfig>,
    #[serde(default)]
    pub tsconfig: Option<PathBuf>,
    #[serde(default)]
    pub collision_suffix: Option<CollisionStrategy>,
}

/// The tsconfig subset the pipeline reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub compiler_options: Option<CompilerOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub paths: Option<IndexMap<String, Vec<String>>>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub allow_js: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub resolve_json_module: Option<bool>,
}

impl CompilerOptions {
    /// Overlay `other` on top of `self` (child config wins per field).
    fn merge_over(self, child: CompilerOptions) -> CompilerOptions {
        CompilerOptions {
            base_url: child.base_url.or(self.base_url),
            paths: child.paths.or(self.paths),
            allow_js: child.allow_js.or(self.allow_js),
            resolve_json_module: child.resolve_json_module.or(self.resolve_json_module),
        }
    }
}

/// Strip `//` and `/* */` comments plus trailing commas so tsconfig-style
/// JSON parses with a strict parser.
fn strip_jsonc(text: &str) -> String {
    // Comments first, then trailing commas, so `"a": 1, // note` followed
    // by `}` still loses its comma.
    strip_trailing_commas(&strip_comments(text))
}

fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                out.extend_from_slice(&bytes[start..i]);
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn strip_trailing_commas(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                out.extend_from_slice(&bytes[start..i]);
            }
            b',' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b']') {
                    i += 1;
                    continue;
                }
                out.push(b',');
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Load the build config from a file.
pub fn load_build_config(path: &Path) -> Result<BuildConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read build config {}", path.display()))?;
    serde_json::from_str(&strip_jsonc(&text))
        .with_context(|| format!("invalid build config {}", path.display()))
}

/// Load a tsconfig file, following its `extends` chain. The chain is
/// resolved parent-first so the nearest config wins field by field.
pub fn load_tsconfig(path: &Path) -> Result<CompilerOptions> {
    let mut seen = HashSet::new();
    load_tsconfig_inner(path, &mut seen)
}

fn load_tsconfig_inner(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<CompilerOptions> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("tsconfig not found: {}", path.display()))?;
    if !seen.insert(canonical.clone()) {
        bail!("circular tsconfig extends chain at {}", canonical.display());
    }

    let text = std::fs::read_to_string(&canonical)
        .with_context(|| format!("failed to read tsconfig {}", canonical.display()))?;
    let config: TsConfig = serde_json::from_str(&strip_jsonc(&text))
        .with_context(|| format!("invalid tsconfig {}", canonical.display()))?;

    let own = config.compiler_options.unwrap_or_default();
    match config.extends {
        Some(parent_spec) => {
            let parent_path = resolve_extends(&parent_spec, &canonical);
            let parent = load_tsconfig_inner(&parent_path, seen)
                .with_context(|| format!("while resolving extends of {}", canonical.display()))?;
            Ok(parent.merge_over(own))
        }
        None => Ok(own),
    }
}

/// Resolve an `extends` specifier relative to the extending config.
fn resolve_extends(spec: &str, from: &Path) -> PathBuf {
    let dir = from.parent().unwrap_or(Path::new("."));
    let mut candidate = dir.join(spec);
    if candidate.extension().is_none() {
        candidate.set_extension("json");
    }
    candidate
}

/// Turn loaded compiler options into resolver options. `base_url` resolves
/// relative to the config's directory; without one, the project root is the
/// base.
pub fn resolver_options(
    compiler: &CompilerOptions,
    project_root: &Path,
    config_dir: Option<&Path>,
) -> ResolverOptions {
    let base_dir = config_dir.unwrap_or(project_root);
    ResolverOptions {
        project_root: project_root.to_path_buf(),
        base_url: compiler
            .base_url
            .as_ref()
            .map(|base| base_dir.join(base)),
        paths: compiler.paths.clone().unwrap_or_default(),
        allow_js: compiler.allow_js.unwrap_or(false),
        resolve_json_module: compiler.resolve_json_module.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn strips_comments_and_trailing_commas() {
        let jsonc = r#"{
  // line comment
  "compilerOptions": {
    /* block
       comment */
    "baseUrl": ".", // tail
    "paths": { "@/*": ["src/*"], },
  },
}"#;
        let parsed: TsConfig = serde_json::from_str(&strip_jsonc(jsonc)).unwrap();
        let options = parsed.compiler_options.unwrap();
        assert_eq!(options.base_url.as_deref(), Some("."));
        assert_eq!(options.paths.unwrap()["@/*"], vec!["src/*"]);
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let jsonc = r#"{ "compilerOptions": { "baseUrl": "a//b" } }"#;
        let parsed: TsConfig = serde_json::from_str(&strip_jsonc(jsonc)).unwrap();
        assert_eq!(
            parsed.compiler_options.unwrap().base_url.as_deref(),
            Some("a//b")
        );
    }

    #[test]
    fn extends_chain_merges_nearest_last() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.json"),
            r#"{ "compilerOptions": { "baseUrl": "base", "allowJs": true } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{ "extends": "./base.json", "compilerOptions": { "baseUrl": "child" } }"#,
        )
        .unwrap();

        let merged = load_tsconfig(&dir.path().join("tsconfig.json")).unwrap();
        assert_eq!(merged.base_url.as_deref(), Some("child"));
        assert_eq!(merged.allow_js, Some(true));
    }

    #[test]
    fn circular_extends_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{ "extends": "./b.json" }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{ "extends": "./a.json" }"#,
        )
        .unwrap();

        let result = load_tsconfig(&dir.path().join("a.json"));
        assert!(result.is_err());
    }

    #[test]
    fn bool_or_string_tolerance() {
        let json = r#"{ "compilerOptions": { "allowJs": "true", "resolveJsonModule": false } }"#;
        let parsed: TsConfig = serde_json::from_str(json).unwrap();
        let options = parsed.compiler_options.unwrap();
        assert_eq!(options.allow_js, Some(true));
        assert_eq!(options.resolve_json_module, Some(false));
    }

    #[test]
    fn build_config_accepts_entry_shapes_and_dts_forms() {
        let config: BuildConfig = serde_json::from_str(
            r#"{ "entry": ["src/index.ts"], "format": ["esm", "cjs"], "dts": { "resolve": false } }"#,
        )
        .unwrap();
        assert!(matches!(config.entry, Some(EntryInput::List(_))));
        assert_eq!(
            config.format,
            Some(vec![OutputFormat::Esm, OutputFormat::Cjs])
        );
        let dts = config.dts.unwrap();
        assert!(dts.is_enabled());
        assert!(!dts.resolve());

        let toggled: BuildConfig = serde_json::from_str(r#"{ "dts": false }"#).unwrap();
        assert!(!toggled.dts.unwrap().is_enabled());
    }

    #[test]
    fn resolver_options_join_base_url_to_config_dir() {
        let compiler = CompilerOptions {
            base_url: Some("src".to_string()),
            ..Default::default()
        };
        let options = resolver_options(
            &compiler,
            Path::new("/project"),
            Some(Path::new("/project/config")),
        );
        assert_eq!(options.base_url, Some(PathBuf::from("/project/config/src")));
        assert_eq!(options.project_root, PathBuf::from("/project"));
    }
}
