//! Entry Normalization
//!
//! Turns the configured entry input (a single path, a path list with glob
//! patterns allowed, or an explicit name-to-path map) into an ordered list
//! of `Entry` values with collision-free output names. Collisions never
//! fail the build: the later entry gets a suffix and a warning naming both
//! conflicting paths.

use globset::{Glob, GlobSetBuilder};
use indexmap::IndexMap;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// One build entry: `name` keys the output artifact, `path` is the
/// project-relative source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub path: String,
}

/// The accepted entry input shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryInput {
    /// A single source path.
    Single(String),
    /// A list of paths; items containing glob metacharacters expand
    /// against the project root.
    List(Vec<String>),
    /// Explicit output name → source path.
    Map(IndexMap<String, String>),
}

/// How colliding entry names get their suffix.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CollisionStrategy {
    /// Deterministic `_1`, `_2`, ... suffixes (reproducible builds).
    #[default]
    Indexed,
    /// Legacy behavior: `_` + 6 random alphanumerics.
    Random,
}

/// Derive an output name from a path: last segment, all extensions
/// stripped (`foo.d.ts` → `foo`).
fn derive_name(path: &str) -> String {
    let segment = Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    match segment.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => segment,
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| {
            let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";
            chars[rng.gen_range(0..chars.len())] as char
        })
        .collect()
}

/// Whether a list item is a glob pattern rather than a literal path.
fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Expand one glob pattern against the project root, in walk order.
fn expand_glob(pattern: &str, project_root: &Path) -> Vec<String> {
    let glob = match Glob::new(pattern) {
        Ok(glob) => glob,
        Err(err) => {
            warn!(pattern, %err, "invalid entry glob; ignoring");
            return Vec::new();
        }
    };
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    let Ok(set) = builder.build() else {
        return Vec::new();
    };

    let mut matches = Vec::new();
    for entry in WalkDir::new(project_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            name != "node_modules" && !name.starts_with('.')
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let Ok(relative) = entry.path().strip_prefix(project_root) else {
            continue;
        };
        if set.is_match(relative) {
            matches.push(relative.to_string_lossy().to_string());
        }
    }

    if matches.is_empty() {
        warn!(pattern, "entry glob matched no files");
    }
    matches
}

/// Normalize entry input into an ordered, collision-free entry list.
pub fn normalize_entries(
    input: &EntryInput,
    project_root: &Path,
    strategy: CollisionStrategy,
) -> Vec<Entry> {
    let named: Vec<(Option<String>, String)> = match input {
        EntryInput::Single(path) => vec![(None, path.clone())],
        EntryInput::List(paths) => paths
            .iter()
            .flat_map(|item| {
                if is_glob(item) {
                    expand_glob(item, project_root)
                } else {
                    vec![item.clone()]
                }
            })
            .map(|path| (None, path))
            .collect(),
        EntryInput::Map(map) => map
            .iter()
            .map(|(name, path)| (Some(name.clone()), path.clone()))
            .collect(),
    };

    let mut used: FxHashMap<String, String> = FxHashMap::default();
    let mut entries = Vec::with_capacity(named.len());

    for (explicit_name, path) in named {
        let base = explicit_name.unwrap_or_else(|| derive_name(&path));
        let name = if let Some(previous_path) = used.get(&base) {
            let resolved = resolve_collision(&base, strategy, &used);
            warn!(
                name = %base,
                first = %previous_path,
                second = %path,
                renamed = %resolved,
                "entry name collision; suffixing the later entry"
            );
            resolved
        } else {
            base
        };
        used.insert(name.clone(), path.clone());
        entries.push(Entry { name, path });
    }

    entries
}

fn resolve_collision(
    base: &str,
    strategy: CollisionStrategy,
    used: &FxHashMap<String, String>,
) -> String {
    match strategy {
        CollisionStrategy::Indexed => {
            let mut counter = 1usize;
            loop {
                let candidate = format!("{base}_{counter}");
                if !used.contains_key(&candidate) {
                    return candidate;
                }
                counter += 1;
            }
        }
        CollisionStrategy::Random => loop {
            let candidate = format!("{base}_{}", random_suffix());
            if !used.contains_key(&candidate) {
                return candidate;
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn derives_name_from_last_segment_without_extensions() {
        assert_eq!(derive_name("src/index.ts"), "index");
        assert_eq!(derive_name("types/global.d.ts"), "global");
        assert_eq!(derive_name("src/app"), "app");
    }

    #[test]
    fn single_and_map_inputs() {
        let root = Path::new("/tmp");
        let single = normalize_entries(
            &EntryInput::Single("src/index.ts".to_string()),
            root,
            CollisionStrategy::Indexed,
        );
        assert_eq!(
            single,
            vec![Entry {
                name: "index".to_string(),
                path: "src/index.ts".to_string()
            }]
        );

        let mut map = IndexMap::new();
        map.insert("core".to_string(), "src/index.ts".to_string());
        map.insert("cli".to_string(), "src/cli.ts".to_string());
        let entries = normalize_entries(&EntryInput::Map(map), root, CollisionStrategy::Indexed);
        assert_eq!(entries[0].name, "core");
        assert_eq!(entries[1].name, "cli");
    }

    #[test]
    fn collision_gets_indexed_suffix_and_never_fails() {
        let input = EntryInput::List(vec![
            "src/index.ts".to_string(),
            "lib/index.ts".to_string(),
        ]);
        let entries = normalize_entries(&input, Path::new("/tmp"), CollisionStrategy::Indexed);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "index");
        assert_eq!(entries[1].name, "index_1");
    }

    #[test]
    fn random_collision_suffix_is_alphanumeric() {
        let input = EntryInput::List(vec![
            "src/index.ts".to_string(),
            "lib/index.ts".to_string(),
        ]);
        let entries = normalize_entries(&input, Path::new("/tmp"), CollisionStrategy::Random);
        assert_eq!(entries[0].name, "index");
        let suffix = entries[1].name.strip_prefix("index_").unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn triple_collision_counts_upward() {
        let input = EntryInput::List(vec![
            "a/main.ts".to_string(),
            "b/main.ts".to_string(),
            "c/main.ts".to_string(),
        ]);
        let entries = normalize_entries(&input, Path::new("/tmp"), CollisionStrategy::Indexed);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["main", "main_1", "main_2"]);
    }

    #[test]
    fn glob_entries_expand_against_project_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/commands")).unwrap();
        fs::write(root.join("src/commands/build.ts"), "").unwrap();
        fs::write(root.join("src/commands/watch.ts"), "").unwrap();
        fs::write(root.join("src/other.ts"), "").unwrap();

        let input = EntryInput::List(vec!["src/commands/*.ts".to_string()]);
        let entries = normalize_entries(&input, root, CollisionStrategy::Indexed);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["build", "watch"]);
    }

    #[test]
    fn non_matching_glob_yields_no_entries() {
        let dir = TempDir::new().unwrap();
        let input = EntryInput::List(vec!["src/*.nope".to_string()]);
        let entries = normalize_entries(&input, dir.path(), CollisionStrategy::Indexed);
        assert!(entries.is_empty());
    }
}
