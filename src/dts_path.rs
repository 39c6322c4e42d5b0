//! Declaration Path Derivation
//!
//! Maps a source file path to the path its declaration file lives at. The
//! mapping is a pure function of the source path, so declaration paths for
//! distinct sources can never collide.

use std::path::{Path, PathBuf};

/// Source file extensions the pipeline accepts as build entries or imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceExtension {
    Ts,
    Tsx,
    Mts,
    Cts,
    Dts,
    DMts,
    DCts,
    Js,
    Jsx,
    Json,
    Unknown,
}

impl SourceExtension {
    /// Classify a path by extension. Compound `.d.*` extensions win over
    /// their plain counterparts.
    pub fn from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy();

        if path_str.ends_with(".d.ts") {
            return SourceExtension::Dts;
        }
        if path_str.ends_with(".d.mts") {
            return SourceExtension::DMts;
        }
        if path_str.ends_with(".d.cts") {
            return SourceExtension::DCts;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("ts") => SourceExtension::Ts,
            Some("tsx") => SourceExtension::Tsx,
            Some("mts") => SourceExtension::Mts,
            Some("cts") => SourceExtension::Cts,
            Some("js") => SourceExtension::Js,
            Some("jsx") => SourceExtension::Jsx,
            Some("json") => SourceExtension::Json,
            _ => SourceExtension::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceExtension::Ts => ".ts",
            SourceExtension::Tsx => ".tsx",
            SourceExtension::Mts => ".mts",
            SourceExtension::Cts => ".cts",
            SourceExtension::Dts => ".d.ts",
            SourceExtension::DMts => ".d.mts",
            SourceExtension::DCts => ".d.cts",
            SourceExtension::Js => ".js",
            SourceExtension::Jsx => ".jsx",
            SourceExtension::Json => ".json",
            SourceExtension::Unknown => "",
        }
    }

    /// Whether a file with this extension is already declaration text.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            SourceExtension::Dts | SourceExtension::DMts | SourceExtension::DCts
        )
    }

    /// Whether this extension is accepted as a build entry.
    pub fn is_supported_entry(&self) -> bool {
        !matches!(self, SourceExtension::Unknown)
    }
}

/// Derive the declaration path for a source path.
///
/// `.ts`/`.tsx` map to `.d.ts`, `.mts` to `.d.mts`, `.cts` to `.d.cts`,
/// `.js`/`.jsx` to `.d.ts`, `.json` to `.d.json.ts`. Paths already in
/// declaration form are returned unchanged.
pub fn declaration_path(source: &Path) -> PathBuf {
    let ext = SourceExtension::from_path(source);
    if ext.is_declaration() {
        return source.to_path_buf();
    }

    let source_str = source.to_string_lossy();
    let (stem, replacement) = match ext {
        SourceExtension::Ts | SourceExtension::Tsx | SourceExtension::Js | SourceExtension::Jsx => {
            (source_str.trim_end_matches(ext.as_str()), ".d.ts")
        }
        SourceExtension::Mts => (source_str.trim_end_matches(".mts"), ".d.mts"),
        SourceExtension::Cts => (source_str.trim_end_matches(".cts"), ".d.cts"),
        SourceExtension::Json => (source_str.trim_end_matches(".json"), ".d.json.ts"),
        // No recognizable extension: append rather than replace so the
        // mapping stays injective.
        _ => (source_str.as_ref(), ".d.ts"),
    };

    PathBuf::from(format!("{stem}{replacement}"))
}

/// The declaration file extension emitted for a given output format token.
pub fn format_declaration_extension(format: crate::OutputFormat) -> &'static str {
    match format {
        crate::OutputFormat::Esm => ".d.mts",
        crate::OutputFormat::Cjs => ".d.cts",
        crate::OutputFormat::Iife => ".d.ts",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_ts_family_to_dts() {
        assert_eq!(
            declaration_path(Path::new("src/index.ts")),
            PathBuf::from("src/index.d.ts")
        );
        assert_eq!(
            declaration_path(Path::new("src/app.tsx")),
            PathBuf::from("src/app.d.ts")
        );
        assert_eq!(
            declaration_path(Path::new("src/mod.mts")),
            PathBuf::from("src/mod.d.mts")
        );
        assert_eq!(
            declaration_path(Path::new("src/mod.cts")),
            PathBuf::from("src/mod.d.cts")
        );
    }

    #[test]
    fn declaration_inputs_pass_through() {
        assert_eq!(
            declaration_path(Path::new("types/global.d.ts")),
            PathBuf::from("types/global.d.ts")
        );
    }

    #[test]
    fn json_maps_to_d_json_ts() {
        assert_eq!(
            declaration_path(Path::new("data/schema.json")),
            PathBuf::from("data/schema.d.json.ts")
        );
    }

    #[test]
    fn derivation_is_injective_for_sibling_sources() {
        // a.ts and a.tsx cannot coexist with distinct declarations, but
        // distinct stems always yield distinct declaration paths.
        let a = declaration_path(Path::new("src/a.ts"));
        let b = declaration_path(Path::new("src/b.ts"));
        assert_ne!(a, b);
    }

    #[test]
    fn compound_extension_wins() {
        assert_eq!(
            SourceExtension::from_path(Path::new("x.d.ts")),
            SourceExtension::Dts
        );
        assert_eq!(
            SourceExtension::from_path(Path::new("x.ts")),
            SourceExtension::Ts
        );
    }
}
