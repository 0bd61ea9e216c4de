//! Normalisation of local file names into remote asset names.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Longest stem kept after sanitising, in characters.
pub const MAX_STEM_LEN: usize = 255;

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\-_]").expect("static regex is valid"))
}

/// Map a raw file name to the name used for the remote asset.
///
/// The stem is lower-cased, every character outside `[a-z0-9-_]` becomes `-`,
/// and the result is cut to [`MAX_STEM_LEN`] characters. The extension is
/// lower-cased and reattached as is. Pure and deterministic, so the same file
/// maps to the same asset name on every run.
pub fn sanitize_file_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    let lowered = stem.to_lowercase();
    let replaced = disallowed().replace_all(&lowered, "-");
    let truncated: String = replaced.chars().take(MAX_STEM_LEN).collect();

    truncated + &extension
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_and_replaces_punctuation() {
        assert_eq!(sanitize_file_name("My File!.TXT"), "my-file-.txt");
    }

    #[test]
    fn keeps_allowed_characters() {
        assert_eq!(sanitize_file_name("build_2024-01.tar.GZ"), "build_2024-01-tar.gz");
    }

    #[test]
    fn is_deterministic() {
        let name = "Ünïcode Name (final).PnG";
        assert_eq!(sanitize_file_name(name), sanitize_file_name(name));
        assert_eq!(sanitize_file_name(name), "-n-code-name--final-.png");
    }

    #[test]
    fn dotfile_has_no_extension() {
        assert_eq!(sanitize_file_name(".env"), "-env");
    }

    #[test]
    fn name_without_extension() {
        assert_eq!(sanitize_file_name("README"), "readme");
    }

    #[test]
    fn truncates_long_stems() {
        let long = format!("{}.bin", "a".repeat(300));
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized.len(), MAX_STEM_LEN + ".bin".len());
        assert!(sanitized.ends_with(".bin"));
    }
}
