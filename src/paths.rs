//! Name sanitizing and path normalization for manifest entries.
//!
//! Every path stored in the manifest is project-relative, starts with a
//! slash and uses forward slashes, e.g. `/quizzes/1st/midterm/algo_mcq`.

const QUIZZES_SEGMENT: &str = "/quizzes/";

/// Folder-safe name: trimmed, lowercased, whitespace runs become `_`.
pub fn sanitize_loose(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// File-safe name: trimmed, lowercased, anything outside `[a-z0-9]` becomes `_`.
pub fn sanitize_strict(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect()
}

pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub fn normalize(path: &str) -> String {
    ensure_leading_slash(&to_forward_slashes(path))
}

/// Returns the `/quizzes/...` tail of an on-disk path, or `None` when the
/// path has no `quizzes` segment.
pub fn extract_quizzes_suffix(absolute_path: &str) -> Option<String> {
    let forward = to_forward_slashes(absolute_path);
    forward
        .find(QUIZZES_SEGMENT)
        .map(|start| forward[start..].to_string())
}

/// Same as [`extract_quizzes_suffix`] for a `Path`.
pub fn manifest_path_of(path: &std::path::Path) -> Option<String> {
    extract_quizzes_suffix(&path.to_string_lossy())
}

/// Display name of a quiz: `"{subject} {TYPE}"`.
pub fn display_name(subject: &str, question_type: &str) -> String {
    format!("{} {}", subject, question_type)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_loose() {
        assert_eq!(sanitize_loose("Data Structures "), "data_structures");
        assert_eq!(sanitize_loose("  Computer   Arch\tMCQ "), "computer_arch_mcq");
        assert_eq!(sanitize_loose("C++ Basics"), "c++_basics");
        assert_eq!(sanitize_loose(""), "");
    }

    #[test]
    fn test_sanitize_strict() {
        assert_eq!(sanitize_strict("Algo_MCQ"), "algo_mcq");
        assert_eq!(sanitize_strict(" C++ Basics "), "c___basics");
        assert_eq!(sanitize_strict("Math 2 TF"), "math_2_tf");
        assert_eq!(sanitize_strict("Économie"), "_conomie");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("quizzes\\1st\\midterm\\algo"), "/quizzes/1st/midterm/algo");
        assert_eq!(normalize("/quizzes/1st"), "/quizzes/1st");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn test_normalize_idempotent() {
        for p in ["", "a", "\\a\\b", "/a/b", "quizzes\\x/y", "//double", "\\"] {
            let once = normalize(p);
            assert_eq!(normalize(&once), once, "normalize not idempotent for {:?}", p);
        }
    }

    #[test]
    fn test_extract_quizzes_suffix() {
        assert_eq!(
            extract_quizzes_suffix("C:\\site\\quizzes\\1st\\midterm\\algo_mcq\\algo_mcq.json").as_deref(),
            Some("/quizzes/1st/midterm/algo_mcq/algo_mcq.json")
        );
        assert_eq!(
            extract_quizzes_suffix("/home/u/site/quizzes/2nd/final/os").as_deref(),
            Some("/quizzes/2nd/final/os")
        );
        assert_eq!(
            extract_quizzes_suffix("/srv/quizzes/quizzes/x").as_deref(),
            Some("/quizzes/quizzes/x")
        );
        assert_eq!(extract_quizzes_suffix("/home/u/site/other/x"), None);
        assert_eq!(extract_quizzes_suffix("quizzes/no-leading"), None);
    }

    #[test]
    fn test_extract_quizzes_suffix_idempotent() {
        for p in ["/p/quizzes/1st/a", "C:\\x\\quizzes\\y", "/quizzes/"] {
            let once = extract_quizzes_suffix(p).unwrap();
            assert_eq!(extract_quizzes_suffix(&once), Some(once.clone()));
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Algorithms", "MCQ"), "Algorithms MCQ");
    }
}
