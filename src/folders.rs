use std::path::{Component, Path, PathBuf};

use crate::error::{MkquizError, Result};
use crate::paths::{sanitize_loose, sanitize_strict};

pub const INDEX_FILE: &str = "index.html";

/// Asks the operator to approve a destructive step.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> Result<bool>;
}

/// Answers every confirmation with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _message: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// `{project_root}/quizzes/{year}/{quiz_for lowercased}/{sanitized name}`
pub fn build_folder_path(project_root: &Path, year: &str, quiz_for: &str, quiz_name: &str) -> PathBuf {
    project_root
        .join("quizzes")
        .join(year)
        .join(quiz_for.to_lowercase())
        .join(sanitize_loose(quiz_name))
}

/// Creates the quiz folder. When it already exists the caller is asked
/// whether to replace it; `Ok(None)` means the operator declined and nothing
/// was touched.
pub fn ensure_folder(
    project_root: &Path,
    year: &str,
    quiz_for: &str,
    quiz_name: &str,
    confirm: &mut dyn Confirm,
) -> Result<Option<PathBuf>> {
    let dest = build_folder_path(project_root, year, quiz_for, quiz_name);

    if dest.exists() {
        let message = format!(
            "Folder {}/{}/{} exists. Remove and continue?",
            year, quiz_for, quiz_name
        );
        if !confirm.confirm(&message)? {
            tracing::info!(folder = %dest.display(), "quiz folder overwrite declined");
            return Ok(None);
        }
        std::fs::remove_dir_all(&dest).map_err(|e| {
            MkquizError::fs(format!("Failed to remove folder '{}': {}", dest.display(), e), &dest)
        })?;
        tracing::debug!(folder = %dest.display(), "removed existing quiz folder");
    }

    std::fs::create_dir_all(&dest).map_err(|e| {
        MkquizError::fs(format!("Failed to create folder '{}': {}", dest.display(), e), &dest)
    })?;
    Ok(Some(dest))
}

/// Copies the question file to `{folder}/{strict name}.json`, replacing any
/// existing file.
pub fn copy_question_file(folder: &Path, source: &Path, quiz_name: &str) -> Result<PathBuf> {
    let dest = folder.join(format!("{}.json", sanitize_strict(quiz_name)));
    std::fs::copy(source, &dest).map_err(|e| {
        MkquizError::fs(
            format!(
                "Failed to copy question file '{}' to '{}': {}",
                source.display(),
                dest.display(),
                e
            ),
            &dest,
        )
    })?;
    Ok(dest)
}

pub fn write_index(folder: &Path, html: &str) -> Result<PathBuf> {
    let dest = folder.join(INDEX_FILE);
    std::fs::write(&dest, html).map_err(|e| {
        MkquizError::fs(format!("Failed to write '{}': {}", dest.display(), e), &dest)
    })?;
    Ok(dest)
}

/// Resolves a manifest path (`/quizzes/...`) against the project root.
/// Paths that climb out of the project are rejected.
pub fn resolve_in_project(project_root: &Path, relative: &str) -> Result<PathBuf> {
    let forward = crate::paths::to_forward_slashes(relative);
    let rel = Path::new(forward.trim_start_matches('/'));
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(MkquizError::quiz(
            format!("Refusing path outside the project: {}", relative),
            relative,
        ));
    }
    Ok(project_root.join(rel))
}

/// Deletes `{project_root}/{relative}` recursively. A missing folder is not
/// an error.
pub fn remove_folder(project_root: &Path, relative: &str) -> Result<PathBuf> {
    let dest = resolve_in_project(project_root, relative)?;
    if dest.exists() {
        std::fs::remove_dir_all(&dest).map_err(|e| {
            MkquizError::fs(format!("Failed to remove folder '{}': {}", dest.display(), e), &dest)
        })?;
        tracing::debug!(folder = %dest.display(), "removed quiz folder");
    }
    Ok(dest)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Recording {
        answer: bool,
        asked: Vec<String>,
    }

    impl Confirm for Recording {
        fn confirm(&mut self, message: &str) -> Result<bool> {
            self.asked.push(message.to_string());
            Ok(self.answer)
        }
    }

    #[test]
    fn test_build_folder_path() {
        assert_eq!(
            build_folder_path(Path::new("/proj"), "1st", "Midterm", "Data Structures "),
            PathBuf::from("/proj/quizzes/1st/midterm/data_structures")
        );
    }

    #[test]
    fn test_ensure_folder_creates() {
        let dir = TempDir::new().unwrap();
        let mut confirm = Recording { answer: false, asked: vec![] };
        let folder = ensure_folder(dir.path(), "2nd", "Final", "OS MCQ", &mut confirm)
            .unwrap()
            .unwrap();
        assert!(folder.is_dir());
        assert!(folder.ends_with("quizzes/2nd/final/os_mcq"));
        assert!(confirm.asked.is_empty());
    }

    #[test]
    fn test_ensure_folder_declined_keeps_contents() {
        let dir = TempDir::new().unwrap();
        let existing = build_folder_path(dir.path(), "1st", "Midterm", "Algo MCQ");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("keep.txt"), "x").unwrap();

        let mut confirm = Recording { answer: false, asked: vec![] };
        let result = ensure_folder(dir.path(), "1st", "Midterm", "Algo MCQ", &mut confirm).unwrap();
        assert!(result.is_none());
        assert!(existing.join("keep.txt").exists());
        assert_eq!(confirm.asked, ["Folder 1st/Midterm/Algo MCQ exists. Remove and continue?"]);
    }

    #[test]
    fn test_ensure_folder_confirmed_replaces() {
        let dir = TempDir::new().unwrap();
        let existing = build_folder_path(dir.path(), "1st", "Midterm", "Algo MCQ");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("stale.txt"), "x").unwrap();

        let folder = ensure_folder(dir.path(), "1st", "Midterm", "Algo MCQ", &mut AutoConfirm(true))
            .unwrap()
            .unwrap();
        assert_eq!(folder, existing);
        assert!(folder.is_dir());
        assert!(!folder.join("stale.txt").exists());
    }

    #[test]
    fn test_copy_question_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.json");
        std::fs::write(&src, "[1]").unwrap();
        let folder = dir.path().join("f");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("algo_mcq.json"), "old").unwrap();

        let dest = copy_question_file(&folder, &src, "Algo_MCQ").unwrap();
        assert_eq!(dest, folder.join("algo_mcq.json"));
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "[1]");
    }

    #[test]
    fn test_remove_folder() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("quizzes/1st/midterm/algo_mcq");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("index.html"), "<html>").unwrap();

        let removed = remove_folder(dir.path(), "/quizzes/1st/midterm/algo_mcq").unwrap();
        assert_eq!(removed, folder);
        assert!(!folder.exists());

        // Second removal is a silent no-op.
        assert!(remove_folder(dir.path(), "/quizzes/1st/midterm/algo_mcq").is_ok());
    }

    #[test]
    fn test_remove_folder_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let err = remove_folder(dir.path(), "/quizzes/../../etc").unwrap_err();
        assert_eq!(err.kind(), "QuizOperationError");
    }
}
