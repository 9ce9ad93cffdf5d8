use std::path::{Path, PathBuf};

use crate::config;
use crate::error::Result;
use crate::manifest::{QuestionType, QuizFor, Year};
use crate::prompt::{select_value, text_until, PromptConfirm, Prompter};
use crate::questions;
use crate::quiz::{self, AddOutcome, NewQuiz};

pub fn run(config_path: &Path, prompter: &mut dyn Prompter) -> Result<AddOutcome> {
    let config = config::load_and_validate(config_path)?;

    let quiz_name = text_until(prompter, "Quiz name (e.g. Computer Arch):", None, |s| {
        if s.trim().is_empty() {
            Err("Name cannot be empty".into())
        } else {
            Ok(())
        }
    })?;
    let quiz_for = select_value(prompter, "Quiz for:", &QuizFor::ALL, QuizFor::to_string)?;
    let question_type = select_value(
        prompter,
        "Type of questions:",
        &QuestionType::ALL,
        QuestionType::to_string,
    )?;
    let year = select_value(prompter, "Quiz for year:", &Year::ALL, Year::to_string)?;
    let question_file = text_until(prompter, "Path to quiz JSON file:", None, |s| {
        questions::load_question_file(Path::new(s))
            .map(|_| ())
            .map_err(|e| e.to_string())
    })?;
    let published = prompter.confirm("Published?", true)?;

    let request = NewQuiz {
        quiz_name,
        quiz_for,
        question_type,
        year,
        published,
    };
    let outcome = quiz::add_quiz(
        &config,
        &request,
        &PathBuf::from(question_file),
        &mut PromptConfirm(&mut *prompter),
    )?;

    println!(
        "Quiz added at {} ({} questions)",
        outcome.quiz.path.as_deref().unwrap_or_default(),
        outcome.questions_count
    );
    Ok(outcome)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{scripted, Project};
    use crate::manifest;

    #[test]
    fn test_add_interactive() {
        let project = Project::new();
        let questions = project.questions();
        let bad = project.dir.path().join("bad.json");
        std::fs::write(&bad, r#"[{"id":1,"question":"Q","options":{"a":"x"},"answer":"a"}]"#).unwrap();

        let mut prompter = scripted(&[
            "",
            "Computer Arch",
            "2",
            "1",
            "3",
            Project::path_str(&bad),
            Project::path_str(&questions),
            "",
        ]);
        let outcome = run(&project.config_path, &mut prompter).unwrap();

        assert_eq!(outcome.questions_count, 10);
        assert_eq!(outcome.quiz.path.as_deref(), Some("/quizzes/3rd/final/computer_arch_mcq"));
        assert!(outcome.quiz.published);

        let saved = manifest::load(&project.config.all_quizzez_json_path).unwrap();
        assert_eq!(saved.list_for_year("3rd").unwrap()["Computer Arch"]["Final"].len(), 1);
        let html = std::fs::read_to_string(outcome.folder.join("index.html")).unwrap();
        assert_eq!(html, "<h1>Computer Arch</h1><p>10</p>");
    }

    #[test]
    fn test_add_declined_overwrite_fails() {
        let project = Project::new();
        std::fs::create_dir_all(project.config.project_path.join("quizzes/1st/midterm/os_tf")).unwrap();
        let questions = project.questions();

        let mut prompter = scripted(&["OS", "1", "2", "1", Project::path_str(&questions), "n", "n"]);
        let err = run(&project.config_path, &mut prompter).unwrap_err();
        assert_eq!(err.kind(), "QuizOperationError");

        let saved = manifest::load(&project.config.all_quizzez_json_path).unwrap();
        assert!(saved.list_for_year("1st").is_none());
    }

    #[test]
    fn test_add_without_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut prompter = scripted(&[]);
        let err = run(&dir.path().join(".mkquizrc"), &mut prompter).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }
}
