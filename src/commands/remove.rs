use std::path::Path;

use crate::config;
use crate::error::{MkquizError, Result};
use crate::manifest::{self, Year};
use crate::prompt::{select_value, Prompter};
use crate::quiz::{self, QuizSelection};

/// Picks a year, lets the operator tick quizzes under it and removes them
/// after confirmation. Returns how many records were removed.
pub fn run(config_path: &Path, prompter: &mut dyn Prompter) -> Result<usize> {
    let config = config::load_and_validate(config_path)?;
    let all = manifest::load(&config.all_quizzez_json_path)?;

    let year = select_value(prompter, "Select year:", &Year::ALL, Year::to_string)?;
    let available = quiz::selections_for_year(&all, year.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            MkquizError::quiz(format!("No quizzes found for {} year.", year), year.as_str())
        })?;

    let labels: Vec<String> = available.iter().map(QuizSelection::label).collect();
    let picked = prompter.multi_select("Select quizzes to remove:", &labels)?;
    if picked.is_empty() {
        println!("No quizzes selected for removal.");
        return Ok(0);
    }

    let chosen: Vec<QuizSelection> = picked.iter().map(|&i| available[i].clone()).collect();
    let names = chosen
        .iter()
        .map(QuizSelection::label)
        .collect::<Vec<_>>()
        .join("\n  ");
    let message = format!("Are you sure you want to remove these quizzes?\n  {}\n", names);
    if !prompter.confirm(&message, false)? {
        println!("Operation cancelled.");
        return Ok(0);
    }

    let removed = quiz::remove_quizzes(&config, &chosen)?;
    println!("Removed {} quiz(zes).", removed);
    Ok(removed)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{scripted, Project};
    use crate::folders::AutoConfirm;
    use crate::manifest::{QuestionType, QuizFor};
    use crate::quiz::NewQuiz;

    fn seed(project: &Project, name: &str, question_type: QuestionType) -> std::path::PathBuf {
        let request = NewQuiz {
            quiz_name: name.into(),
            quiz_for: QuizFor::Midterm,
            question_type,
            year: Year::Second,
            published: true,
        };
        quiz::add_quiz(&project.config, &request, &project.questions(), &mut AutoConfirm(true))
            .unwrap()
            .folder
    }

    #[test]
    fn test_remove_selected() {
        let project = Project::new();
        let networks = seed(&project, "Networks", QuestionType::Mcq);
        let os = seed(&project, "OS", QuestionType::Tf);

        let mut prompter = scripted(&["2", "2", "y"]);
        assert_eq!(run(&project.config_path, &mut prompter).unwrap(), 1);

        assert!(networks.exists());
        assert!(!os.exists());
        let all = manifest::load(&project.config.all_quizzez_json_path).unwrap();
        let year = all.list_for_year("2nd").unwrap();
        assert!(year.contains_key("Networks"));
        assert!(!year.contains_key("OS"));
    }

    #[test]
    fn test_remove_cancelled_by_default() {
        let project = Project::new();
        let folder = seed(&project, "Networks", QuestionType::Mcq);

        let mut prompter = scripted(&["2", "1", ""]);
        assert_eq!(run(&project.config_path, &mut prompter).unwrap(), 0);
        assert!(folder.exists());
    }

    #[test]
    fn test_remove_empty_selection() {
        let project = Project::new();
        seed(&project, "Networks", QuestionType::Mcq);
        let mut prompter = scripted(&["2", ""]);
        assert_eq!(run(&project.config_path, &mut prompter).unwrap(), 0);
    }

    #[test]
    fn test_remove_unknown_year() {
        let project = Project::new();
        let mut prompter = scripted(&["4"]);
        let err = run(&project.config_path, &mut prompter).unwrap_err();
        assert_eq!(err.to_string(), "No quizzes found for 4th year.");
    }
}
