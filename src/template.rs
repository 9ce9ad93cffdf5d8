use regex::{NoExpand, Regex};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{MkquizError, Result};

static QUIZ_NAME: LazyLock<Regex> = LazyLock::new(|| token(r"Quiz Name"));
static QUIZ_FOR: LazyLock<Regex> = LazyLock::new(|| token(r"Final/Midterm Sheet"));
static QUESTIONS_COUNT: LazyLock<Regex> = LazyLock::new(|| token(r"N"));
static DURATION: LazyLock<Regex> = LazyLock::new(|| token(r"T"));
static JSON_PATH: LazyLock<Regex> = LazyLock::new(|| token(r"JSON Path"));

/// `{% label %}` with any whitespace around the label.
fn token(label: &str) -> Regex {
    Regex::new(&format!(r"\{{%\s*{}\s*%\}}", label)).expect("placeholder pattern is valid")
}

#[derive(Debug, Clone)]
pub struct TemplateVars {
    pub quiz_name: String,
    pub quiz_for: String,
    pub questions_count: usize,
    pub duration: usize,
    pub json_path: Option<String>,
}

/// Minutes allowed for a quiz: about 4 per 10 questions, plus one.
pub fn duration_for(questions_count: usize) -> usize {
    questions_count * 4 / 10 + 1
}

/// Substitutes the five placeholders. Unknown tokens are left as they are.
pub fn render_str(template: &str, vars: &TemplateVars) -> String {
    let count = vars.questions_count.to_string();
    let duration = vars.duration.to_string();
    let json_path = vars.json_path.as_deref().unwrap_or("");

    let out = QUIZ_NAME.replace_all(template, NoExpand(&vars.quiz_name));
    let out = QUIZ_FOR.replace_all(&out, NoExpand(&vars.quiz_for));
    let out = QUESTIONS_COUNT.replace_all(&out, NoExpand(&count));
    let out = DURATION.replace_all(&out, NoExpand(&duration));
    let out = JSON_PATH.replace_all(&out, NoExpand(json_path));
    out.into_owned()
}

pub fn render(template_path: &Path, vars: &TemplateVars) -> Result<String> {
    tracing::debug!(template = %template_path.display(), quiz = %vars.quiz_name, "processing template");
    let content = std::fs::read_to_string(template_path).map_err(|e| {
        MkquizError::template(
            format!(
                "Failed to process template '{}': {}",
                template_path.display(),
                e
            ),
            template_path,
        )
    })?;
    Ok(render_str(&content, vars))
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars {
            quiz_name: "Algo".into(),
            quiz_for: "Midterm".into(),
            questions_count: 20,
            duration: 9,
            json_path: Some("/quizzes/x.json".into()),
        }
    }

    #[test]
    fn test_render_all_tokens() {
        let template = "<title>{% Quiz Name %}</title>\n<h2>{%Final/Midterm Sheet%}</h2>\
                        <p>{%  N  %} questions in {% T %} min</p><script data-src=\"{% JSON Path %}\"></script>";
        let out = render_str(template, &vars());
        assert_eq!(
            out,
            "<title>Algo</title>\n<h2>Midterm</h2><p>20 questions in 9 min</p><script data-src=\"/quizzes/x.json\"></script>"
        );
    }

    #[test]
    fn test_unknown_tokens_untouched() {
        let template = "{% Author %} {% n %} {{ N }} {% Quiz Name %}";
        assert_eq!(render_str(template, &vars()), "{% Author %} {% n %} {{ N }} Algo");
    }

    #[test]
    fn test_dollar_signs_are_literal() {
        let mut v = vars();
        v.quiz_name = "Cost $1 ${x}".into();
        assert_eq!(render_str("{% Quiz Name %}", &v), "Cost $1 ${x}");
    }

    #[test]
    fn test_missing_json_path_renders_empty() {
        let mut v = vars();
        v.json_path = None;
        assert_eq!(render_str("[{% JSON Path %}]", &v), "[]");
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration_for(25), 11);
        assert_eq!(duration_for(20), 9);
        assert_eq!(duration_for(0), 1);
        assert_eq!(duration_for(3), 2);
    }

    #[test]
    fn test_render_missing_template() {
        let err = render(Path::new("/no/such/template.html"), &vars()).unwrap_err();
        assert_eq!(err.kind(), "TemplateError");
    }
}
