use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{MkquizError, Result};

/// One question of a per-quiz question file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: serde_json::Number,
    pub question: String,
    pub options: IndexMap<String, String>,
    pub answer: String,
}

// ---- Validation ----

fn invalid(index: usize, what: &str, field: &str) -> MkquizError {
    MkquizError::validation(format!("Question at index {} {}", index, what), field)
}

/// `{a: "True", b: "False"}` and nothing else.
fn is_true_false(options: &serde_json::Map<String, Value>) -> bool {
    options.len() == 2
        && options.get("a").and_then(Value::as_str) == Some("True")
        && options.get("b").and_then(Value::as_str) == Some("False")
}

pub fn validate_question(value: &Value, index: usize) -> Result<Question> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(index, "is not a valid object", "question"))?;

    let id = match obj.get("id") {
        Some(Value::Number(n)) => n.clone(),
        _ => return Err(invalid(index, "is missing or has invalid 'id' property", "question.id")),
    };

    let question = match obj.get("question") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            return Err(invalid(
                index,
                "is missing or has invalid 'question' property",
                "question.question",
            ))
        }
    };

    let raw_options = obj.get("options").and_then(Value::as_object).ok_or_else(|| {
        invalid(index, "is missing or has invalid 'options' property", "question.options")
    })?;

    if raw_options.is_empty() {
        return Err(invalid(index, "has empty options", "question.options"));
    }
    if !is_true_false(raw_options) && raw_options.len() < 2 {
        return Err(invalid(index, "must have at least 2 options", "question.options"));
    }

    let mut options = IndexMap::with_capacity(raw_options.len());
    for (key, option) in raw_options {
        let text = option
            .as_str()
            .ok_or_else(|| invalid(index, "has invalid option values", "question.options"))?;
        options.insert(key.clone(), text.to_string());
    }

    let answer = match obj.get("answer") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            return Err(invalid(
                index,
                "is missing or has invalid 'answer' property",
                "question.answer",
            ))
        }
    };

    if !options.contains_key(&answer) {
        return Err(invalid(
            index,
            &format!("has answer key \"{}\" not found in options", answer),
            "question.answer",
        ));
    }

    Ok(Question {
        id,
        question,
        options,
        answer,
    })
}

/// Checks that `value` is an array of well-formed questions.
pub fn validate(value: &Value) -> Result<Vec<Question>> {
    let items = value.as_array().ok_or_else(|| {
        MkquizError::validation("Quiz JSON must contain an array of questions", "questions")
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_question(item, index))
        .collect()
}

/// Reads, parses and validates a question file. The file must exist and
/// carry a `.json` extension.
pub fn load_question_file(path: &Path) -> Result<Vec<Question>> {
    if !path.exists() {
        return Err(MkquizError::validation(
            format!("Path does not exist: {}", path.display()),
            "path",
        ));
    }
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MkquizError::validation(
            format!("Expected .json file but got '{}'", path.display()),
            "fileExtension",
        ));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        MkquizError::json(format!("Invalid JSON file: {}", e), Some(path))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        MkquizError::json(format!("Invalid JSON file: {}", e), Some(path))
    })?;
    validate(&value)
}

// ---- Tests ----
