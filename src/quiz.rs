//! Quiz operations shared by the CLI commands and the HTTP API. Each one
//! loads the manifest, mutates it in memory and writes it back once.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{MkquizError, Result};
use crate::folders::{self, Confirm};
use crate::manifest::{self, count_by_display_name, Manifest, QuestionType, QuizFor, QuizRecord, Year};
use crate::paths::{display_name, manifest_path_of, normalize, sanitize_strict};
use crate::questions;
use crate::template::{self, TemplateVars};

// ---- Add ----

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub quiz_name: String,
    pub quiz_for: QuizFor,
    pub question_type: QuestionType,
    pub year: Year,
    pub published: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOutcome {
    pub quiz: QuizRecord,
    pub questions_count: usize,
    #[serde(skip)]
    pub folder: PathBuf,
}

/// `"{subject} {TYPE}"`, suffixed with `count + 1` when records with that
/// display name already exist under year/subject/quiz-for. The suffix keeps
/// growing while the resulting folder is stored as some record's `path`, or
/// already exists on disk for a suffixed name, so a new quiz never lands in a
/// live quiz's folder.
pub fn assign_display_name(
    manifest: &Manifest,
    project_root: &Path,
    year: &str,
    subject: &str,
    quiz_for: &str,
    question_type: QuestionType,
) -> String {
    let names = manifest.existing_display_names(year, subject, quiz_for);
    let base = display_name(subject, question_type.as_str());
    let stored: HashSet<String> = manifest
        .entries()
        .iter()
        .filter_map(|entry| entry.record.path.as_deref())
        .map(normalize)
        .collect();

    let taken = |name: &str, suffixed: bool| {
        let folder = folders::build_folder_path(project_root, year, quiz_for, name);
        let claimed = manifest_path_of(&folder).is_some_and(|p| stored.contains(&p));
        claimed || (suffixed && folder.exists())
    };

    let mut count = count_by_display_name(&names, &base);
    let mut name = with_suffix(&base, count);
    while taken(&name, count > 0) {
        count += 1;
        name = with_suffix(&base, count);
    }
    name
}

fn next_display_name(names: &[String], subject: &str, question_type: QuestionType) -> String {
    let base = display_name(subject, question_type.as_str());
    with_suffix(&base, count_by_display_name(names, &base))
}

fn with_suffix(base: &str, count: usize) -> String {
    match count {
        0 => base.to_string(),
        n => format!("{}{}", base, n + 1),
    }
}

fn stored_path(path: &Path) -> Result<String> {
    manifest_path_of(path).ok_or_else(|| {
        MkquizError::quiz(
            format!("Path '{}' is not inside a quizzes folder", path.display()),
            &path.to_string_lossy(),
        )
    })
}

/// Creates the quiz folder, copies the question file, renders `index.html`
/// and appends the record to the manifest.
pub fn add_quiz(
    config: &Config,
    quiz: &NewQuiz,
    question_file: &Path,
    confirm: &mut dyn Confirm,
) -> Result<AddOutcome> {
    let subject = quiz.quiz_name.trim();
    if subject.is_empty() {
        return Err(MkquizError::validation("Name cannot be empty", "quizName"));
    }
    let year = quiz.year.as_str();
    let quiz_for = quiz.quiz_for.as_str();

    let question_list = questions::load_question_file(question_file)?;
    let questions_count = question_list.len();

    let mut all = manifest::load(&config.all_quizzez_json_path)?;
    let folder_name = assign_display_name(
        &all,
        &config.project_path,
        year,
        subject,
        quiz_for,
        quiz.question_type,
    );

    let folder = folders::ensure_folder(&config.project_path, year, quiz_for, &folder_name, confirm)?
        .ok_or_else(|| MkquizError::quiz("Quiz creation aborted by user.", &folder_name))?;

    let json_target = folders::copy_question_file(
        &folder,
        question_file,
        &format!("{}_{}", subject, quiz.question_type),
    )?;
    let json_path = stored_path(&json_target)?;

    let html = template::render(
        &config.template_file,
        &TemplateVars {
            quiz_name: subject.to_string(),
            quiz_for: quiz_for.to_string(),
            questions_count,
            duration: template::duration_for(questions_count),
            json_path: Some(json_path.clone()),
        },
    )?;
    folders::write_index(&folder, &html)?;

    let record = QuizRecord::new(
        quiz.question_type,
        Some(stored_path(&folder)?),
        quiz.published,
        Some(json_path),
    );
    all.add_record(year, subject, quiz_for, record.clone());
    manifest::save(&config.all_quizzez_json_path, &all)?;

    tracing::info!(quiz = subject, year, quiz_for, questions_count, "quiz added");
    Ok(AddOutcome {
        quiz: record,
        questions_count,
        folder,
    })
}

// ---- Remove ----

/// Identifies one stored quiz for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSelection {
    pub year: String,
    pub subject: String,
    pub exam_type: String,
    pub quiz_type: QuestionType,
    #[serde(default)]
    pub path: Option<String>,
}

impl QuizSelection {
    pub fn label(&self) -> String {
        format!("{} - {} - {}", self.subject, self.exam_type, self.quiz_type)
    }
}

/// Every quiz stored under `year`, in manifest order.
pub fn selections_for_year(all: &Manifest, year: &str) -> Option<Vec<QuizSelection>> {
    let subjects = all.list_for_year(year)?;
    let mut out = Vec::new();
    for (subject, exams) in subjects {
        for (exam_type, records) in exams {
            for record in records {
                out.push(QuizSelection {
                    year: year.to_string(),
                    subject: subject.clone(),
                    exam_type: exam_type.clone(),
                    quiz_type: record.quiz_type,
                    path: record.path.clone(),
                });
            }
        }
    }
    Some(out)
}

/// Deletes each selected quiz folder and manifest record, then saves once.
/// Returns how many records were removed.
pub fn remove_quizzes(config: &Config, selections: &[QuizSelection]) -> Result<usize> {
    let mut all = manifest::load(&config.all_quizzez_json_path)?;
    let mut removed = 0;

    for selection in selections {
        if let Some(path) = selection.path.as_deref() {
            folders::remove_folder(&config.project_path, path)?;
        }
        if all.remove_record_at_path(
            &selection.year,
            &selection.subject,
            &selection.exam_type,
            selection.quiz_type,
            selection.path.as_deref(),
        ) {
            removed += 1;
        }
    }

    manifest::save(&config.all_quizzez_json_path, &all)?;
    tracing::info!(removed, "quizzes removed");
    Ok(removed)
}

// ---- Rebuild ----

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildStats {
    pub total: usize,
    pub skipped: usize,
    pub by_year: IndexMap<String, usize>,
    pub by_type: IndexMap<String, usize>,
    pub backup: PathBuf,
}

pub fn backup_file_name(now: &DateTime<Local>) -> String {
    now.format("backup_nav_H%H_m%M_D%d_M%m.json").to_string()
}

/// Copies the manifest, re-indented with two spaces, next to itself.
pub fn backup_manifest(manifest_path: &Path, now: &DateTime<Local>) -> Result<PathBuf> {
    let raw = std::fs::read_to_string(manifest_path).map_err(|e| {
        MkquizError::json(format!("Failed to read quizzes manifest: {}", e), Some(manifest_path))
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        MkquizError::json(format!("Invalid JSON: {}", e), Some(manifest_path))
    })?;

    let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let backup = dir.join(backup_file_name(now));
    let content = manifest::to_pretty_string(&value, b"  ")?;
    std::fs::write(&backup, content).map_err(|e| {
        MkquizError::fs(format!("Failed to write backup: {}", e), &backup)
    })?;
    tracing::info!(backup = %backup.display(), "manifest backup written");
    Ok(backup)
}

struct RebuildTarget<'a> {
    year: &'a str,
    quiz_for: &'a str,
    subject: &'a str,
    display: String,
}

/// Regenerates one quiz folder from its stored question file and rewrites
/// the record's paths.
fn rebuild_one(config: &Config, target: &RebuildTarget<'_>, record: &mut QuizRecord) -> Result<()> {
    let old_json = record.json.as_deref().ok_or_else(|| {
        MkquizError::quiz("Record has no question file", &target.display)
    })?;
    let source = folders::resolve_in_project(&config.project_path, old_json)?;
    if !source.exists() {
        return Err(MkquizError::fs(
            format!("Source JSON file not found: {}", source.display()),
            &source,
        ));
    }

    let raw = std::fs::read_to_string(&source)
        .map_err(|e| MkquizError::fs(format!("Failed to read '{}': {}", source.display(), e), &source))?;
    let content: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| MkquizError::json(format!("Invalid JSON file: {}", e), Some(&source)))?;
    let questions_count = content.as_array().map(Vec::len).unwrap_or(0);

    let folder = folders::build_folder_path(&config.project_path, target.year, target.quiz_for, &target.display);
    if folder.exists() {
        std::fs::remove_dir_all(&folder).map_err(|e| {
            MkquizError::fs(format!("Failed to remove folder '{}': {}", folder.display(), e), &folder)
        })?;
    }
    std::fs::create_dir_all(&folder).map_err(|e| {
        MkquizError::fs(format!("Failed to create folder '{}': {}", folder.display(), e), &folder)
    })?;

    let json_target = folder.join(format!(
        "{}.json",
        sanitize_strict(&format!("{}_{}", target.subject, record.quiz_type))
    ));
    let pretty = manifest::to_pretty_string(&content, b"  ")?;
    std::fs::write(&json_target, pretty).map_err(|e| {
        MkquizError::fs(format!("Error writing JSON file '{}': {}", json_target.display(), e), &json_target)
    })?;
    let json_path = stored_path(&json_target)?;

    let html = template::render(
        &config.template_file,
        &TemplateVars {
            quiz_name: target.display.clone(),
            quiz_for: target.quiz_for.to_string(),
            questions_count,
            duration: template::duration_for(questions_count),
            json_path: Some(json_path.clone()),
        },
    )?;
    folders::write_index(&folder, &html)?;

    record.path = Some(stored_path(&folder)?);
    record.json = Some(json_path);
    Ok(())
}

/// Writes a timestamped backup, then rebuilds every quiz folder listed in
/// the manifest. A failing record is logged and skipped.
pub fn rebuild_all(config: &Config, now: &DateTime<Local>) -> Result<RebuildStats> {
    let backup = backup_manifest(&config.all_quizzez_json_path, now)?;
    let mut all = manifest::load(&config.all_quizzez_json_path)?;
    let mut stats = RebuildStats {
        backup,
        ..Default::default()
    };

    for root in &mut all.0 {
        for (year, subjects) in root.year.iter_mut() {
            stats.by_year.entry(year.clone()).or_insert(0);

            for (subject, exams) in subjects.iter_mut() {
                for (quiz_for, records) in exams.iter_mut() {
                    let mut seen: Vec<String> = Vec::new();

                    for record in records.iter_mut() {
                        let target = RebuildTarget {
                            year,
                            quiz_for,
                            subject,
                            display: next_display_name(&seen, subject, record.quiz_type),
                        };
                        seen.push(display_name(subject, record.quiz_type.as_str()));

                        match rebuild_one(config, &target, record) {
                            Ok(()) => {
                                stats.total += 1;
                                *stats.by_year.entry(year.clone()).or_insert(0) += 1;
                                *stats
                                    .by_type
                                    .entry(record.quiz_type.as_str().to_string())
                                    .or_insert(0) += 1;
                                tracing::debug!(year = %year, quiz = %target.display, "quiz rebuilt");
                            }
                            Err(e) => {
                                stats.skipped += 1;
                                tracing::warn!(
                                    year = %year,
                                    quiz = %target.display,
                                    error = %e,
                                    "skipping quiz during rebuild"
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    manifest::save(&config.all_quizzez_json_path, &all)?;
    tracing::info!(total = stats.total, skipped = stats.skipped, "rebuild finished");
    Ok(stats)
}

// ---- Fix paths ----

/// Normalizes every stored path in place and returns the number changed.
pub fn fix_paths(config: &Config) -> Result<usize> {
    let mut all = manifest::load(&config.all_quizzez_json_path)?;
    let fixed = all.fix_paths();
    manifest::save(&config.all_quizzez_json_path, &all)?;
    tracing::info!(fixed, "manifest paths normalized");
    Ok(fixed)
}

// ---- Tests ----
