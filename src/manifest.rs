use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{MkquizError, Result};

// ---- Enumerations ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Year {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "4th")]
    Fourth,
}

impl Year {
    pub const ALL: [Year; 4] = [Year::First, Year::Second, Year::Third, Year::Fourth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Year::First => "1st",
            Year::Second => "2nd",
            Year::Third => "3rd",
            Year::Fourth => "4th",
        }
    }
}

impl FromStr for Year {
    type Err = MkquizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1st" => Ok(Year::First),
            "2nd" => Ok(Year::Second),
            "3rd" => Ok(Year::Third),
            "4th" => Ok(Year::Fourth),
            _ => Err(MkquizError::validation(
                format!("Invalid year '{}'. Must be one of: 1st, 2nd, 3rd, 4th", s),
                "year",
            )),
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The exam a quiz prepares for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuizFor {
    Midterm,
    Final,
}

impl QuizFor {
    pub const ALL: [QuizFor; 2] = [QuizFor::Midterm, QuizFor::Final];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuizFor::Midterm => "Midterm",
            QuizFor::Final => "Final",
        }
    }
}

impl FromStr for QuizFor {
    type Err = MkquizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Midterm" => Ok(QuizFor::Midterm),
            "Final" => Ok(QuizFor::Final),
            _ => Err(MkquizError::validation(
                format!("Invalid quiz-for '{}'. Must be one of: Midterm, Final", s),
                "quizFor",
            )),
        }
    }
}

impl fmt::Display for QuizFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "TF")]
    Tf,
    #[serde(rename = "QB")]
    Qb,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [QuestionType::Mcq, QuestionType::Tf, QuestionType::Qb];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::Tf => "TF",
            QuestionType::Qb => "QB",
        }
    }
}

impl FromStr for QuestionType {
    type Err = MkquizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "MCQ" => Ok(QuestionType::Mcq),
            "TF" => Ok(QuestionType::Tf),
            "QB" => Ok(QuestionType::Qb),
            _ => Err(MkquizError::validation(
                format!("Invalid question type '{}'. Must be one of: MCQ, TF, QB", s),
                "questionType",
            )),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---- Data Types ----

/// One quiz entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord", into = "StoredRecord")]
pub struct QuizRecord {
    pub quiz_type: QuestionType,
    pub path: Option<String>,
    pub published: bool,
    pub json: Option<String>,
    /// How the record's keys appeared on disk. A record that is loaded and
    /// saved again keeps missing keys missing and unknown keys intact.
    pub stored: StoredShape,
}

impl QuizRecord {
    pub fn new(quiz_type: QuestionType, path: Option<String>, published: bool, json: Option<String>) -> Self {
        Self {
            quiz_type,
            path,
            published,
            json,
            stored: StoredShape::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Written,
    Null,
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredShape {
    path: Slot,
    published: Slot,
    json: Slot,
    other: IndexMap<String, serde_json::Value>,
}

// On-disk form of a record.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    #[serde(rename = "type")]
    quiz_type: QuestionType,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    path: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    published: Option<Option<bool>>,
    #[serde(
        rename = "JSON",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    json: Option<Option<String>>,
    #[serde(flatten)]
    other: IndexMap<String, serde_json::Value>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn slot_of<T>(value: &Option<Option<T>>) -> Slot {
    match value {
        None => Slot::Absent,
        Some(None) => Slot::Null,
        Some(Some(_)) => Slot::Written,
    }
}

impl From<StoredRecord> for QuizRecord {
    fn from(raw: StoredRecord) -> Self {
        let stored = StoredShape {
            path: slot_of(&raw.path),
            published: slot_of(&raw.published),
            json: slot_of(&raw.json),
            other: raw.other,
        };
        Self {
            quiz_type: raw.quiz_type,
            path: raw.path.flatten(),
            published: raw.published.flatten().unwrap_or(false),
            json: raw.json.flatten(),
            stored,
        }
    }
}

impl From<QuizRecord> for StoredRecord {
    fn from(record: QuizRecord) -> Self {
        // A value set after loading is always written.
        let path = match (record.stored.path, record.path) {
            (Slot::Absent, None) => None,
            (_, path) => Some(path),
        };
        let json = match (record.stored.json, record.json) {
            (Slot::Absent, None) => None,
            (_, json) => Some(json),
        };
        let published = match (record.stored.published, record.published) {
            (Slot::Absent, false) => None,
            (Slot::Null, false) => Some(None),
            (_, published) => Some(Some(published)),
        };
        Self {
            quiz_type: record.quiz_type,
            path,
            published,
            json,
            other: record.stored.other,
        }
    }
}

/// quiz-for label -> records, in insertion order.
pub type SubjectRecord = IndexMap<String, Vec<QuizRecord>>;

/// subject -> quiz-for map.
pub type YearRecord = IndexMap<String, SubjectRecord>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestRoot {
    #[serde(rename = "Year", default)]
    pub year: IndexMap<String, YearRecord>,
}

/// The whole quizzes manifest: `[{"Year": {...}}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(pub Vec<ManifestRoot>);

/// A record together with the keys that locate it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEntry<'a> {
    pub year: &'a str,
    pub subject: &'a str,
    pub quiz_for: &'a str,
    #[serde(flatten)]
    pub record: &'a QuizRecord,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest(vec![ManifestRoot::default()])
    }
}

// ---- Load / Save ----

pub fn load(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MkquizError::json(
            format!("Failed to load JSON file '{}': {}", path.display(), e),
            Some(path),
        )
    })?;
    parse(&content).map_err(|e| match e {
        MkquizError::Json { message, .. } => MkquizError::json(message, Some(path)),
        other => other,
    })
}

/// Parses manifest text; the document must be a non-empty array.
pub fn parse(content: &str) -> Result<Manifest> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| MkquizError::json(format!("Invalid JSON: {}", e), None))?;

    match value.as_array() {
        Some(items) if !items.is_empty() => {}
        _ => {
            return Err(MkquizError::json(
                "All quizzes JSON must be a non-empty array",
                None,
            ))
        }
    }

    serde_json::from_value(value)
        .map_err(|e| MkquizError::json(format!("Malformed quizzes manifest: {}", e), None))
}

/// Pretty-prints `value` with the given indent unit.
pub fn to_pretty_string<T: Serialize>(value: &T, indent: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| MkquizError::json(format!("Failed to serialize JSON: {}", e), None))?;
    String::from_utf8(buf).map_err(|e| MkquizError::json(e.to_string(), None))
}

/// Writes the manifest to a sibling temp file and renames it over `path`, so
/// an interrupted write leaves the previous manifest in place.
pub fn save(path: &Path, manifest: &Manifest) -> Result<()> {
    let content = to_pretty_string(manifest, b"    ")?;
    write_atomic(path, &content)?;
    tracing::debug!(path = %path.display(), "quizzes manifest saved");
    Ok(())
}

pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, content).map_err(|e| {
        MkquizError::fs(format!("Failed to save JSON file '{}': {}", path.display(), e), path)
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        MkquizError::fs(format!("Failed to save JSON file '{}': {}", path.display(), e), path)
    })
}

// ---- Structural Operations ----

impl Manifest {
    fn root_mut(&mut self) -> &mut ManifestRoot {
        if self.0.is_empty() {
            self.0.push(ManifestRoot::default());
        }
        &mut self.0[0]
    }

    fn root(&self) -> Option<&ManifestRoot> {
        self.0.first()
    }

    /// Creates any missing year -> subject -> quiz-for levels and returns the
    /// target record list. Existing data is left untouched.
    pub fn ensure_structure(
        &mut self,
        year: &str,
        subject: &str,
        quiz_for: &str,
    ) -> &mut Vec<QuizRecord> {
        let root = self.root_mut();

        if !root.year.contains_key(year) {
            tracing::debug!(year, "created year structure");
        }
        let subjects = root.year.entry(year.to_string()).or_default();

        if !subjects.contains_key(subject) {
            tracing::debug!(year, subject, "created subject structure");
        }
        let exams = subjects.entry(subject.to_string()).or_default();

        if !exams.contains_key(quiz_for) {
            tracing::debug!(year, subject, quiz_for, "created quiz-for structure");
        }
        exams.entry(quiz_for.to_string()).or_default()
    }

    /// Appends a record. Duplicates are allowed.
    pub fn add_record(&mut self, year: &str, subject: &str, quiz_for: &str, record: QuizRecord) {
        let quiz_type = record.quiz_type;
        self.ensure_structure(year, subject, quiz_for).push(record);
        tracing::info!(year, subject, quiz_for, %quiz_type, "quiz added to manifest");
    }

    /// Removes the first record of `quiz_type` under year/subject/quiz-for.
    /// Emptied quiz-for and subject keys are pruned; year keys are kept.
    pub fn remove_record(
        &mut self,
        year: &str,
        subject: &str,
        quiz_for: &str,
        quiz_type: QuestionType,
    ) -> bool {
        self.remove_where(year, subject, quiz_for, quiz_type, |records| {
            records.iter().position(|r| r.quiz_type == quiz_type)
        })
    }

    /// Removes the record of `quiz_type` whose stored path equals `path`.
    /// With `path = None` this is [`Manifest::remove_record`]. A path that no
    /// record carries removes nothing.
    pub fn remove_record_at_path(
        &mut self,
        year: &str,
        subject: &str,
        quiz_for: &str,
        quiz_type: QuestionType,
        path: Option<&str>,
    ) -> bool {
        self.remove_where(year, subject, quiz_for, quiz_type, |records| match path {
            Some(p) => records
                .iter()
                .position(|r| r.quiz_type == quiz_type && r.path.as_deref() == Some(p)),
            None => records.iter().position(|r| r.quiz_type == quiz_type),
        })
    }

    fn remove_where<F>(
        &mut self,
        year: &str,
        subject: &str,
        quiz_for: &str,
        quiz_type: QuestionType,
        find: F,
    ) -> bool
    where
        F: FnOnce(&[QuizRecord]) -> Option<usize>,
    {
        let Some(root) = self.0.first_mut() else {
            return false;
        };
        let Some(subjects) = root.year.get_mut(year) else {
            tracing::warn!(year, subject, quiz_for, %quiz_type, "quiz not found in manifest");
            return false;
        };
        let Some(exams) = subjects.get_mut(subject) else {
            tracing::warn!(year, subject, quiz_for, %quiz_type, "quiz not found in manifest");
            return false;
        };
        let Some(records) = exams.get_mut(quiz_for) else {
            tracing::warn!(year, subject, quiz_for, %quiz_type, "quiz not found in manifest");
            return false;
        };
        let Some(index) = find(records.as_slice()) else {
            tracing::warn!(year, subject, quiz_for, %quiz_type, "quiz type not found");
            return false;
        };

        records.remove(index);
        tracing::info!(year, subject, quiz_for, %quiz_type, "quiz removed from manifest");

        if records.is_empty() {
            exams.shift_remove(quiz_for);
            tracing::debug!(year, subject, quiz_for, "removed empty quiz-for structure");
        }
        if exams.is_empty() {
            subjects.shift_remove(subject);
            tracing::debug!(year, subject, "removed empty subject structure");
        }
        true
    }

    pub fn list_for_year(&self, year: &str) -> Option<&YearRecord> {
        self.root()?.year.get(year)
    }

    /// Display names (`"{subject} {TYPE}"`) of the records already stored
    /// under year/subject/quiz-for.
    pub fn existing_display_names(&self, year: &str, subject: &str, quiz_for: &str) -> Vec<String> {
        self.list_for_year(year)
            .and_then(|subjects| subjects.get(subject))
            .and_then(|exams| exams.get(quiz_for))
            .map(|records| {
                records
                    .iter()
                    .map(|r| crate::paths::display_name(subject, r.quiz_type.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every record across all roots, in document order.
    pub fn entries(&self) -> Vec<QuizEntry<'_>> {
        let mut out = Vec::new();
        for root in &self.0 {
            for (year, subjects) in &root.year {
                for (subject, exams) in subjects {
                    for (quiz_for, records) in exams {
                        for record in records {
                            out.push(QuizEntry {
                                year,
                                subject,
                                quiz_for,
                                record,
                            });
                        }
                    }
                }
            }
        }
        out
    }

    /// Normalizes every stored `path` and `JSON` value. Returns how many
    /// values changed.
    pub fn fix_paths(&mut self) -> usize {
        let mut fixed = 0;
        for root in &mut self.0 {
            for record in root
                .year
                .values_mut()
                .flat_map(|subjects| subjects.values_mut())
                .flat_map(|exams| exams.values_mut())
                .flat_map(|records| records.iter_mut())
            {
                for value in [&mut record.path, &mut record.json].into_iter().flatten() {
                    let normalized = crate::paths::normalize(value);
                    if normalized != *value {
                        *value = normalized;
                        fixed += 1;
                    }
                }
            }
        }
        fixed
    }
}

pub fn count_by_display_name(names: &[String], target: &str) -> usize {
    names.iter().filter(|n| n.as_str() == target).count()
}

// ---- Tests ----
