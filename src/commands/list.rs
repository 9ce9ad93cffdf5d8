use std::path::Path;

use crate::config;
use crate::error::Result;
use crate::manifest::{self, Manifest};

/// One line per stored quiz, in manifest order.
pub fn lines(all: &Manifest) -> Vec<String> {
    all.entries()
        .iter()
        .map(|entry| {
            format!(
                "{} / {} / {} / {}  {}  [{}]",
                entry.year,
                entry.subject,
                entry.quiz_for,
                entry.record.quiz_type,
                entry.record.path.as_deref().unwrap_or("-"),
                if entry.record.published { "published" } else { "draft" }
            )
        })
        .collect()
}

pub fn run(config_path: &Path) -> Result<usize> {
    let config = config::load_and_validate(config_path)?;
    let all = manifest::load(&config.all_quizzez_json_path)?;
    let lines = lines(&all);
    if lines.is_empty() {
        println!("No quizzes in {}", config.all_quizzez_json_path.display());
    }
    for line in &lines {
        println!("{}", line);
    }
    Ok(lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines() {
        let all = manifest::parse(
            r#"[{"Year":{
                "1st":{"Algo":{"Midterm":[
                    {"type":"MCQ","path":"/quizzes/1st/midterm/algo_mcq","published":true,"JSON":null},
                    {"type":"TF","path":null,"published":false,"JSON":null}
                ]}},
                "2nd":{"OS":{"Final":[{"type":"QB","path":"/quizzes/2nd/final/os_qb","published":true,"JSON":null}]}}
            }}]"#,
        )
        .unwrap();

        assert_eq!(
            lines(&all),
            [
                "1st / Algo / Midterm / MCQ  /quizzes/1st/midterm/algo_mcq  [published]",
                "1st / Algo / Midterm / TF  -  [draft]",
                "2nd / OS / Final / QB  /quizzes/2nd/final/os_qb  [published]",
            ]
        );
    }
}
