use std::path::Path;

use crate::config;
use crate::error::Result;
use crate::quiz::{self, RebuildStats};

pub fn run(config_path: &Path) -> Result<RebuildStats> {
    let config = config::load_and_validate(config_path)?;
    let stats = quiz::rebuild_all(&config, &chrono::Local::now())?;

    println!("Backup written: {}", stats.backup.display());
    println!("\nRebuild Statistics:");
    for (year, count) in &stats.by_year {
        println!("{} year quizzes = {}", year, count);
    }
    println!("\nBy Quiz Type:");
    for (quiz_type, count) in &stats.by_type {
        println!("{} quizzes = {}", quiz_type, count);
    }
    println!("\nTotal quizzes = {}", stats.total);
    if stats.skipped > 0 {
        println!("Skipped = {} (see warnings above)", stats.skipped);
    }
    println!(
        "\nJSON file updated: {}",
        config.all_quizzez_json_path.display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Project;

    #[test]
    fn test_rebuild_empty_manifest() {
        let project = Project::new();
        let stats = run(&project.config_path).unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.backup.exists());
        assert_eq!(stats.backup.parent(), project.config.all_quizzez_json_path.parent());
    }
}
