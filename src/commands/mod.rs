//! Interactive CLI command handlers. Each handler returns a summary of what
//! it did, or an error when the command failed. Declining a removal returns a
//! zero count instead of an error.

pub mod add;
pub mod config;
pub mod fix_paths;
pub mod list;
pub mod rebuild;
pub mod remove;

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    use crate::config::{self, Config, CONFIG_FILENAME};
    use crate::prompt::TerminalPrompter;

    pub type ScriptedPrompter = TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>>;

    pub fn scripted(lines: &[&str]) -> ScriptedPrompter {
        let mut input = lines.join("\n");
        input.push('\n');
        TerminalPrompter::new(Cursor::new(input.into_bytes()), Vec::new())
    }

    /// A project with a template, an empty manifest, a saved `.mkquizrc`
    /// and a 10-question MCQ file at `questions.json`.
    pub struct Project {
        pub dir: TempDir,
        pub config: Config,
        pub config_path: PathBuf,
    }

    impl Project {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().join("site");
            std::fs::create_dir_all(&root).unwrap();
            let template = dir.path().join("template.html");
            std::fs::write(&template, "<h1>{% Quiz Name %}</h1><p>{% N %}</p>").unwrap();
            let manifest = dir.path().join("all.json");
            std::fs::write(&manifest, r#"[{"Year":{}}]"#).unwrap();

            let questions: Vec<_> = (1..=10)
                .map(|i| {
                    serde_json::json!({
                        "id": i,
                        "question": format!("Q{}", i),
                        "options": {"a": "x", "b": "y", "c": "z"},
                        "answer": "c"
                    })
                })
                .collect();
            std::fs::write(
                dir.path().join("questions.json"),
                serde_json::to_string(&questions).unwrap(),
            )
            .unwrap();

            let config = Config {
                project_path: root,
                template_file: template,
                all_quizzez_json_path: manifest,
            };
            let config_path = dir.path().join(CONFIG_FILENAME);
            config::save(&config_path, &config).unwrap();
            Self { dir, config, config_path }
        }

        pub fn questions(&self) -> PathBuf {
            self.dir.path().join("questions.json")
        }

        pub fn path_str(path: &Path) -> &str {
            path.to_str().unwrap()
        }
    }
}
