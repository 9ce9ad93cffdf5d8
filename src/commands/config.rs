use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::error::Result;
use crate::prompt::{text_until, Prompter};

/// Asks for the three project paths, re-asking each one until it validates,
/// and saves them to `config_path`. Values from an existing configuration
/// are offered as defaults.
pub fn run(config_path: &Path, prompter: &mut dyn Prompter) -> Result<Config> {
    tracing::info!("starting configuration setup");
    let current = config::load(config_path).ok();
    let default_of = |path: &Path| path.to_string_lossy().into_owned();

    let project_default = current.as_ref().map(|c| default_of(&c.project_path));
    let project_path = text_until(
        prompter,
        "Enter the Quizzez project root path:",
        project_default.as_deref(),
        |s| config::check_project_path(Path::new(s)),
    )?;

    let manifest_default = current.as_ref().map(|c| default_of(&c.all_quizzez_json_path));
    let manifest_path = text_until(
        prompter,
        "Enter the all Quizzez JSON path:",
        manifest_default.as_deref(),
        |s| config::check_manifest_file(Path::new(s)),
    )?;

    let template_default = current.as_ref().map(|c| default_of(&c.template_file));
    let template_file = text_until(
        prompter,
        "Enter path to template.html file:",
        template_default.as_deref(),
        |s| config::check_template_file(Path::new(s)),
    )?;

    let new_config = Config {
        project_path: PathBuf::from(project_path),
        template_file: PathBuf::from(template_file),
        all_quizzez_json_path: PathBuf::from(manifest_path),
    };
    config::save(config_path, &new_config)?;
    println!("Configuration saved to {}", config_path.display());
    Ok(new_config)
}

// ---- Tests ----
