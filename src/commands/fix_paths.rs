use std::path::Path;

use crate::config;
use crate::error::Result;
use crate::quiz;

pub fn run(config_path: &Path) -> Result<usize> {
    let config = config::load_and_validate(config_path)?;
    let fixed = quiz::fix_paths(&config)?;
    if fixed == 0 {
        println!("All paths already normalized.");
    } else {
        println!("Fixed {} path(s) in {}", fixed, config.all_quizzez_json_path.display());
    }
    Ok(fixed)
}
