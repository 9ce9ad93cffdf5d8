//! mkquiz: maintains a static quiz website's folder tree and its quizzes
//! manifest, from the command line or over HTTP.

pub mod commands;
pub mod config;
pub mod error;
pub mod folders;
pub mod gemini;
pub mod manifest;
pub mod paths;
pub mod prompt;
pub mod questions;
pub mod quiz;
pub mod server;
pub mod template;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use error::{MkquizError, Result};

// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub config_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Option<String>,
    // Serializes manifest read-modify-write cycles within this process
    pub manifest_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config_path: PathBuf, uploads_dir: PathBuf) -> Self {
        Self {
            config_path,
            uploads_dir,
            gemini_api_key: None,
            gemini_base_url: None,
            manifest_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_gemini_key(mut self, key: Option<String>) -> Self {
        self.gemini_api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_gemini_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.gemini_base_url = Some(base_url.into());
        self
    }
}
