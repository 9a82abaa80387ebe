use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const IMAGES_DIR_ENV: &str = "SAFE_GALLERY_IMAGES_DIR";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: Server,
    #[serde(default)]
    pub gallery: Gallery,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub audit: Audit,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Gallery {
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_true")]
    pub seed_demo_files: bool,
    /// Writes decoy `config/` files next to `images_dir`. Off unless asked.
    #[serde(default)]
    pub seed_decoys: bool,
    #[serde(default = "default_images")]
    pub images: Vec<String>,
}
fn default_images_dir() -> PathBuf { PathBuf::from("images") }
fn default_images() -> Vec<String> {
    ["landscape1.svg", "landscape2.svg", "portrait1.svg", "abstract1.svg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Gallery {
    fn default() -> Self {
        Self { images_dir: default_images_dir(), seed_demo_files: true, seed_decoys: false, images: default_images() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Limits {
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
    #[serde(default = "default_max_file_kb")]
    pub max_file_kb: u64,
}
fn default_resolve_timeout_ms() -> u64 { 2000 }
fn default_max_file_kb() -> u64 { 4096 }

impl Default for Limits {
    fn default() -> Self {
        Self { resolve_timeout_ms: default_resolve_timeout_ms(), max_file_kb: default_max_file_kb() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Audit {
    #[serde(default = "default_true")]
    pub log_rejections: bool,
}
fn default_true() -> bool { true }

impl Default for Audit {
    fn default() -> Self { Self { log_rejections: true } }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Logging {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_level")]
    pub level: String,
}
fn default_level() -> String { "info".to_string() }

impl Default for Logging {
    fn default() -> Self { Self { format: LogFormat::Json, level: default_level() } }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    /// Applies `SAFE_GALLERY_IMAGES_DIR` on top of the file settings.
    pub fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(IMAGES_DIR_ENV) {
            if !dir.is_empty() {
                self.gallery.images_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.bind_addr.trim().is_empty() { anyhow::bail!("bind_addr must not be empty"); }
        if self.gallery.images_dir.as_os_str().is_empty() { anyhow::bail!("images_dir must not be empty"); }
        if self.limits.resolve_timeout_ms == 0 { anyhow::bail!("resolve_timeout_ms must be > 0"); }
        if self.limits.max_file_kb == 0 { anyhow::bail!("max_file_kb must be > 0"); }
        for name in &self.gallery.images {
            if !is_plain_file_name(name) {
                anyhow::bail!("gallery image entry is not a plain file name: {name:?}");
            }
        }
        Ok(())
    }

    pub fn max_file_bytes(&self) -> u64 { self.limits.max_file_kb * 1024 }
}

pub fn canonical_root(root: &Path) -> anyhow::Result<PathBuf> {
    let c = dunce::canonicalize(root)?;
    Ok(c)
}

fn is_plain_file_name(name: &str) -> bool {
    let mut comps = Path::new(name).components();
    matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None))
        && !name.contains('\\')
}
