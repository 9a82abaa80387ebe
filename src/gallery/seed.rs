use crate::{config::Config, resolver::BaseDirectory};
use anyhow::Context;
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};
use tracing::info;

pub struct DemoImage {
    pub name: &'static str,
    pub color: &'static str,
    pub label: &'static str,
}

pub const DEMO_IMAGES: [DemoImage; 4] = [
    DemoImage { name: "landscape1.svg", color: "#3498db", label: "Mountain Landscape" },
    DemoImage { name: "landscape2.svg", color: "#2ecc71", label: "Forest View" },
    DemoImage { name: "portrait1.svg", color: "#e74c3c", label: "City Portrait" },
    DemoImage { name: "abstract1.svg", color: "#9b59b6", label: "Abstract Art" },
];

// Decoys next to the images directory. A traversal that works would reach these.
const DECOY_DATABASE_CONF: &str = "[database]
host=localhost
port=5432
username=admin
password=decoy-not-a-real-password

[security]
jwt_secret=decoy-jwt-secret
api_key=decoy-api-key
";

const DECOY_ENV: &str = "DB_PASSWORD=decoy-not-a-real-password
AWS_ACCESS_KEY_ID=DECOYACCESSKEY
ADMIN_EMAIL=admin@gallery.invalid
";

pub fn svg(color: &str, label: &str) -> String {
    format!(
        r#"<svg width="400" height="300" xmlns="http://www.w3.org/2000/svg">
  <rect width="400" height="300" fill="{color}"/>
  <text x="50%" y="50%" font-size="24" fill="white" text-anchor="middle" dominant-baseline="middle">{label}</text>
</svg>
"#
    )
}

/// Startup initialization: creates the images directory, optionally seeds
/// the demo files, and returns the canonical base directory. Existing files
/// are never overwritten.
pub fn prepare(cfg: &Config) -> anyhow::Result<BaseDirectory> {
    let dir = &cfg.gallery.images_dir;
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let base = BaseDirectory::open(dir).context("opening images_dir")?;

    if cfg.gallery.seed_demo_files {
        let written = seed_images(base.path())?;
        info!(written, "demo images seeded");
    }
    if cfg.gallery.seed_decoys {
        if let Some(parent) = base.path().parent() {
            let written = seed_decoys(&parent.join("config"))?;
            info!(written, "decoy config seeded");
        }
    }
    Ok(base)
}

fn seed_images(dir: &Path) -> anyhow::Result<usize> {
    let mut written = 0;
    for img in &DEMO_IMAGES {
        if write_new(&dir.join(img.name), svg(img.color, img.label).as_bytes())? {
            written += 1;
        }
    }
    Ok(written)
}

fn seed_decoys(dir: &Path) -> anyhow::Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = 0;
    for (name, body) in [("database.conf", DECOY_DATABASE_CONF), (".env", DECOY_ENV)] {
        if write_new(&dir.join(name), body.as_bytes())? {
            written += 1;
        }
    }
    Ok(written)
}

/// Creates `path` with `body`. Returns `false` when it already exists.
fn write_new(path: &Path, body: &[u8]) -> anyhow::Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("creating {}", path.display())),
    };
    file.write_all(body).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}
