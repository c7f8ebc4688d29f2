use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Env var naming the config file; falls back to `DEFAULT_CONFIG_PATH`.
pub const CONFIG_ENV: &str = "GAZETTE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "conf/app.toml";

const DEFAULT_QR_URL: &str = "https://github.com/EDDYCJY/blog#gin%E7%B3%BB%E5%88%97%E7%9B%AE%E5%BD%95";

/// Read-only settings loaded once at launch and shared as Rocket managed state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub page_size: i64,
    pub database_path: String,
    pub runtime_root_path: String,
    pub export_save_path: String,
    pub qrcode_save_path: String,
    pub prefix_url: String,
    pub clean_interval_minutes: u64,
    pub max_upload_mb: u64,
    pub poster: PosterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    pub qr_url: String,
    pub background: String,
    pub qr_size: u32,
    pub rect: Rect,
    pub anchor: Point,
}

/// Region of the background image that becomes the poster canvas.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            page_size: 10,
            database_path: "runtime/db/gazette.db".to_string(),
            runtime_root_path: "runtime/".to_string(),
            export_save_path: "export/".to_string(),
            qrcode_save_path: "qrcode/".to_string(),
            prefix_url: "http://127.0.0.1:8000".to_string(),
            clean_interval_minutes: 0,
            max_upload_mb: 8,
            poster: PosterConfig::default(),
        }
    }
}

impl Default for PosterConfig {
    fn default() -> Self {
        PosterConfig {
            qr_url: DEFAULT_QR_URL.to_string(),
            background: "bg.jpg".to_string(),
            qr_size: 300,
            rect: Rect { x0: 0, y0: 0, x1: 550, y1: 700 },
            anchor: Point { x: 125, y: 298 },
        }
    }
}

impl AppConfig {
    /// Load from `$GAZETTE_CONFIG` or `conf/app.toml`. A missing file yields
    /// defaults; an unreadable or malformed one is an error.
    pub fn load() -> Result<Self, String> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            log::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::from_toml(&raw).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    /// Directory holding generated spreadsheets.
    pub fn export_dir(&self) -> PathBuf {
        Path::new(&self.runtime_root_path).join(&self.export_save_path)
    }

    /// Directory holding the poster background and generated posters.
    pub fn qrcode_dir(&self) -> PathBuf {
        Path::new(&self.runtime_root_path).join(&self.qrcode_save_path)
    }

    pub fn poster_background(&self) -> PathBuf {
        self.qrcode_dir().join(&self.poster.background)
    }

    /// Relative save path reported back to clients, e.g. `export/tags-1.xlsx`.
    pub fn export_save_url(&self, filename: &str) -> String {
        format!("{}{}", self.export_save_path, filename)
    }

    pub fn export_url(&self, filename: &str) -> String {
        format!("{}/{}", self.prefix_url.trim_end_matches('/'), self.export_save_url(filename))
    }

    pub fn poster_save_url(&self, filename: &str) -> String {
        format!("{}{}", self.qrcode_save_path, filename)
    }

    pub fn poster_url(&self, filename: &str) -> String {
        format!("{}/{}", self.prefix_url.trim_end_matches('/'), self.poster_save_url(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.poster.qr_size, 300);
        assert_eq!(cfg.poster.rect.width(), 550);
        assert_eq!(cfg.poster.rect.height(), 700);
        assert_eq!(cfg.poster.anchor, Point { x: 125, y: 298 });
    }

    #[test]
    fn partial_override() {
        let cfg = AppConfig::from_toml(
            r#"
            page_size = 25
            prefix_url = "https://blog.example.com/"

            [poster]
            qr_size = 120
            "#,
        )
        .unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.poster.qr_size, 120);
        assert_eq!(cfg.poster.background, "bg.jpg");
        assert_eq!(
            cfg.export_url("tags-1.xlsx"),
            "https://blog.example.com/export/tags-1.xlsx"
        );
    }

    #[test]
    fn malformed_is_an_error() {
        assert!(AppConfig::from_toml("page_size = \"ten\"").is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = AppConfig::load_from(Path::new("/nonexistent/gazette/app.toml")).unwrap();
        assert_eq!(cfg.export_save_path, "export/");
    }

    #[test]
    fn derived_paths() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.export_dir(), PathBuf::from("runtime/export/"));
        assert_eq!(cfg.poster_background(), PathBuf::from("runtime/qrcode/bg.jpg"));
        assert_eq!(cfg.poster_save_url("p.jpg"), "qrcode/p.jpg");
        assert_eq!(cfg.poster_url("p.jpg"), "http://127.0.0.1:8000/qrcode/p.jpg");
    }
}
