use ini::Ini;
use log::{LevelFilter, info, warn};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_PATH: &str = "boxart.ini";
const SECTION: &str = "Boxart";

pub const DEFAULT_BASE_URL: &str = "https://thumbnails.libretro.com/Nintendo%20-%20Super%20Nintendo%20Entertainment%20System/Named_Boxarts/";

const MAX_WORKERS: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory listing that doubles as the download prefix.
    pub base_url: String,
    pub cache_dir: PathBuf,
    /// Background art workers, clamped to 1..=4.
    pub workers: u8,
    /// Box blur radius for side-card art. 0 disables the blurred copy.
    pub blur_radius: u32,
    /// Ceiling on entries holding textures. 0 = unbounded.
    pub max_loaded: usize,
    /// Texture uploads per `poll`. 0 = unbounded.
    pub uploads_per_frame: usize,
    /// Pause after each worker task.
    pub throttle_ms: u64,
    /// Cached files smaller than this are treated as interrupted downloads.
    pub min_file_bytes: u64,
    pub target_width: u32,
    pub target_height: u32,
    /// Items on each side of the selection requested at high priority.
    pub visible_range: usize,
    /// Textures further than this from the selection are unloaded. 0 = never.
    pub unload_distance: usize,
    pub request_timeout_secs: u32,
    pub index_timeout_secs: u32,
    pub log_level: LevelFilter,
}

fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("boxart"),
        |dirs| dirs.home_dir().join(".snes9x").join("boxart"),
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: default_cache_dir(),
            workers: 1,
            blur_radius: 2,
            max_loaded: 64,
            uploads_per_frame: 4,
            throttle_ms: 0,
            min_file_bytes: 100,
            target_width: 256,
            target_height: 178,
            visible_range: 3,
            unload_distance: 0,
            request_timeout_secs: 20,
            index_timeout_secs: 30,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    pub fn worker_count(&self) -> usize {
        usize::from(self.workers.clamp(1, MAX_WORKERS))
    }

    pub fn from_ini(conf: &Ini) -> Self {
        let default = Self::default();
        let get = |key: &str| conf.get_from(Some(SECTION), key).map(str::trim);

        fn parsed<T: FromStr>(raw: Option<&str>, fallback: T) -> T {
            raw.and_then(|v| v.parse::<T>().ok()).unwrap_or(fallback)
        }

        Self {
            base_url: get("BaseUrl")
                .filter(|v| !v.is_empty())
                .map_or(default.base_url, str::to_string),
            cache_dir: get("CacheDir")
                .filter(|v| !v.is_empty())
                .map_or(default.cache_dir, PathBuf::from),
            workers: parsed(get("Workers"), default.workers).clamp(1, MAX_WORKERS),
            blur_radius: parsed(get("BlurRadius"), default.blur_radius),
            max_loaded: parsed(get("MaxLoaded"), default.max_loaded),
            uploads_per_frame: parsed(get("UploadsPerFrame"), default.uploads_per_frame),
            throttle_ms: parsed(get("ThrottleMs"), default.throttle_ms),
            min_file_bytes: parsed(get("MinFileBytes"), default.min_file_bytes),
            target_width: parsed(get("TargetWidth"), default.target_width).max(1),
            target_height: parsed(get("TargetHeight"), default.target_height).max(1),
            visible_range: parsed(get("VisibleRange"), default.visible_range),
            unload_distance: parsed(get("UnloadDistance"), default.unload_distance),
            request_timeout_secs: parsed(get("RequestTimeoutSecs"), default.request_timeout_secs)
                .max(1),
            index_timeout_secs: parsed(get("IndexTimeoutSecs"), default.index_timeout_secs).max(1),
            log_level: parsed(get("LogLevel"), default.log_level),
        }
    }

    fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        conf.with_section(Some(SECTION))
            .set("BaseUrl", self.base_url.as_str())
            .set("BlurRadius", self.blur_radius.to_string())
            .set("CacheDir", self.cache_dir.to_string_lossy())
            .set("IndexTimeoutSecs", self.index_timeout_secs.to_string())
            .set("LogLevel", self.log_level.to_string())
            .set("MaxLoaded", self.max_loaded.to_string())
            .set("MinFileBytes", self.min_file_bytes.to_string())
            .set("RequestTimeoutSecs", self.request_timeout_secs.to_string())
            .set("TargetHeight", self.target_height.to_string())
            .set("TargetWidth", self.target_width.to_string())
            .set("ThrottleMs", self.throttle_ms.to_string())
            .set("UnloadDistance", self.unload_distance.to_string())
            .set("UploadsPerFrame", self.uploads_per_frame.to_string())
            .set("VisibleRange", self.visible_range.to_string())
            .set("Workers", self.workers.to_string());
        conf
    }
}

fn create_default_config_file(path: &Path) -> std::io::Result<()> {
    info!("'{}' not found, creating with default values.", path.display());
    Config::default().to_ini().write_to_file(path)
}

/// Reads `path`, writing a default file first if none exists. Missing or
/// unparsable keys fall back to their defaults.
pub fn load(path: &Path) -> Config {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    match Ini::load_from_file(path) {
        Ok(conf) => Config::from_ini(&conf),
        Err(e) => {
            warn!(
                "Failed to read config '{}': {e}; using defaults.",
                path.display()
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_and_falls_back_on_garbage() {
        let conf = Ini::load_from_str(
            "[Boxart]\n\
             BaseUrl=https://mirror.example/snes/\n\
             CacheDir=/tmp/art\n\
             Workers=9\n\
             BlurRadius=oops\n\
             MaxLoaded=12\n\
             UploadsPerFrame=0\n\
             TargetWidth=0\n\
             LogLevel=debug\n",
        )
        .unwrap();
        let cfg = Config::from_ini(&conf);
        let default = Config::default();
        assert_eq!(cfg.base_url, "https://mirror.example/snes/");
        assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/art"));
        assert_eq!(cfg.workers, MAX_WORKERS);
        assert_eq!(cfg.blur_radius, default.blur_radius);
        assert_eq!(cfg.max_loaded, 12);
        assert_eq!(cfg.uploads_per_frame, 0);
        assert_eq!(cfg.target_width, 1);
        assert_eq!(cfg.target_height, default.target_height);
        assert_eq!(cfg.log_level, LevelFilter::Debug);
    }

    #[test]
    fn empty_ini_is_default() {
        let cfg = Config::from_ini(&Ini::new());
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.worker_count(), 1);
    }

    #[test]
    fn load_writes_default_file_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_PATH);
        let cfg = load(&path);
        assert!(path.is_file());
        assert_eq!(cfg, Config::default());
        assert_eq!(load(&path), cfg);
    }
}
