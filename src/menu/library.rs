use crate::art::matcher;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const ROM_EXTENSIONS: [&str; 4] = ["sfc", "smc", "zip", "fig"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomEntry {
    /// Bare filename; doubles as the art cache key.
    pub filename: String,
    pub full_path: PathBuf,
    pub display_name: String,
}

impl RomEntry {
    pub fn new(filename: &str, dir: &Path) -> Self {
        Self {
            filename: filename.to_string(),
            full_path: dir.join(filename),
            display_name: display_name_for(filename),
        }
    }
}

#[inline(always)]
fn is_rom_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ROM_EXTENSIONS.iter().any(|r| ext.eq_ignore_ascii_case(r)))
}

/// Normalized name with each word capitalized. Names that normalize to
/// nothing keep their filename.
pub fn display_name_for(filename: &str) -> String {
    let normalized = matcher::normalize(filename);
    if normalized.is_empty() {
        return filename.to_string();
    }
    normalized
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lists ROM files directly inside `dir`, sorted by display name. An
/// unreadable directory yields an empty library.
pub fn scan_rom_directory(dir: &Path) -> Vec<RomEntry> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        warn!("Could not read ROM directory '{}'.", dir.display());
        return Vec::new();
    };

    let mut roms = Vec::new();
    for entry in read_dir.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_rom_file(&path) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        roms.push(RomEntry::new(&name, dir));
    }
    roms.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.filename.cmp(&b.filename))
    });
    info!("Found {} ROM(s) in '{}'.", roms.len(), dir.display());
    roms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(display_name_for("super mario world (USA).sfc"), "Super Mario World");
        assert_eq!(
            display_name_for("Legend of Zelda, The - A Link to the Past (USA).smc"),
            "Legend Of Zelda The A Link To The Past"
        );
        assert_eq!(display_name_for("(Beta).sfc"), "(Beta).sfc");
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "zombies ate my neighbors.SFC",
            "Chrono Trigger (USA).smc",
            "notes.txt",
            "Axelay (Japan).zip",
            "cover.png",
            "F-Zero.fig",
        ] {
            fs::write(dir.path().join(name), b"rom").unwrap();
        }
        fs::create_dir(dir.path().join("folder.sfc")).unwrap();

        let roms = scan_rom_directory(dir.path());
        let names: Vec<&str> = roms.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(
            names,
            ["Axelay", "Chrono Trigger", "F Zero", "Zombies Ate My Neighbors"]
        );
        assert_eq!(roms[1].filename, "Chrono Trigger (USA).smc");
        assert_eq!(roms[1].full_path, dir.path().join("Chrono Trigger (USA).smc"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_rom_directory(&dir.path().join("nope")).is_empty());
    }
}
