use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A meeting announcement discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// File stem without its ordering prefix
    pub name: String,
    pub path: PathBuf,
}

/// Collect the `.txt` announcements under `root`, sorted by path.
///
/// Expected layout (any depth):
///   {root}/{season}/{NN_meeting}.txt
///
/// A file passed as `root` is returned on its own. Index and note files are skipped.
pub fn scan_announcements(root: &Path) -> Vec<Announcement> {
    let skip_names: &[&str] = &["indice", "index", "note", "readme"];

    let mut results: Vec<Announcement> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                return None;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem.starts_with('.') {
                return None;
            }

            // Strip leading numeric prefix (e.g. "02_trofeo_ravenna" → "trofeo_ravenna")
            let clean_stem = strip_numeric_prefix(stem);
            if skip_names.contains(&clean_stem.to_lowercase().as_str()) {
                return None;
            }
            Some(Announcement {
                name: clean_stem.to_string(),
                path,
            })
        })
        .collect();

    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}

/// Strip leading "NN_" prefix from filenames.
fn strip_numeric_prefix(s: &str) -> &str {
    if let Some(idx) = s.find('_') {
        let prefix = &s[..idx];
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            return &s[idx + 1..];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_strip_numeric_prefix() {
        assert_eq!(strip_numeric_prefix("02_trofeo_ravenna"), "trofeo_ravenna");
        assert_eq!(strip_numeric_prefix("trofeo_ravenna"), "trofeo_ravenna");
        assert_eq!(strip_numeric_prefix("_x"), "_x");
    }

    #[test]
    fn test_scan_announcements() {
        let dir = tempfile::tempdir().unwrap();
        let season = dir.path().join("2022");
        fs::create_dir_all(&season).unwrap();
        fs::write(season.join("02_meeting_auguri.txt"), "ore 9.00").unwrap();
        fs::write(season.join("01_trofeo_ravenna.txt"), "400 SL").unwrap();
        fs::write(season.join("00_indice.txt"), "").unwrap();
        fs::write(season.join("locandina.pdf"), "").unwrap();

        let found = scan_announcements(dir.path());
        let names: Vec<&str> = found.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["trofeo_ravenna", "meeting_auguri"]);

        let single = scan_announcements(&season.join("02_meeting_auguri.txt"));
        assert_eq!(single.len(), 1);
    }
}
