use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

const TMP_SUFFIX: &str = "tmp";

/// Sibling of `path` with `.tmp` appended to its extension.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to a temporary sibling and renames it over `path`, so
/// readers see either the old contents or the new ones.
pub fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    drop(file);
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_name_keeps_the_extension() {
        assert_eq!(
            tmp_path(Path::new("config/config.json")),
            PathBuf::from("config/config.json.tmp")
        );
        assert_eq!(tmp_path(Path::new("notes")), PathBuf::from("notes.tmp"));
    }

    #[test]
    fn replaces_contents_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("nested").join("entry.json");
        write_atomic(&target, "[1]").unwrap();
        write_atomic(&target, "[2]").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "[2]");
        assert!(!tmp_path(&target).exists());
        let names: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["entry.json"]);
    }
}
