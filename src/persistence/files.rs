use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Get the vault directory - checks for a local .taskvault first, then falls
/// back to the global ~/.taskvault
pub fn get_vault_dir() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Could not determine current directory")?;
    if let Some(local_dir) = find_local_vault(&current_dir) {
        return Ok(local_dir);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".taskvault"))
}

/// Find a local .taskvault directory by walking up the directory tree
fn find_local_vault(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let vault_dir = current.join(".taskvault");
        if vault_dir.exists() && vault_dir.is_dir() {
            return Some(vault_dir);
        }

        current = current.parent()?;
    }
}

/// Initialize a local .taskvault directory in the current directory
pub fn init_local_vault() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Could not determine current directory")?;
    let vault_dir = current_dir.join(".taskvault");

    if vault_dir.exists() {
        anyhow::bail!("Vault directory already exists: {}", vault_dir.display());
    }

    fs::create_dir_all(&vault_dir)
        .with_context(|| format!("Failed to create directory: {}", vault_dir.display()))?;
    ensure_vault_dirs(&vault_dir)?;

    Ok(vault_dir)
}

/// Create the vault's data/, backups/ and reports/ sub-directories.
pub fn ensure_vault_dirs(base: &Path) -> io::Result<()> {
    fs::create_dir_all(data_dir(base))?;
    fs::create_dir_all(backups_dir(base))?;
    fs::create_dir_all(reports_dir(base))?;
    Ok(())
}

pub fn data_dir(base: &Path) -> PathBuf {
    base.join("data")
}

pub fn backups_dir(base: &Path) -> PathBuf {
    base.join("backups")
}

pub fn reports_dir(base: &Path) -> PathBuf {
    base.join("reports")
}

/// Atomically write content to a file using temp file + rename
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
    let path = path.as_ref();
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "file path has no parent directory")
    })?;

    // Temp file in the same directory so the rename stays on one filesystem
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(content.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Append a single line to a file (for the activity log)
pub fn append_line<P: AsRef<Path>>(path: P, line: &str) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;

    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;

    Ok(())
}

/// Read file content, return empty string if file doesn't exist
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("test.txt");

        let content = "Hello, world!";
        atomic_write(&test_file, content).unwrap();

        let read_content = read_file(&test_file).unwrap();
        assert_eq!(read_content, content);
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("test.txt");

        atomic_write(&test_file, "first").unwrap();
        atomic_write(&test_file, "second").unwrap();

        assert_eq!(read_file(&test_file).unwrap(), "second");
    }

    #[test]
    fn test_read_nonexistent_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("nonexistent.txt");

        let content = read_file(&test_file).unwrap();
        assert_eq!(content, "");
    }

    #[test]
    fn test_append_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("test.log");

        append_line(&test_file, "Line 1").unwrap();
        append_line(&test_file, "Line 2").unwrap();

        let content = read_file(&test_file).unwrap();
        assert_eq!(content, "Line 1\nLine 2\n");
    }

    #[test]
    fn test_ensure_vault_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        ensure_vault_dirs(temp_dir.path()).unwrap();

        assert!(data_dir(temp_dir.path()).is_dir());
        assert!(backups_dir(temp_dir.path()).is_dir());
        assert!(reports_dir(temp_dir.path()).is_dir());
    }
}
