use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: Version-control marker used to locate a project root
const ROOT_MARKER: &str = ".git";

// @const: Mode of newly generated files (rw-r--r--)
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for an exercise document
    // @params: input_file, suffix inserted before the extension
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P, suffix: &str) -> PathBuf {
        let input_file = input_file.as_ref();

        // Get the file stem (filename without extension)
        let stem = input_file.file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push_str(suffix);
        if let Some(ext) = input_file.extension() {
            output_filename.push('.');
            output_filename.push_str(&ext.to_string_lossy());
        }

        input_file.with_file_name(output_filename)
    }

    /// Whether a file name looks like a generated exercise document
    pub fn is_generated<P: AsRef<Path>>(path: P, suffix: &str) -> bool {
        path.as_ref()
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(suffix))
    }

    /// Find source documents under a directory, skipping generated ones
    ///
    /// Results are sorted so batch order does not depend on directory listing order.
    pub fn find_documents<P: AsRef<Path>>(dir: P, extensions: &[String], suffix: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() || Self::is_generated(path, suffix) {
                continue;
            }

            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy();
                if extensions.iter().any(|wanted| wanted.trim_start_matches('.') == ext) {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> io::Result<String> {
        fs::read_to_string(path)
    }

    /// Write a string to a file through a temporary file and an atomic rename
    ///
    /// The destination is either fully written or left as it was. An existing
    /// destination keeps its permissions; a new file gets `NEW_FILE_MODE` on unix.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;

        // Temp files are created owner-only
        if let Some(permissions) = Self::output_permissions(path) {
            temp.as_file().set_permissions(permissions)?;
        }

        temp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    // @returns: Permissions a written output should end up with
    fn output_permissions(path: &Path) -> Option<fs::Permissions> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => Some(metadata.permissions()),
            _ => Self::new_file_permissions(),
        }
    }

    #[cfg(unix)]
    fn new_file_permissions() -> Option<fs::Permissions> {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(NEW_FILE_MODE))
    }

    #[cfg(not(unix))]
    fn new_file_permissions() -> Option<fs::Permissions> {
        None
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Get current timestamp
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        // Open file in append mode, create if it doesn't exist
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        // Write content with timestamp
        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Nearest ancestor of `start` (inclusive) that contains a `.git` entry
    pub fn find_project_root<P: AsRef<Path>>(start: P) -> Option<PathBuf> {
        start
            .as_ref()
            .ancestors()
            .find(|dir| dir.join(ROOT_MARKER).exists())
            .map(Path::to_path_buf)
    }
}
