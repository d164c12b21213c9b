use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

/// Prefix of default output file names
pub const OUTPUT_PREFIX: &str = "[translated] ";

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
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @checks: Word document by extension
    pub fn is_docx<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("docx"))
    }

    // @generates: `[translated] <name>` next to the input
    pub fn default_output_path<P: AsRef<Path>>(input_file: P) -> PathBuf {
        let input_file = input_file.as_ref();
        let name = input_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.docx".to_string());
        let dir = input_file.parent().unwrap_or(Path::new(""));
        dir.join(format!("{}{}", OUTPUT_PREFIX, name))
    }

    // @checks: Input is a readable .docx and output may be written
    pub fn check_paths(input_file: &Path, output_file: &Path, force_overwrite: bool) -> Result<()> {
        if !Self::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {}", input_file.display()));
        }
        if !Self::is_docx(input_file) {
            return Err(anyhow!("Input file is not a .docx document: {}", input_file.display()));
        }
        if input_file == output_file {
            return Err(anyhow!("Output file must differ from the input file"));
        }
        if output_file.exists() && !force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {}. Use -f to force overwrite.",
                output_file.display()
            ));
        }
        Ok(())
    }
}
