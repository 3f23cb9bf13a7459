use std::fs;
use std::path::{Path, PathBuf};

use crate::editing::Standoff;
use crate::error::StandoffError;
use crate::tree::xml::{self, XmlError};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Standoff(#[from] StandoffError),
}

/// Read a file and return its content
pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(path, content).map_err(IoError::Io)
}

/// Parse an XML string and track the text of its whole tree.
pub fn parse_str(source: &str) -> Result<Standoff, IoError> {
    Ok(Standoff::from_tree(xml::parse(source)?))
}

/// Parse an XML string and track the text under the first element named
/// `text_root`.
pub fn parse_str_with_text_root(source: &str, text_root: &str) -> Result<Standoff, IoError> {
    Ok(Standoff::with_text_root(xml::parse(source)?, text_root)?)
}

pub fn load(path: &Path) -> Result<Standoff, IoError> {
    log::debug!("loading {}", path.display());
    parse_str(&read_file(path)?)
}

pub fn load_with_text_root(path: &Path, text_root: &str) -> Result<Standoff, IoError> {
    log::debug!("loading {} with text root <{text_root}>", path.display());
    parse_str_with_text_root(&read_file(path)?, text_root)
}

/// Write the document as XML, rebuilding the tree first if edits are
/// pending.
pub fn save(standoff: &mut Standoff, path: &Path) -> Result<(), IoError> {
    standoff.synchronize()?;
    write_file(path, &standoff.to_xml())
}

/// Write the tracked annotations as JSON.
pub fn save_json(standoff: &Standoff, path: &Path) -> Result<(), IoError> {
    write_file(path, &standoff.to_json()?)
}
