//! Volume catalog file.
//!
//! One volume per line, as three whitespace-separated double-quoted strings:
//!
//! ```text
//! # folder                     template                 extension
//! "C:/Data/CT_Scans/Bison"    "AMNH-mammals-232575_"   ".tif"
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::Path;

use crate::error::ConfigError;

use super::VolumeDescriptor;

/// Ordered list of selectable volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeCatalog {
    volumes: Vec<VolumeDescriptor>,
}

impl VolumeCatalog {
    pub fn new(volumes: Vec<VolumeDescriptor>) -> Self {
        Self { volumes }
    }

    /// Parse catalog text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut volumes = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = split_quoted(line).map_err(|message| ConfigError::InvalidLine {
                line: index + 1,
                message,
            })?;

            match <[String; 3]>::try_from(fields) {
                Ok([folder, template, ext]) => {
                    volumes.push(VolumeDescriptor::new(folder, template, ext))
                }
                Err(fields) => {
                    return Err(ConfigError::InvalidLine {
                        line: index + 1,
                        message: format!("expected 3 quoted fields, found {}", fields.len()),
                    })
                }
            }
        }

        Ok(Self { volumes })
    }

    /// Read and parse a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn volumes(&self) -> &[VolumeDescriptor] {
        &self.volumes
    }

    pub fn get(&self, index: usize) -> Option<&VolumeDescriptor> {
        self.volumes.get(index)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Split a line into its quoted literals.
fn split_quoted(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        match chars.next() {
            None => return Ok(fields),
            Some('"') => {}
            Some(c) => return Err(format!("unexpected character '{c}' outside quotes")),
        }

        let mut field = String::new();
        loop {
            match chars.next() {
                Some('"') => break,
                Some(c) => field.push(c),
                None => return Err("unterminated quoted string".to_string()),
            }
        }

        if let Some(&c) = chars.peek() {
            if !c.is_whitespace() {
                return Err(format!("missing whitespace after \"{field}\""));
            }
        }
        fields.push(field);
    }
}
