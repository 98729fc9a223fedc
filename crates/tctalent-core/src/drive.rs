// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document storage.
//!
//! Candidate documents live in one folder per candidate. [`LocalDrive`]
//! keeps them under a directory on disk and hands out `drive://` links.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::CoreError;

/// Scheme of links handed out by [`LocalDrive`].
pub const DRIVE_SCHEME: &str = "drive://";

/// A folder in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub name: String,
    pub url: String,
}

/// A file uploaded to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub url: String,
}

/// Folder and file operations on the document store.
#[async_trait]
pub trait FileSystemService: Send + Sync {
    /// Create `name` inside the folder linked by `parent`, or at the top
    /// level. An existing folder of that name is returned as is.
    async fn create_folder(&self, parent: Option<&str>, name: &str) -> Result<Folder, CoreError>;

    /// Store `content` as `name` in the folder linked by `folder`,
    /// replacing any file of the same name.
    async fn upload_file(
        &self,
        folder: &str,
        name: &str,
        content: &[u8],
    ) -> Result<StoredFile, CoreError>;
}

/// Replace path separators so a user supplied name stays one path segment.
pub fn sanitize_file_name(name: &str) -> Result<String, CoreError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(CoreError::invalid_request(format!(
            "Invalid file name '{}'",
            name
        )));
    }
    Ok(cleaned)
}

/// [`FileSystemService`] on the local file system.
#[derive(Debug, Clone)]
pub struct LocalDrive {
    root: PathBuf,
}

impl LocalDrive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path of a `drive://` link. Rejects links escaping the root.
    fn relative_path(link: &str) -> Result<PathBuf, CoreError> {
        let relative = link
            .strip_prefix(DRIVE_SCHEME)
            .ok_or_else(|| CoreError::invalid_request(format!("Not a drive link: '{}'", link)))?;
        let path = PathBuf::from(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(CoreError::invalid_request(format!(
                "Invalid drive link: '{}'",
                link
            )));
        }
        Ok(path)
    }

    fn link(relative: &Path) -> String {
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("{}{}", DRIVE_SCHEME, parts.join("/"))
    }

    /// Absolute path of the object behind a `drive://` link.
    pub fn resolve(&self, link: &str) -> Result<PathBuf, CoreError> {
        Ok(self.root.join(Self::relative_path(link)?))
    }
}

fn fs_error(operation: &str, err: std::io::Error) -> CoreError {
    CoreError::FileSystem {
        operation: operation.to_string(),
        details: err.to_string(),
    }
}

#[async_trait]
impl FileSystemService for LocalDrive {
    async fn create_folder(&self, parent: Option<&str>, name: &str) -> Result<Folder, CoreError> {
        let name = sanitize_file_name(name)?;
        let relative = match parent {
            Some(parent) => Self::relative_path(parent)?.join(&name),
            None => PathBuf::from(&name),
        };

        let path = self.root.join(&relative);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| fs_error("create_folder", e))?;
        debug!(path = %path.display(), "Created drive folder");

        Ok(Folder {
            name,
            url: Self::link(&relative),
        })
    }

    async fn upload_file(
        &self,
        folder: &str,
        name: &str,
        content: &[u8],
    ) -> Result<StoredFile, CoreError> {
        let name = sanitize_file_name(name)?;
        let folder_path = self.resolve(folder)?;
        if !tokio::fs::try_exists(&folder_path)
            .await
            .map_err(|e| fs_error("upload_file", e))?
        {
            return Err(CoreError::no_such_object("Folder", folder));
        }

        let relative = Self::relative_path(folder)?.join(&name);
        tokio::fs::write(self.root.join(&relative), content)
            .await
            .map_err(|e| fs_error("upload_file", e))?;
        debug!(file = %relative.display(), bytes = content.len(), "Stored drive file");

        Ok(StoredFile {
            name,
            url: Self::link(&relative),
        })
    }
}
