//! Source dataset catalogs

use crate::api::{parse_url, ApiClient};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// A dataset that could feed a staging tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDataset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "modifiedTime")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "createdTime")]
    pub created_at: Option<DateTime<Utc>>,
}

impl CandidateDataset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            modified_at: None,
            created_at: None,
        }
    }

    pub fn modified(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Anything that can enumerate candidate datasets
pub trait DatasetCatalog {
    fn list_datasets(&self) -> Result<Vec<CandidateDataset>>;
}

impl DatasetCatalog for Vec<CandidateDataset> {
    fn list_datasets(&self) -> Result<Vec<CandidateDataset>> {
        Ok(self.clone())
    }
}

/// Spreadsheets stored anywhere under a shared-drive folder
#[derive(Debug, Clone)]
pub struct DriveCatalog {
    api: ApiClient,
    drive_id: String,
    root_folder_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct FileList<T> {
    #[serde(default)]
    files: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FolderEntry {
    id: String,
}

impl DriveCatalog {
    /// Catalog rooted at the shared drive itself
    pub fn new(api: ApiClient, drive_id: impl Into<String>) -> Self {
        let drive_id = drive_id.into();
        Self {
            api,
            root_folder_id: drive_id.clone(),
            drive_id,
        }
    }

    fn list_children<T: serde::de::DeserializeOwned>(
        &self,
        folder_id: &str,
        mime_type: &str,
        fields: &str,
    ) -> Result<Vec<T>> {
        let query = format!(
            "'{}' in parents and mimeType='{}' and trashed=false",
            folder_id, mime_type
        );
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("corpora", "drive".to_string()),
                ("driveId", self.drive_id.clone()),
                ("includeItemsFromAllDrives", "true".to_string()),
                ("supportsAllDrives", "true".to_string()),
                ("fields", fields.to_string()),
                ("pageSize", "1000".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let request = self.api.get(parse_url(DRIVE_FILES_URL)?).query(&params);
            let page: FileList<T> = self.api.send_json(request)?;
            entries.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(entries)
    }

    fn list_recursive(&self, folder_id: &str, out: &mut Vec<CandidateDataset>) -> Result<()> {
        let files: Vec<CandidateDataset> = self.list_children(
            folder_id,
            SPREADSHEET_MIME,
            "nextPageToken, files(id, name, modifiedTime, createdTime)",
        )?;
        log::debug!("Folder {}: {} spreadsheets", folder_id, files.len());
        out.extend(files);

        let folders: Vec<FolderEntry> =
            self.list_children(folder_id, FOLDER_MIME, "nextPageToken, files(id, name)")?;
        for folder in folders {
            self.list_recursive(&folder.id, out)?;
        }
        Ok(())
    }
}

impl DatasetCatalog for DriveCatalog {
    fn list_datasets(&self) -> Result<Vec<CandidateDataset>> {
        let mut datasets = Vec::new();
        self.list_recursive(&self.root_folder_id, &mut datasets)?;
        log::info!(
            "Found {} spreadsheets in shared drive {} (recursive)",
            datasets.len(),
            self.drive_id
        );
        Ok(datasets)
    }
}
