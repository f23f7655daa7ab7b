//! Google Sheets backed [`TabularStore`].
//!
//! The spreadsheet is located by name through the Drive API, then its first
//! worksheet is read and appended to through the Sheets v4 `values`
//! endpoints. Appends use `valueInputOption=RAW` so ids such as
//! `2025/06/01 3` are not reinterpreted as dates.

use super::auth::{ServiceAccountKey, TokenSource};
use super::{StoreError, TabularStore};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, instrument};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Drive search query for a spreadsheet with exactly this name.
fn name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false")
}

/// A1 range covering a whole worksheet, quoted for titles with spaces.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Turn a non-success response into [`StoreError::Api`].
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// First worksheet of a named spreadsheet.
#[derive(Debug)]
pub struct SheetsStore {
    http: Client,
    tokens: TokenSource,
    spreadsheet_id: String,
    range: String,
}

impl SheetsStore {
    /// Authenticate with the key file at `credentials` and open the
    /// spreadsheet called `name`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the service account cannot see a
    /// spreadsheet with that name; credential and HTTP errors otherwise.
    #[instrument(level = "info", skip_all, fields(%name))]
    pub async fn open(credentials: &Path, name: &str) -> Result<Self, StoreError> {
        let key = ServiceAccountKey::from_file(credentials).await?;
        let http = Client::new();
        let mut tokens = TokenSource::new(key, http.clone());

        let token = tokens.token().await?;
        let files: FileList = check(
            http.get(DRIVE_FILES_URL)
                .bearer_auth(&token)
                .query(&[("q", name_query(name).as_str()), ("fields", "files(id)")])
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        let spreadsheet_id = files
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let spreadsheet: Spreadsheet = check(
            http.get(format!("{SHEETS_URL}/{spreadsheet_id}"))
                .bearer_auth(&token)
                .query(&[("fields", "sheets.properties.title")])
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        let title = spreadsheet
            .sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| StoreError::NotFound(format!("{name} (no worksheets)")))?;

        info!(%spreadsheet_id, sheet = %title, "Opened spreadsheet");
        Ok(Self {
            http,
            tokens,
            spreadsheet_id,
            range: sheet_range(&title),
        })
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{SHEETS_URL}/{}/values/{}{suffix}",
            self.spreadsheet_id,
            urlencoding::encode(&self.range)
        )
    }

    async fn append(&mut self, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let token = self.tokens.token().await?;
        let url = self.values_url(":append");
        check(
            self.http
                .post(url)
                .bearer_auth(&token)
                .query(&[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({ "values": rows }))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }
}

impl TabularStore for SheetsStore {
    async fn read_all_rows(&mut self) -> Result<Vec<Vec<String>>, StoreError> {
        let token = self.tokens.token().await?;
        let url = self.values_url("");
        let range: ValueRange = check(self.http.get(url).bearer_auth(&token).send().await?)
            .await?
            .json()
            .await?;
        let rows: Vec<Vec<String>> = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        debug!(rows = rows.len(), "Read sheet values");
        Ok(rows)
    }

    async fn append_row(&mut self, row: Vec<String>) -> Result<(), StoreError> {
        self.append(vec![row]).await
    }

    async fn append_rows(&mut self, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        debug!(rows = rows.len(), "Appending rows");
        self.append(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_query_escapes_quotes() {
        assert_eq!(
            name_query("ニュース収集シート"),
            "name = 'ニュース収集シート' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
        assert!(name_query("Bob's sheet").starts_with(r"name = 'Bob\'s sheet'"));
    }

    #[test]
    fn test_sheet_range_quoting() {
        assert_eq!(sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(sheet_range("シート1"), "'シート1'");
        assert_eq!(sheet_range("It's"), "'It''s'");
    }

    #[test]
    fn test_value_range_without_values_is_empty() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"'Sheet1'!A1:Z1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(json!("abc")), "abc");
        assert_eq!(cell_to_string(json!(42)), "42");
        assert_eq!(cell_to_string(json!(null)), "");
    }
}
