use crate::domain::{DedupScope, FIELDNAMES};
use crate::scraper::ScraperError;
use crate::sinks::{output_name, Commit, ResultBatch, ResultSink};
use chrono::{DateTime, Local};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::info;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";

pub const INFO_SHEET_TITLE: &str = "Info";
pub const ATTRIBUTION_BANNER: &str = "Listing data collected from www.zillow.com search results";
const SHARE_MESSAGE: &str = "Here is your zipcode list";

const DISCLAIMER: &str = "\
Here are your Zillow results for {}

Results are collected automatically from public search result pages.
Listings that share an address are reported once.

Disclaimer:

All investments, including real estate, are highly speculative in nature and
involve substantial risk of loss. Get personal advice from a professional
investment advisor and make independent investigations before acting on this
information. The data is taken from third-party listings without independent
verification, so it may be inaccurate or incomplete. Nothing here is a
warranty or guarantee of the outcome of any action taken in reliance on it.";

/// Horizontal alignment of a styled range. Every styled range uses the same
/// bold dark-blue on light-blue look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
}

impl Alignment {
    fn as_api(self) -> &'static str {
        match self {
            Alignment::Left => "LEFT",
            Alignment::Center => "CENTER",
        }
    }
}

/// Zero-based, end-exclusive block of cells on one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub sheet_id: i64,
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl CellRange {
    pub fn row(sheet_id: i64, row: u32, start_col: u32, end_col: u32) -> Self {
        Self {
            sheet_id,
            start_row: row,
            end_row: row + 1,
            start_col,
            end_col,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub url: String,
    pub first_sheet_id: i64,
}

/// The handful of spreadsheet-backend calls the sink needs.
pub trait SheetsApi {
    fn create_document(
        &self,
        title: &str,
        first_sheet_title: &str,
    ) -> Result<RemoteDocument, ScraperError>;

    /// Returns the new sheet's id.
    fn add_sheet(
        &self,
        document_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<i64, ScraperError>;

    /// Overwrite the sheet starting at A1.
    fn write_rows(
        &self,
        document_id: &str,
        sheet_title: &str,
        rows: &[Vec<String>],
    ) -> Result<(), ScraperError>;

    fn format_range(
        &self,
        document_id: &str,
        range: CellRange,
        alignment: Alignment,
    ) -> Result<(), ScraperError>;

    fn share(&self, document_id: &str, email: &str, message: &str) -> Result<(), ScraperError>;
}

/// Google Sheets v4 + Drive v3 over blocking HTTP with a bearer token.
pub struct GoogleSheetsClient {
    client: Client,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
    spreadsheet_url: String,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
}

impl GoogleSheetsClient {
    pub fn new(token: String) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| ScraperError::Sink(e.to_string()))?;
        Ok(Self { client, token })
    }

    fn send(&self, what: &str, request: RequestBuilder) -> Result<Value, ScraperError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| ScraperError::Sink(format!("{what}: request failed: {e}")))?;

        let status = response.status();
        let text = response.text().unwrap_or_else(|_| "(no body)".to_string());
        if !status.is_success() {
            return Err(ScraperError::Sink(format!(
                "{what}: API error: {status} - {text}"
            )));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ScraperError::Sink(format!("{what}: unreadable response: {e}")))
    }

    fn batch_update(&self, document_id: &str, requests: Value) -> Result<Value, ScraperError> {
        self.send(
            "batchUpdate",
            self.client
                .post(format!("{SHEETS_API}/{document_id}:batchUpdate"))
                .json(&json!({ "requests": requests })),
        )
    }
}

impl SheetsApi for GoogleSheetsClient {
    fn create_document(
        &self,
        title: &str,
        first_sheet_title: &str,
    ) -> Result<RemoteDocument, ScraperError> {
        let body = json!({
            "properties": { "title": title },
            "sheets": [ { "properties": { "title": first_sheet_title } } ]
        });
        let value = self.send("create", self.client.post(SHEETS_API).json(&body))?;
        let created: CreatedSpreadsheet = serde_json::from_value(value)
            .map_err(|e| ScraperError::Sink(format!("create: unexpected response: {e}")))?;

        let first_sheet_id = created
            .sheets
            .first()
            .map(|s| s.properties.sheet_id)
            .unwrap_or(0);

        Ok(RemoteDocument {
            id: created.spreadsheet_id,
            url: created.spreadsheet_url,
            first_sheet_id,
        })
    }

    fn add_sheet(
        &self,
        document_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<i64, ScraperError> {
        let reply = self.batch_update(
            document_id,
            json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]),
        )?;

        reply["replies"][0]["addSheet"]["properties"]["sheetId"]
            .as_i64()
            .ok_or_else(|| ScraperError::Sink("addSheet: sheetId missing from reply".into()))
    }

    fn write_rows(
        &self,
        document_id: &str,
        sheet_title: &str,
        rows: &[Vec<String>],
    ) -> Result<(), ScraperError> {
        let range = format!("'{}'!A1", sheet_title.replace('\'', "''"));

        let mut url = Url::parse(SHEETS_API).map_err(|e| ScraperError::Sink(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ScraperError::Sink("sheets url cannot be a base".into()))?
            .push(document_id)
            .push("values")
            .push(&range);

        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.send(
            "values.update",
            self.client
                .put(url)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
        )?;
        Ok(())
    }

    fn format_range(
        &self,
        document_id: &str,
        range: CellRange,
        alignment: Alignment,
    ) -> Result<(), ScraperError> {
        self.batch_update(
            document_id,
            json!([{
                "repeatCell": {
                    "range": {
                        "sheetId": range.sheet_id,
                        "startRowIndex": range.start_row,
                        "endRowIndex": range.end_row,
                        "startColumnIndex": range.start_col,
                        "endColumnIndex": range.end_col
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "backgroundColor": { "red": 0.7, "green": 0.77, "blue": 0.87 },
                            "textFormat": {
                                "bold": true,
                                "foregroundColor": { "red": 0.0, "green": 0.0, "blue": 0.54 }
                            },
                            "horizontalAlignment": alignment.as_api()
                        }
                    },
                    "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
                }
            }]),
        )?;
        Ok(())
    }

    fn share(&self, document_id: &str, email: &str, message: &str) -> Result<(), ScraperError> {
        let body = json!({ "type": "user", "role": "owner", "emailAddress": email });
        self.send(
            "share",
            self.client
                .post(format!("{DRIVE_API}/{document_id}/permissions"))
                .query(&[
                    ("sendNotificationEmail", "true"),
                    ("transferOwnership", "true"),
                    ("emailMessage", message),
                ])
                .json(&body),
        )?;
        Ok(())
    }
}

/// One remote document per run: an info sheet plus one data sheet per postal
/// code, shared with `recipient` on finalize.
///
/// Nothing is rolled back if a call fails part way; the document keeps
/// whatever was written before the failure.
pub struct SpreadsheetSink<A: SheetsApi> {
    api: A,
    recipient: String,
    title: String,
    description: String,
    document: Option<RemoteDocument>,
    sheets: HashSet<String>,
}

impl<A: SheetsApi> SpreadsheetSink<A> {
    pub fn new(api: A, recipient: &str, description: &str, run_started: DateTime<Local>) -> Self {
        Self {
            api,
            recipient: recipient.to_string(),
            title: output_name(run_started, description),
            description: description.to_string(),
            document: None,
            sheets: HashSet::new(),
        }
    }

    fn document(&mut self) -> Result<RemoteDocument, ScraperError> {
        if let Some(doc) = &self.document {
            return Ok(doc.clone());
        }

        info!(title = %self.title, "creating spreadsheet");
        let doc = self.api.create_document(&self.title, INFO_SHEET_TITLE)?;
        // Keep the handle before filling the info sheet so a failure below
        // still leaves the document reachable.
        self.document = Some(doc.clone());

        let lines = disclaimer_lines(&self.description);
        let rows: Vec<Vec<String>> = lines.iter().map(|l| vec![l.clone()]).collect();
        self.api.write_rows(&doc.id, INFO_SHEET_TITLE, &rows)?;

        for row in heading_rows(&lines) {
            self.api.format_range(
                &doc.id,
                CellRange::row(doc.first_sheet_id, row, 0, 5),
                Alignment::Left,
            )?;
        }

        Ok(doc)
    }
}

impl<A: SheetsApi> ResultSink for SpreadsheetSink<A> {
    fn dedup_scope(&self) -> DedupScope {
        DedupScope::PerPostalCode
    }

    fn add(&mut self, postal_code: &str, batch: ResultBatch) -> Result<(), ScraperError> {
        if !self.sheets.insert(postal_code.to_string()) {
            return Err(ScraperError::Sink(format!(
                "sheet for {postal_code} already written"
            )));
        }

        let doc = self.document()?;
        let cols = FIELDNAMES.len() as u32;
        let rows = data_sheet_rows(&batch);

        info!(postal_code, listings = batch.len(), "writing data sheet");
        let sheet_id = self
            .api
            .add_sheet(&doc.id, postal_code, rows.len() as u32, cols)?;
        self.api.write_rows(&doc.id, postal_code, &rows)?;
        self.api
            .format_range(&doc.id, CellRange::row(sheet_id, 0, 0, 1), Alignment::Left)?;
        self.api.format_range(
            &doc.id,
            CellRange::row(sheet_id, 1, 0, cols),
            Alignment::Center,
        )?;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<Commit, ScraperError> {
        let doc = self.document()?;
        info!(recipient = %self.recipient, "sharing spreadsheet");
        self.api.share(&doc.id, &self.recipient, SHARE_MESSAGE)?;
        Ok(Commit::Spreadsheet {
            id: doc.id,
            url: doc.url,
        })
    }
}

fn disclaimer_lines(description: &str) -> Vec<String> {
    DISCLAIMER
        .replacen("{}", description, 1)
        .lines()
        .map(str::to_string)
        .collect()
}

/// The title line and any "Heading:" line get the banner style.
fn heading_rows(lines: &[String]) -> Vec<u32> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| *i == 0 || line.trim_end().ends_with(':'))
        .map(|(i, _)| i as u32)
        .collect()
}

/// Banner row, header row, then one row per listing.
fn data_sheet_rows(batch: &ResultBatch) -> Vec<Vec<String>> {
    let cols = FIELDNAMES.len();

    let mut banner = vec![String::new(); cols];
    banner[0] = ATTRIBUTION_BANNER.to_string();

    let mut rows = Vec::with_capacity(batch.len() + 2);
    rows.push(banner);
    rows.push(FIELDNAMES.iter().map(|f| f.to_string()).collect());
    rows.extend(batch.iter().map(|l| l.field_values().to_vec()));
    rows
}
