//! Sources for the list of authorized plates.
//!
//! The list normally lives in a spreadsheet: one row per vehicle, a header
//! row, and the plate in the second column. Providers never fail outward; an
//! unreachable source is logged and reads as an empty list, which makes every
//! plate `NOT_AUTHORIZED`.

use log::{ debug, info, warn };
use serde::{ Deserialize, Serialize };

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::error::LprError;

pub trait AuthorizedListProvider {
    fn fetch_all(&self) -> Vec<String>;
}

/// Read-only snapshot of the authorized list for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedSet {
    entries: Vec<String>,
}

impl AuthorizedSet {

    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// The one fetch of a run.
    pub fn fetch(provider: &dyn AuthorizedListProvider) -> Self {
        let entries = provider.fetch_all();
        info!("loaded {} authorized plates", entries.len());
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, plate: &str) -> bool {
        crate::text::is_authorized(plate, &self.entries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizedConfig {
    pub csv_path: Option<PathBuf>,
    pub sheet_url: Option<String>,
    /// zero based column holding the plate
    pub column: usize,
    pub skip_header: bool,
    pub attempts: u32,
    pub timeout_secs: u64,
}

impl Default for AuthorizedConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            sheet_url: None,
            column: 1,
            skip_header: true,
            attempts: 3,
            timeout_secs: 10,
        }
    }
}

impl AuthorizedConfig {
    /// Provider for this configuration; the sheet wins over a local file,
    /// nothing configured means an empty list.
    pub fn provider(&self) -> Box<dyn AuthorizedListProvider> {
        if let Some(url) = &self.sheet_url {
            Box::new(SheetExport::new(url.clone(), self.clone()))
        } else if let Some(path) = &self.csv_path {
            Box::new(CsvFile::new(path.clone(), self.column, self.skip_header))
        } else {
            warn!("no authorized list configured, every plate will be NOT_AUTHORIZED");
            Box::new(StaticList::default())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticList(pub Vec<String>);

impl AuthorizedListProvider for StaticList {
    fn fetch_all(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// A CSV export of the sheet on disk.
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
    column: usize,
    skip_header: bool,
}

impl CsvFile {
    pub fn new(path: PathBuf, column: usize, skip_header: bool) -> Self {
        Self { path, column, skip_header }
    }
}

impl AuthorizedListProvider for CsvFile {
    fn fetch_all(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_rows(&content, self.column, self.skip_header),
            Err(e) => {
                warn!("could not read authorized list {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

/// A published spreadsheet fetched as CSV over HTTP, retried a fixed number
/// of times before giving up with an empty list.
#[derive(Debug, Clone)]
pub struct SheetExport {
    url: String,
    config: AuthorizedConfig,
}

impl SheetExport {

    pub fn new(url: String, config: AuthorizedConfig) -> Self {
        Self { url, config }
    }

    fn download(&self) -> Result<String, LprError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| LprError::fetch(e.to_string()))?;
        let response = client.get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| LprError::fetch(e.to_string()))?;
        response.text().map_err(|e| LprError::fetch(e.to_string()))
    }
}

impl AuthorizedListProvider for SheetExport {
    fn fetch_all(&self) -> Vec<String> {
        let attempts = self.config.attempts.max(1);
        for attempt in 1..=attempts {
            match self.download() {
                Ok(body) => return parse_rows(&body, self.config.column, self.config.skip_header),
                Err(e) => {
                    warn!("fetching authorized list failed (attempt {}/{}): {}", attempt, attempts, e);
                    if attempt < attempts {
                        thread::sleep(Duration::from_millis(500 * attempt as u64));
                    }
                }
            }
        }
        Vec::new()
    }
}

/// Plates from `column` of each CSV row, trimmed and uppercased. Rows that
/// are too short or have an empty cell are skipped.
pub fn parse_rows(content: &str, column: usize, skip_header: bool) -> Vec<String> {
    let skip = if skip_header { 1 } else { 0 };
    let plates: Vec<String> = content.lines()
        .skip(skip)
        .filter_map(|line| split_csv_line(line).into_iter().nth(column))
        .map(|cell| cell.trim().to_uppercase())
        .filter(|cell| !cell.is_empty())
        .collect();
    debug!("parsed {} plates from csv", plates.len());
    plates
}

// quoted fields may contain commas and doubled quotes, but not newlines
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}


#[cfg(test)]
mod test {
    use super::*;

    const SHEET: &str = "Owner,Plate,Model\r\n\
        Ana,abc-1234,Gol\r\n\
        \"Silva, J\",\" xyz 9999 \",Uno\r\n\
        Bia,,Palio\r\n\
        Short\r\n";

    #[test]
    fn parse_rows_reads_second_column_after_header() {
        let plates = parse_rows(SHEET, 1, true);
        assert_eq!(plates, vec!["ABC-1234".to_string(), "XYZ 9999".to_string()]);
    }

    #[test]
    fn parse_rows_without_header() {
        let plates = parse_rows("a,AAA1111\nb,bbb2222\n", 1, false);
        assert_eq!(plates, vec!["AAA1111".to_string(), "BBB2222".to_string()]);
    }

    #[test]
    fn quoted_cells_keep_commas_and_quotes() {
        assert_eq!(split_csv_line(r#"a,"b,c","say ""hi""""#), vec!["a", "b,c", "say \"hi\""]);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let provider = CsvFile::new(PathBuf::from("/definitely/not/here.csv"), 1, true);
        assert!(provider.fetch_all().is_empty());
    }

    #[test]
    fn csv_file_provider_reads_disk() {
        let path = std::env::temp_dir().join(format!("lpr_gate_authorized_{}.csv", std::process::id()));
        std::fs::write(&path, SHEET).unwrap();
        let set = AuthorizedSet::fetch(&CsvFile::new(path.clone(), 1, true));
        std::fs::remove_file(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("ABC1234"));
        assert!(set.contains("XYZ9999"));
    }

    #[test]
    fn unreachable_sheet_reads_as_empty() {
        let config = AuthorizedConfig { attempts: 1, timeout_secs: 1, ..AuthorizedConfig::default() };
        let provider = SheetExport::new("http://127.0.0.1:9/sheet.csv".to_string(), config);
        assert!(provider.fetch_all().is_empty());
    }

    #[test]
    fn retried_sheet_still_reads_as_empty() {
        let config = AuthorizedConfig { attempts: 2, timeout_secs: 1, ..AuthorizedConfig::default() };
        let provider = SheetExport::new("http://127.0.0.1:9/sheet.csv".to_string(), config);
        let start = std::time::Instant::now();
        assert!(provider.fetch_all().is_empty());
        // one backoff pause between the two attempts
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn unconfigured_provider_is_empty() {
        let set = AuthorizedSet::fetch(AuthorizedConfig::default().provider().as_ref());
        assert!(set.is_empty());
        assert!(!set.contains("ABC1234"));
    }
}
