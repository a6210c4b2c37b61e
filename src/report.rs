use serde::Serialize;

use std::fmt;

/// Final verdict for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Authorized,
    NotAuthorized,
    /// OCR ran but nothing alphanumeric came out
    Unrecognized,
    OcrError,
    ImageError,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Authorized,
        Status::NotAuthorized,
        Status::Unrecognized,
        Status::OcrError,
        Status::ImageError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Authorized => "AUTHORIZED",
            Status::NotAuthorized => "NOT_AUTHORIZED",
            Status::Unrecognized => "UNRECOGNIZED",
            Status::OcrError => "OCR_ERROR",
            Status::ImageError => "IMAGE_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionResult {
    /// file name of the input image
    pub source: String,
    /// normalized plate, absent unless OCR produced something usable
    pub plate: Option<String>,
    pub status: Status,
}

/// Results in input order, one per image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub results: Vec<RecognitionResult>,
}

impl Report {

    pub fn new(results: Vec<RecognitionResult>) -> Self {
        Self { results }
    }

    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = Status::ALL.iter()
            .map(|s| format!("{}: {}", s, self.count(*s)))
            .collect();
        format!("{} images, {}", self.results.len(), parts.join(", "))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain fixed-width table for the console.
    pub fn render_table(&self) -> String {
        let headers = ["FILE", "PLATE", "STATUS"];
        let rows: Vec<[String; 3]> = self.results.iter()
            .map(|r| [
                r.source.clone(),
                r.plate.clone().unwrap_or_else(|| "-".to_string()),
                r.status.to_string(),
            ])
            .collect();

        let mut widths = headers.map(|h| h.chars().count());
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: [&str; 3]| -> String {
            let padded: Vec<String> = cells.iter().zip(widths.iter())
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect();
            padded.join("  ").trim_end().to_string()
        };
        let mut out = Vec::with_capacity(rows.len() + 2);
        out.push(line(headers));
        let dashes = widths.map(|w| "-".repeat(w));
        out.push(line([dashes[0].as_str(), dashes[1].as_str(), dashes[2].as_str()]));
        for row in &rows {
            out.push(line([row[0].as_str(), row[1].as_str(), row[2].as_str()]));
        }
        out.join("\n")
    }
}
