//! Text extraction over a preprocessed plate crop.

use image::{ GrayImage, ImageFormat };
use log::{ debug, info, warn };
use serde::{ Deserialize, Serialize };
use thiserror::Error;

use std::path::{ Path, PathBuf };
use std::process::Command;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::time::Instant;

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to write ocr input: {0}")]
    Input(#[from] image::ImageError),
    #[error("failed to run {binary}: {source}")]
    Spawn { binary: String, source: std::io::Error },
    #[error("{binary} exited with {status}: {stderr}")]
    Failed { binary: String, status: String, stderr: String },
}

/// Something that turns a binarized crop into raw text.
///
/// Empty or noisy text is a valid answer; only engine failures are errors.
pub trait OcrEngine {
    fn extract(&self, image: &GrayImage) -> Result<String, OcrError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub binary: String,
    pub lang: String,
    /// page segmentation mode, 6 is "a single uniform block of text"
    pub psm: u32,
    pub char_blacklist: String,
    pub tessdata: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            lang: "eng".to_string(),
            psm: 6,
            char_blacklist: "abcdefghijklmnopqrstuvwxyz/".to_string(),
            tessdata: None,
        }
    }
}

/// Runs the `tesseract` executable on a temporary PNG.
pub struct TesseractEngine {
    config: OcrConfig,
    version: Option<String>,
}

impl TesseractEngine {

    /// Builds the engine and probes `--version`. A failed probe is not fatal,
    /// every later call will surface the same problem as an `OcrError`.
    pub fn new(config: OcrConfig) -> Self {
        let version = tesseract_version(&config.binary);
        match &version {
            Some(v) => info!("using {} {}", config.binary, v),
            None => warn!("could not query {} --version, ocr calls will likely fail", config.binary),
        }
        Self { config, version }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn args(&self, input: &str) -> Vec<String> {
        vec![
            input.to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.lang.clone(),
            "--psm".to_string(),
            self.config.psm.to_string(),
            "-c".to_string(),
            format!("tessedit_char_blacklist={}", self.config.char_blacklist),
        ]
    }

    /// Runs tesseract on `image` written to `input`. The file is removed on
    /// every path, including a failed or partial write.
    fn extract_via(&self, image: &GrayImage, input: &Path) -> Result<String, OcrError> {
        let start = Instant::now();
        let result = self.run(image, input);
        if let Err(e) = std::fs::remove_file(input) {
            debug!("could not remove {}: {}", input.display(), e);
        }
        let text = result?;
        debug!("ocr took {} ms, raw text {:?}", start.elapsed().as_millis(), text);
        Ok(text)
    }

    fn run(&self, image: &GrayImage, input: &Path) -> Result<String, OcrError> {
        image.save_with_format(input, ImageFormat::Png)?;

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(self.args(&input.to_string_lossy()));
        if let Some(tessdata) = &self.config.tessdata {
            cmd.env("TESSDATA_PREFIX", tessdata);
        }
        let output = cmd.output().map_err(|source| OcrError::Spawn {
            binary: self.config.binary.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                binary: self.config.binary.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {

    fn extract(&self, image: &GrayImage) -> Result<String, OcrError> {
        self.extract_via(image, &temp_input_path())
    }
}

fn temp_input_path() -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("lpr_gate_{}_{}.png", std::process::id(), n))
}

fn tesseract_version(binary: &str) -> Option<String> {
    let output = Command::new(binary).arg("--version").output().ok()?;
    // older releases print the banner on stderr
    let banner = if output.stdout.is_empty() { output.stderr } else { output.stdout };
    String::from_utf8_lossy(&banner).lines().next().map(|l| l.trim().to_string())
}


#[cfg(test)]
mod test {
    use image::{ ImageBuffer, Luma };

    use super::*;

    #[test]
    fn default_args_blacklist_lowercase_and_use_single_block() {
        let engine = TesseractEngine { config: OcrConfig::default(), version: None };
        let args = engine.args("in.png");
        assert_eq!(args[0], "in.png");
        assert_eq!(args[1], "stdout");
        let psm = args.iter().position(|a| a == "--psm").unwrap();
        assert_eq!(args[psm + 1], "6");
        assert!(args.contains(&"tessedit_char_blacklist=abcdefghijklmnopqrstuvwxyz/".to_string()));
    }

    #[test]
    fn missing_binary_is_an_ocr_error() {
        let config = OcrConfig {
            binary: "lpr-gate-no-such-tesseract".to_string(),
            ..OcrConfig::default()
        };
        let engine = TesseractEngine::new(config);
        assert!(engine.version().is_none());
        let img: GrayImage = ImageBuffer::from_pixel(8, 8, Luma([255u8]));
        let err = engine.extract(&img).unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }));
    }

    #[test]
    fn temp_input_is_removed_after_a_failed_run() {
        let config = OcrConfig {
            binary: "lpr-gate-no-such-tesseract".to_string(),
            ..OcrConfig::default()
        };
        let engine = TesseractEngine { config, version: None };
        let img: GrayImage = ImageBuffer::from_pixel(8, 8, Luma([0u8]));
        let input = std::env::temp_dir().join(format!("lpr_gate_cleanup_{}.png", std::process::id()));

        let err = engine.extract_via(&img, &input).unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }));
        assert!(!input.exists());
    }

    #[test]
    fn unwritable_input_is_an_ocr_error() {
        let engine = TesseractEngine { config: OcrConfig::default(), version: None };
        let img: GrayImage = ImageBuffer::from_pixel(8, 8, Luma([0u8]));
        let input = std::env::temp_dir().join("lpr_gate_no_such_dir").join("in.png");

        let err = engine.extract_via(&img, &input).unwrap_err();
        assert!(matches!(err, OcrError::Input(_)));
        assert!(!input.exists());
    }

    #[test]
    fn temp_paths_are_unique() {
        assert_ne!(temp_input_path(), temp_input_path());
    }
}
