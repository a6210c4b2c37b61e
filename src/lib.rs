use image::{ DynamicImage, Rgb, RgbImage };
use imageproc::{ drawing, rect };
use log::{ debug, info, warn };

use std::fs;
use std::io;
use std::path::{ Path, PathBuf };

use authorized::AuthorizedSet;
use image_process::{ PlateLocalizer, PlateRegion };
use ocr::{ OcrEngine, OcrError };
use report::{ RecognitionResult, Report, Status };

pub mod authorized;
pub mod config;
pub mod error;
pub mod image_process;
pub mod ocr;
pub mod report;
pub mod text;
pub mod utils;


/// Turns a path into pixels. `None` means the file could not be decoded.
pub trait ImageSource {
    fn decode(&self, path: &Path) -> Option<DynamicImage>;
}

/// Decodes from disk with `image::open`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageSource;

impl ImageSource for FileImageSource {
    fn decode(&self, path: &Path) -> Option<DynamicImage> {
        match image::open(path) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("could not decode {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Image files directly inside `dir` with an allowed extension, sorted by
/// name so runs are reproducible.
pub fn list_images<S: AsRef<str>>(dir: impl AsRef<Path>, extensions: &[S]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && utils::has_image_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub struct Lpr<E: OcrEngine> {
    localizer: PlateLocalizer,
    ocr: E,
}

impl<E: OcrEngine> Lpr<E> {

    pub fn new(localizer: PlateLocalizer, ocr: E) -> Self {
        Lpr { localizer, ocr }
    }

    pub fn localizer(&self) -> &PlateLocalizer {
        &self.localizer
    }

    /// Region to read: the located plate, or the whole image when no
    /// quadrilateral was found.
    pub fn plate_crop(&self, img: &DynamicImage) -> (Option<PlateRegion>, DynamicImage) {
        match self.localizer.locate(img) {
            Some(region) => {
                debug!("plate located at {:?}", region);
                let crop = region.crop(img);
                (Some(region), crop)
            }
            None => {
                debug!("no plate contour found, reading the whole image");
                (None, img.clone())
            }
        }
    }

    /// Locate, filter, OCR and normalize. `Ok(None)` means OCR ran but left
    /// nothing alphanumeric, or the image had no pixels to read.
    pub fn read_plate(&self, img: &DynamicImage) -> Result<Option<String>, OcrError> {
        if img.width() == 0 || img.height() == 0 {
            debug!("empty {}x{} image, nothing to read", img.width(), img.height());
            return Ok(None);
        }
        let (_, crop) = self.plate_crop(img);
        let filtered = utils::apply_filter(&crop);
        let raw = self.ocr.extract(&filtered)?;
        let plate = text::normalize_plate(&raw);
        debug!("ocr {:?} normalized to {:?}", raw.trim(), plate);
        Ok(plate)
    }

    /// Recognize one decoded image against the run's authorized list.
    pub fn recognize(&self, img: &DynamicImage, authorized: &AuthorizedSet) -> (Option<String>, Status) {
        match self.read_plate(img) {
            Ok(Some(plate)) => {
                let status = if authorized.contains(&plate) {
                    Status::Authorized
                } else {
                    Status::NotAuthorized
                };
                (Some(plate), status)
            }
            Ok(None) => (None, Status::Unrecognized),
            Err(e) => {
                warn!("ocr failed: {}", e);
                (None, Status::OcrError)
            }
        }
    }

    /// One result per path, in the same order. A failing image never stops
    /// the batch.
    pub fn recognize_batch<S: ImageSource + ?Sized>(&self, source: &S, paths: &[PathBuf], authorized: &AuthorizedSet) -> Report {
        info!("recognizing {} images against {} authorized plates", paths.len(), authorized.len());
        let results = paths.iter().map(|path| {
            let name = path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let (plate, status) = match source.decode(path) {
                Some(img) => self.recognize(&img, authorized),
                None => (None, Status::ImageError),
            };
            info!("{}: {} ({})", name, plate.as_deref().unwrap_or("-"), status);
            RecognitionResult { source: name, plate, status }
        }).collect();
        Report::new(results)
    }
}

/// Copy of `img` with the plate box drawn in red.
pub fn annotate(img: &DynamicImage, region: Option<PlateRegion>) -> RgbImage {
    let mut out = img.to_rgb8();
    if let Some(region) = region {
        let r = rect::Rect::at(region.left as i32, region.top as i32).of_size(region.width(), region.height());
        drawing::draw_hollow_rect_mut(&mut out, r, Rgb([255, 0, 0]));
    }
    out
}
