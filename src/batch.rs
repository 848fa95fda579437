use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::ImageCodec;
use crate::error::{Error, Result};
use crate::extractor::SubphotoExtractor;
use crate::naming::{IdGenerator, NamingPolicy};

/// Minimum region area used by the scanner setup this tool was written for
pub const DEFAULT_MIN_AREA: f64 = 80_000.0;

/// Folders, input patterns and naming for one batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Where inputs go once split; `None` leaves them in place
    pub processed_dir: Option<PathBuf>,
    /// Glob patterns relative to `input_dir`
    pub patterns: Vec<String>,
    pub min_area: f64,
    pub naming: NamingPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./scan"),
            output_dir: PathBuf::from("./output"),
            processed_dir: Some(PathBuf::from("./processed")),
            patterns: vec!["*.jpeg".to_string()],
            min_area: DEFAULT_MIN_AREA,
            naming: NamingPolicy::default(),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_area.is_finite() || self.min_area <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "minimum area must be a positive number, got {}",
                self.min_area
            )));
        }
        if self.patterns.is_empty() {
            return Err(Error::InvalidConfig("at least one input pattern is required".into()));
        }
        Ok(())
    }
}

/// What happened to one input scan
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Processed {
        written: Vec<PathBuf>,
        /// Crops that were extracted but could not be written
        dropped: usize,
        moved_to: Option<PathBuf>,
        /// Why the input could not be moved; it stays in the input folder
        move_error: Option<String>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub crops_written: usize,
    pub crops_dropped: usize,
    pub moves_failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Processed {
                written,
                dropped,
                move_error,
                ..
            } => {
                self.processed += 1;
                self.crops_written += written.len();
                self.crops_dropped += dropped;
                if move_error.is_some() {
                    self.moves_failed += 1;
                }
            }
            FileOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Reads scans from disk, runs the extractor on each and persists the crops
pub struct BatchRunner {
    config: BatchConfig,
    codec: ImageCodec,
    extractor: SubphotoExtractor,
}

impl BatchRunner {
    pub fn new(
        config: BatchConfig,
        codec: ImageCodec,
        extractor: SubphotoExtractor,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec,
            extractor,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Create the input, output and processed folders if missing
    pub fn prepare_folders(&self) -> Result<()> {
        let mut folders = vec![&self.config.input_dir, &self.config.output_dir];
        folders.extend(self.config.processed_dir.as_ref());

        for folder in folders {
            if !folder.exists() {
                fs::create_dir_all(folder)
                    .map_err(|e| Error::io(format!("Failed to create folder {:?}", folder), e))?;
                log::info!("Folder {:?} created", folder);
            }
        }
        Ok(())
    }

    /// Files in the input folder matching any pattern, sorted and de-duplicated
    pub fn list_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut inputs = BTreeSet::new();

        // Only the patterns are globs; the folder is matched literally
        let dir = glob::Pattern::escape(&self.config.input_dir.to_string_lossy());
        for pattern in &self.config.patterns {
            let full = Path::new(&dir).join(pattern);
            for entry in glob::glob(&full.to_string_lossy())? {
                match entry {
                    Ok(path) if path.is_file() => {
                        inputs.insert(path);
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Cannot inspect {:?}: {}", e.path(), e.error()),
                }
            }
        }

        Ok(inputs.into_iter().collect())
    }

    /// Split one scan.
    ///
    /// An unreadable input is reported as skipped and left where it is. A
    /// failed move is recorded in the outcome and the input stays put.
    pub fn process_file(&self, path: &Path, ids: &mut dyn IdGenerator) -> Result<FileOutcome> {
        let image = match self.codec.decode(path) {
            Ok(image) => image,
            Err(e) if e.is_unreadable_input() => {
                log::warn!("Could not read image at {:?}, skipping: {}", path, e);
                return Ok(FileOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        log::debug!("Loaded {:?} ({}x{})", path, image.width(), image.height());

        let crops = self.extractor.extract(&image, self.config.min_area, ids);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan".to_string());

        let mut written = Vec::with_capacity(crops.len());
        let mut dropped = 0;
        for (index, crop) in crops.iter().enumerate() {
            if crop.image.width() == 0 || crop.image.height() == 0 {
                log::warn!("Dropping empty crop {} of {:?}", crop.id, path);
                dropped += 1;
                continue;
            }

            let target = self
                .config
                .output_dir
                .join(self.config.naming.file_name(&stem, index, &crop.id));

            match self.codec.encode_jpeg(&crop.image, &target) {
                Ok(()) => {
                    log::info!("Saved sub-photo: {:?}", target);
                    written.push(target);
                }
                Err(e) => {
                    log::warn!(
                        "Dropping {}x{} crop of {:?}: {}",
                        crop.image.width(),
                        crop.image.height(),
                        path,
                        e
                    );
                    if let Err(e) = discard_partial(&target) {
                        log::debug!("Could not remove partial output {:?}: {}", target, e);
                    }
                    dropped += 1;
                }
            }
        }

        let (moved_to, move_error) = match &self.config.processed_dir {
            Some(dir) => match move_into(path, dir) {
                Ok(target) => (Some(target), None),
                Err(e) => {
                    log::warn!("Could not move {:?} into {:?}: {}", path, dir, e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        Ok(FileOutcome::Processed {
            written,
            dropped,
            moved_to,
            move_error,
        })
    }

    /// Process every matching input; one bad scan never stops the batch
    pub fn run(&self, ids: &mut dyn IdGenerator) -> Result<BatchSummary> {
        let inputs = self.list_inputs()?;
        log::info!(
            "Found {} input(s) in {:?}",
            inputs.len(),
            self.config.input_dir
        );

        let mut summary = BatchSummary::default();
        for path in &inputs {
            let outcome = self.process_file(path, ids)?;
            summary.record(&outcome);
        }

        Ok(summary)
    }
}

fn move_into(path: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidConfig(format!("{:?} has no file name", path)))?;
    let target = dir.join(file_name);

    if fs::rename(path, &target).is_err() {
        // rename fails across filesystems
        fs::copy(path, &target)
            .map_err(|e| Error::io(format!("Failed to copy {:?} to {:?}", path, target), e))?;
        fs::remove_file(path)
            .map_err(|e| Error::io(format!("Failed to remove {:?}", path), e))?;
    }

    log::info!("File moved to {:?}", dir);
    Ok(target)
}

/// Remove whatever a failed encode left behind; nothing there is fine
fn discard_partial(target: &Path) -> io::Result<()> {
    match fs::remove_file(target) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SequentialIdGenerator;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use uuid::Uuid;

    struct Workspace {
        root: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("subphoto-batch-{}", Uuid::new_v4()));
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn config(&self, naming: NamingPolicy) -> BatchConfig {
            BatchConfig {
                input_dir: self.root.join("scan"),
                output_dir: self.root.join("output"),
                processed_dir: Some(self.root.join("processed")),
                patterns: vec!["*.jpeg".into(), "*.png".into()],
                min_area: 1000.0,
                naming,
            }
        }
    }

    impl Drop for Workspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    fn runner(config: BatchConfig) -> BatchRunner {
        BatchRunner::new(config, ImageCodec::default(), SubphotoExtractor::new()).unwrap()
    }

    fn write_sheet(path: &Path) {
        let mut img = RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(101, 61), Rgb([30, 30, 30]));
        draw_filled_rect_mut(&mut img, Rect::at(160, 90).of_size(111, 81), Rgb([60, 90, 30]));
        img.save(path).unwrap();
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_validate() {
        let mut config = BatchConfig::default();
        assert!(config.validate().is_ok());

        config.min_area = 0.0;
        assert!(config.validate().is_err());

        config.min_area = 10.0;
        config.patterns.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sequential_batch() {
        let ws = Workspace::new();
        let runner = runner(ws.config(NamingPolicy::Sequential));
        runner.prepare_folders().unwrap();
        write_sheet(&ws.root.join("scan/sheet.png"));

        let summary = runner.run(&mut SequentialIdGenerator::default()).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                processed: 1,
                skipped: 0,
                crops_written: 2,
                crops_dropped: 0,
                moves_failed: 0,
            }
        );
        assert_eq!(files_in(&ws.root.join("output")), vec!["sheet_0.jpg", "sheet_1.jpg"]);
        assert_eq!(files_in(&ws.root.join("processed")), vec!["sheet.png"]);
        assert!(files_in(&ws.root.join("scan")).is_empty());
    }

    #[test]
    fn test_unique_names_and_kept_inputs() {
        let ws = Workspace::new();
        let mut config = ws.config(NamingPolicy::Unique);
        config.processed_dir = None;
        let runner = runner(config);
        runner.prepare_folders().unwrap();
        let input = ws.root.join("scan/page.png");
        write_sheet(&input);

        let outcome = runner
            .process_file(&input, &mut SequentialIdGenerator::new("id"))
            .unwrap();

        match outcome {
            FileOutcome::Processed {
                written,
                moved_to,
                move_error,
                ..
            } => {
                assert_eq!(written.len(), 2);
                assert!(moved_to.is_none());
                assert!(move_error.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(files_in(&ws.root.join("output")), vec!["page_id0.jpg", "page_id1.jpg"]);
        assert!(input.exists());
    }

    #[test]
    fn test_undecodable_input_is_skipped() {
        let ws = Workspace::new();
        let runner = runner(ws.config(NamingPolicy::Sequential));
        runner.prepare_folders().unwrap();
        let broken = ws.root.join("scan/broken.jpeg");
        fs::write(&broken, b"not a jpeg at all").unwrap();
        write_sheet(&ws.root.join("scan/good.png"));

        let summary = runner.run(&mut SequentialIdGenerator::default()).unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.crops_written, 2);
        // Skipped inputs stay where they were
        assert!(broken.exists());
        assert_eq!(files_in(&ws.root.join("processed")), vec!["good.png"]);
    }

    #[test]
    fn test_blank_input_yields_no_crops() {
        let ws = Workspace::new();
        let runner = runner(ws.config(NamingPolicy::Sequential));
        runner.prepare_folders().unwrap();
        let blank = ws.root.join("scan/blank.png");
        RgbImage::from_pixel(120, 80, Rgb([255, 255, 255]))
            .save(&blank)
            .unwrap();

        let outcome = runner
            .process_file(&blank, &mut SequentialIdGenerator::default())
            .unwrap();

        assert!(matches!(
            outcome,
            FileOutcome::Processed { ref written, dropped: 0, .. } if written.is_empty()
        ));
    }

    #[test]
    fn test_list_inputs_filters_patterns() {
        let ws = Workspace::new();
        let runner = runner(ws.config(NamingPolicy::Sequential));
        runner.prepare_folders().unwrap();
        for name in ["b.jpeg", "a.png", "notes.txt"] {
            fs::write(ws.root.join("scan").join(name), b"x").unwrap();
        }

        let inputs = runner.list_inputs().unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpeg"]);
    }

    #[test]
    fn test_input_folder_with_glob_characters() {
        let ws = Workspace::new();
        let mut config = ws.config(NamingPolicy::Sequential);
        config.input_dir = ws.root.join("scan[2024]");
        let runner = runner(config);
        runner.prepare_folders().unwrap();
        write_sheet(&ws.root.join("scan[2024]/a.png"));

        let inputs = runner.list_inputs().unwrap();
        assert_eq!(inputs, vec![ws.root.join("scan[2024]/a.png")]);

        let summary = runner.run(&mut SequentialIdGenerator::default()).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.crops_written, 2);
    }

    #[test]
    fn test_failed_move_does_not_stop_batch() {
        let ws = Workspace::new();
        let mut config = ws.config(NamingPolicy::Sequential);
        // A plain file where the processed folder should be
        let blocker = ws.root.join("processed");
        fs::write(&blocker, b"in the way").unwrap();
        config.processed_dir = Some(blocker);
        let runner = runner(config);
        runner.prepare_folders().unwrap();
        write_sheet(&ws.root.join("scan/first.png"));
        write_sheet(&ws.root.join("scan/second.png"));

        let summary = runner.run(&mut SequentialIdGenerator::default()).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.crops_written, 4);
        assert_eq!(summary.moves_failed, 2);
        assert_eq!(files_in(&ws.root.join("scan")), vec!["first.png", "second.png"]);
    }

    #[test]
    fn test_failed_move_is_reported_in_outcome() {
        let ws = Workspace::new();
        let mut config = ws.config(NamingPolicy::Sequential);
        config.processed_dir = Some(ws.root.join("no-such-folder"));
        let runner = runner(config);
        fs::create_dir_all(ws.root.join("scan")).unwrap();
        fs::create_dir_all(ws.root.join("output")).unwrap();
        let input = ws.root.join("scan/page.png");
        write_sheet(&input);

        let outcome = runner
            .process_file(&input, &mut SequentialIdGenerator::default())
            .unwrap();

        match outcome {
            FileOutcome::Processed {
                written,
                moved_to,
                move_error,
                ..
            } => {
                assert_eq!(written.len(), 2);
                assert!(moved_to.is_none());
                assert!(move_error.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(input.exists());
    }

    #[test]
    fn test_discard_partial() {
        let ws = Workspace::new();

        // Nothing to remove is not an error
        assert!(discard_partial(&ws.root.join("never-written.jpg")).is_ok());

        let partial = ws.root.join("partial.jpg");
        fs::write(&partial, b"half a jpeg").unwrap();
        assert!(discard_partial(&partial).is_ok());
        assert!(!partial.exists());

        // A directory cannot be removed as a file
        let dir = ws.root.join("taken.jpg");
        fs::create_dir_all(&dir).unwrap();
        assert!(discard_partial(&dir).is_err());
    }
}
