//! Slide Registry: discovery and opening of source slides.
//!
//! Every folder argument is walked recursively for files carrying the slide
//! extension. Paths are canonicalised and collected in a sorted set, so a
//! file reachable from two overlapping folders is opened once and the slide
//! order is stable across runs.
//!
//! Opening is all-or-nothing: the first file that is not a readable
//! pyramidal image aborts with [`OpenError::Slide`].
//!
//! # Example
//!
//! ```ignore
//! use wsi_tiler::slide::{SlideRegistry, TiffOpener};
//!
//! let registry = SlideRegistry::open(&["/data/cohort-a"], "svs", &TiffOpener::default())?;
//! for (path, slide) in registry.iter() {
//!     println!("{} -> {}", path.display(), slide.id());
//! }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{OpenError, TiffError};

use super::reader::Slide;
use super::tiff_slide::{TiffSlide, DEFAULT_TILE_CACHE_CAPACITY};

// =============================================================================
// SlideOpener Trait
// =============================================================================

/// Turns a discovered file into an opened slide.
///
/// The registry is generic over this so tests and other decoders can plug in
/// without touching discovery.
pub trait SlideOpener {
    /// The slide type this opener produces.
    type Slide: Slide;

    /// Open the file at `path` under the identifier `id`.
    fn open(&self, path: &Path, id: &str) -> Result<Self::Slide, TiffError>;
}

/// Opens files as pyramidal TIFF slides.
#[derive(Debug, Clone, Copy)]
pub struct TiffOpener {
    /// Decoded source tiles cached per slide
    pub tile_cache_capacity: usize,
}

impl Default for TiffOpener {
    fn default() -> Self {
        Self {
            tile_cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
        }
    }
}

impl SlideOpener for TiffOpener {
    type Slide = TiffSlide;

    fn open(&self, path: &Path, id: &str) -> Result<TiffSlide, TiffError> {
        TiffSlide::open_path(path, id, self.tile_cache_capacity)
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Recursively find every file with `extension` under `folders`.
///
/// The extension match ignores case and a leading dot. The result is sorted
/// and free of duplicates.
pub fn discover<P: AsRef<Path>>(folders: &[P], extension: &str) -> Result<Vec<PathBuf>, OpenError> {
    let wanted = extension.trim_start_matches('.').to_ascii_lowercase();
    let mut found = BTreeSet::new();

    for folder in folders {
        let folder = folder.as_ref();
        for entry in WalkDir::new(folder).follow_links(true) {
            let entry = entry.map_err(|e| OpenError::Discovery {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| folder.to_path_buf()),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() || !has_extension(entry.path(), &wanted) {
                continue;
            }

            let canonical = entry
                .path()
                .canonicalize()
                .map_err(|e| OpenError::Discovery {
                    path: entry.path().to_path_buf(),
                    message: e.to_string(),
                })?;
            found.insert(canonical);
        }
    }

    Ok(found.into_iter().collect())
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Derive one identifier per path from its file stem.
///
/// The first path with a given stem keeps it. Later ones get the lowest
/// `-2`, `-3`, ... suffix that is neither another file's stem nor an id
/// already handed out, so output filenames built from identifiers cannot
/// collide.
pub fn assign_ids(paths: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = paths
        .iter()
        .map(|path| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();

    let mut taken: HashSet<String> = stems.iter().cloned().collect();
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();

    paths
        .iter()
        .zip(&stems)
        .map(|(path, stem)| {
            if claimed.insert(stem.as_str()) {
                return stem.clone();
            }

            let suffix = next_suffix.entry(stem.as_str()).or_insert(2);
            let id = loop {
                let candidate = format!("{}-{}", stem, suffix);
                *suffix += 1;
                if taken.insert(candidate.clone()) {
                    break candidate;
                }
            };
            warn!(path = %path.display(), id = %id, "Slide name already used, disambiguating");
            id
        })
        .collect()
}

// =============================================================================
// SlideRegistry
// =============================================================================

/// The set of opened slides for a run.
///
/// Slides are kept in sorted path order and never mutated after opening.
pub struct SlideRegistry<S> {
    paths: Vec<PathBuf>,
    slides: Vec<S>,
}

impl<S: Slide> SlideRegistry<S> {
    /// Discover and open every slide under `folders`.
    ///
    /// # Errors
    /// `OpenError::Discovery` if a folder cannot be walked,
    /// `OpenError::Slide` for the first file that fails to open.
    pub fn open<P, O>(folders: &[P], extension: &str, opener: &O) -> Result<Self, OpenError>
    where
        P: AsRef<Path>,
        O: SlideOpener<Slide = S>,
    {
        let paths = discover(folders, extension)?;
        let ids = assign_ids(&paths);

        let mut slides = Vec::with_capacity(paths.len());
        for (path, id) in paths.iter().zip(&ids) {
            let slide = opener.open(path, id).map_err(|source| OpenError::Slide {
                path: path.clone(),
                source,
            })?;
            debug!(
                slide = %id,
                path = %path.display(),
                levels = slide.level_count(),
                "Opened slide"
            );
            slides.push(slide);
        }

        info!(slides = slides.len(), extension = %extension, "Slide registry ready");
        if slides.is_empty() {
            warn!("No slides found");
        }

        Ok(Self { paths, slides })
    }

    /// Build a registry from already opened slides.
    ///
    /// Each slide's identifier stands in for its path.
    pub fn from_slides(slides: Vec<S>) -> Self {
        let paths = slides.iter().map(|s| PathBuf::from(s.id())).collect();
        Self { paths, slides }
    }

    /// The opened slides in registry order.
    pub fn slides(&self) -> &[S] {
        &self.slides
    }

    /// Source paths, parallel to [`Self::slides`].
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Iterate `(path, slide)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &S)> {
        self.paths.iter().map(PathBuf::as_path).zip(&self.slides)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
