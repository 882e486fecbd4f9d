//! Static table of SSTV modes and the raster each one produces.

use std::collections::BTreeMap;

use crate::{
    domain::{Dimensions, ModeName},
    error::ViewerError,
};

const BUILTIN_MODES: &[(&str, u32, u32)] = &[
    ("Martin1", 320, 256),
    ("Martin2", 320, 256),
    ("Scottie1", 320, 256),
    ("Scottie2", 320, 256),
    ("ScottieDX", 320, 256),
    ("Robot36", 320, 240),
    ("Robot72", 320, 240),
];

/// Largest raster a registered mode may ask for, 64 MiB once expanded to RGBA.
pub const MAX_MODE_PIXELS: usize = 4096 * 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeRegistry {
    modes: BTreeMap<ModeName, Dimensions>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModeRegistry {
    pub fn empty() -> Self {
        Self {
            modes: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let modes = BUILTIN_MODES
            .iter()
            .map(|&(name, width, height)| (ModeName::from(name), Dimensions { width, height }))
            .collect();
        Self { modes }
    }

    /// Adds or replaces a mode. Zero-sized rasters and rasters above
    /// [`MAX_MODE_PIXELS`] are rejected.
    pub fn register(
        &mut self,
        mode: impl Into<ModeName>,
        width: u32,
        height: u32,
    ) -> Result<(), ViewerError> {
        let mode = mode.into();
        let dimensions = Dimensions::new(width, height)
            .filter(|dimensions| dimensions.pixel_count() <= MAX_MODE_PIXELS)
            .ok_or_else(|| ViewerError::InvalidMode {
                mode: mode.to_string(),
                width,
                height,
            })?;
        self.modes.insert(mode, dimensions);
        Ok(())
    }

    pub fn lookup(&self, mode: &ModeName) -> Result<Dimensions, ViewerError> {
        self.modes
            .get(mode)
            .copied()
            .ok_or_else(|| ViewerError::UnknownMode(mode.to_string()))
    }

    pub fn contains(&self, mode: &ModeName) -> bool {
        self.modes.contains_key(mode)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModeName, Dimensions)> {
        self.modes.iter().map(|(name, dims)| (name, *dims))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}
