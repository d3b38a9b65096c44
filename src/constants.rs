// Shared constants for the download pipeline

/// Default text stamped onto every page.
pub const DEFAULT_WATERMARK_TEXT: &str = "Crack BATU";

/// Brand suffix appended to generated filenames.
pub const FILENAME_BRAND_SUFFIX: &str = "CrackBATU";

/// Direct-download endpoint prefix for Google Drive hosted files.
pub const DRIVE_DIRECT_URL_PREFIX: &str = "https://drive.google.com/uc?export=download&id=";

/// Preview endpoint template parts for the in-browser viewer handoff.
pub const DRIVE_PREVIEW_URL_PREFIX: &str = "https://drive.google.com/file/d/";
pub const DRIVE_PREVIEW_URL_SUFFIX: &str = "/preview";

/// Corner mark anchor: distance from the right edge, in PDF units.
pub const CORNER_RIGHT_INSET: f64 = 120.0;

/// Corner mark anchor: distance from the bottom edge, in PDF units.
pub const CORNER_BOTTOM_INSET: f64 = 20.0;

/// Corner mark fill color (orange).
pub const CORNER_COLOR_RGB: (f64, f64, f64) = (1.0, 0.5, 0.0);

/// Center mark fill color (light gray).
pub const CENTER_COLOR_RGB: (f64, f64, f64) = (0.9, 0.9, 0.9);
