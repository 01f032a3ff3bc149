//! Image bounds and defaults

/// Smallest width or height a client may request.
pub const MIN_DIMENSION: u32 = 200;

/// Width used when a request names neither width nor height.
pub const DEFAULT_WIDTH: u32 = 800;

/// Default upper bound for `w`.
pub const DEFAULT_MAX_WIDTH: u32 = 2000;

/// Largest `IMAGE_MAX_WIDTH` a deployment may configure.
pub const WIDTH_CEILING: u32 = 4592;

/// Default (and largest) upper bound for `h`.
pub const DEFAULT_MAX_HEIGHT: u32 = 3000;

/// Thumbnail edge used by the gallery page.
pub const GALLERY_THUMBNAIL_SIZE: u32 = 300;

/// Extension every managed photo carries.
pub const PHOTO_EXTENSION: &str = "jpg";
