/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;

/// Number of channels in a color frame (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Default per-channel deadline, measured from dispatch (10 minutes).
pub const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 600;

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Points sampled along each frame edge when tracing a sky footprint,
/// in addition to the four corners.
pub const FOOTPRINT_EDGE_SAMPLES: usize = 16;

/// Slack (in output pixels) tolerated when checking that a footprint fits the grid.
pub const GRID_EDGE_TOLERANCE: f64 = 1e-6;

/// Default minimum number of shared pixels before two frames are background-matched.
pub const DEFAULT_MIN_OVERLAP_PIXELS: usize = 9;

/// File stem of the composite output.
pub const RGB_OUTPUT_STEM: &str = "rgb";
