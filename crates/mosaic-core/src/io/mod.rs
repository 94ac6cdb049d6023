pub mod fits;
pub mod fits_writer;
pub mod loader;
pub mod preview;
