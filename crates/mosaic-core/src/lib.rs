pub mod coadd;
pub mod composite;
pub mod consts;
pub mod error;
pub mod frame;
pub mod grid;
pub mod io;
pub mod pipeline;
pub mod reproject;
pub mod wcs;
