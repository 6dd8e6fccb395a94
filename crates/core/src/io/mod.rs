//! I/O operations for reading and writing single-band GeoTIFF layers

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_geotiff_identified, write_geotiff,
    write_geotiff_to_buffer,
};
