//! I/O operations for reading and writing geospatial data

mod geojson;
mod native;

pub use geojson::{read_polygons_geojson, read_polygons_geojson_str};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
};
