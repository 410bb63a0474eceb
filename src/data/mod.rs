pub mod geojson;
pub mod response;
