pub mod features;
pub mod geojson;
pub mod mask;
pub mod world_file;

pub use features::*;
pub use self::geojson::*;
pub use mask::*;
pub use world_file::*;
