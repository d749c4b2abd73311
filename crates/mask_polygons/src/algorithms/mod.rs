pub mod binarize;
pub mod morphology;
pub mod contours;
pub mod assembly;
pub mod simplification;

pub use binarize::*;
pub use morphology::*;
pub use contours::*;
pub use assembly::*;
pub use simplification::*;
