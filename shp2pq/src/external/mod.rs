//! Collaborateurs externes du pipeline : outil CLI de reprojection et
//! bibliothèque géométrique du chemin de repli.

pub mod library;
pub mod ogr;

pub use library::{GeometryLibrary, NativeGeometryLibrary};
pub use ogr::{Ogr2Ogr, ReprojectionTool, ToolError};
