//! Region selection on feature masks.
//!
//! - **Flood fill**: seeded 4-connected extraction used by point queries
//! - **Clustering**: DBSCAN over foreground pixels, used to drop small specks

pub mod clustering;
pub mod flood_fill;

pub use clustering::{dbscan, Clustering};
pub use flood_fill::{flood_fill_region, FillResult};
