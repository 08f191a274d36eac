pub mod corridor;
pub mod geometry;
pub mod nearest;

pub use corridor::{reports_near_route, CorridorIndex};
pub use geometry::distance_meters;
pub use nearest::{nearest_k, reports_within_radius};
