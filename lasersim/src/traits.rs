mod laser_scan;
mod observer;
mod occupancy;
mod pose_provider;
mod subscription;
mod traversal;

pub use laser_scan::*;
pub use observer::*;
pub use occupancy::*;
pub use pose_provider::*;
pub use subscription::*;
pub use traversal::*;
