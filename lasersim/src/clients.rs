mod grid_world;
mod mount;
mod occupant_world;
mod recorder;
mod subscriptions;

pub use grid_world::*;
pub use mount::*;
pub use occupant_world::*;
pub use recorder::*;
pub use subscriptions::*;
