pub mod auction;
pub mod bid;
pub mod checkpoint;
pub mod event;
pub mod primitives;
pub mod step;
pub mod tick;

pub use auction::*;
pub use bid::*;
pub use checkpoint::*;
pub use event::*;
pub use primitives::*;
pub use step::*;
pub use tick::*;
