pub mod browser;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use browser::ChromeSurface;
pub use snapshot::SnapshotSurface;
pub use traits::{BrowserSurface, SurfaceResult};
pub use types::{bounded, ElementHandle, SurfaceError};
