pub mod loader;
pub mod schema;
pub mod store;

pub use loader::{load_shift_data, DataLoadError, ShiftData};
pub use store::FileStore;
