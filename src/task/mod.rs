pub mod cart;
pub mod descriptor;
pub mod loader;

pub use descriptor::{FileInfo, TaskDescriptor};
pub use loader::{load_task, LoadedTask, TASK_FILE_NAME};
pub use cart::{unpack_task, CartFile, CART_FILE_TYPE};
