pub mod tasks;
pub mod users;

pub use tasks::{TaskService, UpdateMode};
pub use users::UserService;
