pub mod task;
pub mod user;

pub use task::{Task, TaskInput, TaskPatch};
pub use user::{
    AuthResponse, LoginRequest, NewUser, SignupRequest, User, UserChanges, UserPatch,
};
