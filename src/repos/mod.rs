pub mod error;
pub mod pool;
pub mod task_repo;
pub mod user_repo;
