#![forbid(unsafe_code)]

pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, LessonRepository, NewResultRecord, ResultRecord, ResultRepository,
    Storage, StorageError,
};
