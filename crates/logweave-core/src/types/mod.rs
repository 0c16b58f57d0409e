//! Core value types shared by every layer of the pipeline.

mod entity;
mod flush;
mod level;
mod option;

pub use entity::LogEntity;
pub use flush::FlushMode;
pub use level::LogLevel;
pub use option::LogOption;
