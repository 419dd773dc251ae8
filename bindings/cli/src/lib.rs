//! Archive and settings plumbing behind the `profilepic` command.

pub mod archive;
pub mod settings;

pub use archive::{read_batch, write_results, ArchiveBatch};
pub use settings::{load_config, Overrides};
