mod config;
mod util;
mod lines;
mod progress;

mod record;
mod tally;
mod source;
mod directory;
mod scheduler;

mod output;
mod pipeline;

pub use crate::config::{concurrency_from_arg, TallyOptions, RESULT_FILE_STEM};
pub use crate::pipeline::{CityTally, RunSummary};

// Core: parsing, tallies, sources and the scheduler.
pub use crate::record::{
    RecordLimits, RecordParser, DEFAULT_MAX_NAME_LENGTH, DEFAULT_MAX_VALUE, DEFAULT_MIN_NAME_LENGTH,
    DEFAULT_MIN_VALUE,
};
pub use crate::tally::{merge_tally, new_tally, sorted_entries, Batch, Tally};
pub use crate::source::{MemorySource, SourceProvider};
pub use crate::directory::DirectoryProvider;
pub use crate::scheduler::{Scheduler, SchedulerStats};

// Expose result writers and the line reader for binaries and tests.
pub use crate::output::{result_file_name, write_tally, write_tally_to};
pub use crate::lines::read_lines;

pub use crate::util::init_tracing_once;
