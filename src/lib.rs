//! # CopyBench - File Copy Strategy Benchmarks
//!
//! CopyBench times several ways of copying the bytes of one file to another:
//! one byte per call, fixed-size byte blocks, and buffered UTF-8 character
//! layers. Every strategy runs through the same task abstraction so their
//! timings are directly comparable.
//!
//! ## Features
//!
//! - **Four Strategies**: single byte, byte block, buffered characters,
//!   buffered character blocks
//! - **Task Lifecycle**: lazy stream acquisition, guaranteed release
//! - **Monotonic Timing**: each task bracketed by two `Instant` reads
//! - **Asset Roots**: inputs found by path or under ordered asset directories
//! - **Reports**: text, JSON lines, or CSV
//!
//! ## Quick Start
//!
//! ```no_run
//! use copybench::core::{CopyTask, Strategy, TaskTimer};
//! use copybench::fs::AssetResolver;
//!
//! let tasks: Vec<CopyTask> = Strategy::standard_set()
//!     .into_iter()
//!     .map(|strategy| {
//!         CopyTask::builder()
//!             .strategy(strategy)
//!             .input("alice.txt")
//!             .output("output.txt")
//!             .build()
//!             .unwrap()
//!     })
//!     .collect();
//!
//! let mut timer = TaskTimer::new(std::io::stdout(), AssetResolver::bundled());
//! let summary = timer.run(&tasks, 1).unwrap();
//! println!("{} of {} tasks succeeded", summary.succeeded, summary.tasks);
//! ```
//!
//! ## Copying Streams Directly
//!
//! ```
//! use copybench::core::copy_block;
//! use std::io::Cursor;
//!
//! let mut input = Cursor::new(b"abcde".to_vec());
//! let mut output = Vec::new();
//! let stats = copy_block(&mut input, &mut output, 4).unwrap();
//!
//! assert_eq!(output, b"abcde");
//! assert_eq!(stats.reads, 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;

// Re-export commonly used types
pub use config::{HarnessConfig, OutputFormat};
pub use core::{CopyStats, CopyTask, Strategy, TaskTimer, TimingSample};
pub use error::{CopyBenchError, Result};
pub use fs::AssetResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build one task per configured strategy, in order
pub fn tasks_from_config(config: &HarnessConfig) -> Result<Vec<CopyTask>> {
    config
        .strategies
        .iter()
        .map(|&strategy| {
            CopyTask::builder()
                .strategy(strategy)
                .input(config.input_name.clone())
                .output(config.output_name.clone())
                .build()
        })
        .collect()
}

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use copybench::prelude::*;
    //! ```

    pub use crate::config::{HarnessConfig, OutputFormat};
    pub use crate::core::{
        copy_block, copy_buffered_block, copy_buffered_chars, copy_single, CopyStats, CopyTask,
        Copier, Interrupt, Strategy, TaskState, TaskTimer, TimingSample,
    };
    pub use crate::error::{CopyBenchError, Result};
    pub use crate::fs::AssetResolver;
}
