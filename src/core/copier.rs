//! Copy strategies
//!
//! Each strategy moves every byte of an input to an output; they differ only
//! in transfer unit and in whether a buffered character layer sits in
//! between. The byte strategies are bit-exact. The character strategies
//! decode and re-encode UTF-8, which is exact for valid text.

use crate::config::parse_size;
use crate::error::{retain_first, CopyBenchError, IoPhase, IoPhaseExt, Result};
use crate::fs::{release_pair, CharReader, CharWriter, InputHandle, OutputHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One kibibyte
pub const KIB: usize = 1024;

/// Block sizes the classic run compares
pub const STANDARD_BLOCK_SIZES: [usize; 3] = [KIB, 4 * KIB, 64 * KIB];

/// Largest block a strategy may ask for
pub const MAX_BLOCK_BYTES: usize = 1024 * 1024 * KIB;

/// Buffer capacity of the plain character strategy
pub const DEFAULT_CHAR_BUFFER: usize = 8 * KIB;

/// Unit-at-a-time loops poll the interrupt flag this often
const INTERRUPT_POLL_INTERVAL: u64 = 4096;

/// How a copy moves bytes from input to output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Strategy {
    /// One byte per read, one byte per write
    Single,
    /// Fixed-size byte buffer
    Block {
        /// Buffer capacity in bytes
        block_bytes: usize,
    },
    /// Buffered UTF-8 decode/encode, one character at a time
    BufferedChars,
    /// Buffered UTF-8 decode/encode in runs of `block_bytes` characters
    BufferedBlock {
        /// Characters per run, also the I/O buffer capacity
        block_bytes: usize,
    },
}

impl Strategy {
    /// Variant name as used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Block { .. } => "block",
            Self::BufferedChars => "buffered_chars",
            Self::BufferedBlock { .. } => "buffered_block",
        }
    }

    /// Block size, for the block variants
    pub fn block_bytes(&self) -> Option<usize> {
        match self {
            Self::Block { block_bytes } | Self::BufferedBlock { block_bytes } => Some(*block_bytes),
            Self::Single | Self::BufferedChars => None,
        }
    }

    /// Whether output is guaranteed bit-identical to input
    pub fn is_byte_exact(&self) -> bool {
        matches!(self, Self::Single | Self::Block { .. })
    }

    /// Check parameters before any stream is touched
    pub fn validate(&self) -> Result<()> {
        match self.block_bytes() {
            Some(0) => Err(CopyBenchError::invalid_param(
                "block_bytes",
                "block size must be at least 1 byte",
            )),
            Some(n) if n > MAX_BLOCK_BYTES => Err(CopyBenchError::invalid_param(
                "block_bytes",
                format!(
                    "block size {} exceeds the {} limit",
                    n,
                    humansize::format_size(MAX_BLOCK_BYTES as u64, humansize::BINARY)
                ),
            )),
            _ => Ok(()),
        }
    }

    /// Human-readable task description
    pub fn description(&self) -> String {
        match self {
            Self::Single => "Copy file one byte at a time".to_string(),
            Self::Block { block_bytes } => format!(
                "Copy file using a byte array of size {}",
                humansize::format_size(*block_bytes as u64, humansize::BINARY)
            ),
            Self::BufferedChars => {
                "Copy file as characters through a buffered reader and writer".to_string()
            }
            Self::BufferedBlock { block_bytes } => format!(
                "Copy file as blocks of {} characters through a buffered reader and writer",
                block_bytes
            ),
        }
    }

    /// The classic run: single, three block sizes, both character variants
    pub fn standard_set() -> Vec<Strategy> {
        let mut strategies = vec![Self::Single];
        strategies.extend(
            STANDARD_BLOCK_SIZES
                .iter()
                .map(|&block_bytes| Self::Block { block_bytes }),
        );
        strategies.push(Self::BufferedChars);
        strategies.push(Self::BufferedBlock { block_bytes: KIB });
        strategies
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block_bytes() {
            Some(block_bytes) => write!(f, "{}:{}", self.name(), block_bytes),
            None => f.write_str(self.name()),
        }
    }
}

impl FromStr for Strategy {
    type Err = CopyBenchError;

    /// Parse `single`, `block:64K`, `buffered_chars` or `buffered_block:1K`
    fn from_str(s: &str) -> Result<Self> {
        let (variant, size) = match s.split_once(':') {
            Some((variant, size)) => (variant.trim(), Some(size)),
            None => (s.trim(), None),
        };

        let block_bytes = || -> Result<usize> {
            let size = size.ok_or_else(|| {
                CopyBenchError::invalid_param("block_bytes", format!("'{}' needs a block size", variant))
            })?;
            let bytes = parse_size(size).map_err(|e| CopyBenchError::invalid_param("block_bytes", e))?;
            usize::try_from(bytes)
                .map_err(|_| CopyBenchError::invalid_param("block_bytes", format!("{} is too large", size)))
        };

        match variant.replace('-', "_").as_str() {
            "single" => Ok(Self::Single),
            "block" => Ok(Self::Block {
                block_bytes: block_bytes()?,
            }),
            "buffered_chars" => Ok(Self::BufferedChars),
            "buffered_block" => Ok(Self::BufferedBlock {
                block_bytes: block_bytes()?,
            }),
            other => Err(CopyBenchError::config(format!("Unknown strategy variant: {}", other))),
        }
    }
}

/// Shared flag that aborts in-flight copies
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Create a lowered flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag; running copies fail at their next poll
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Lower the flag again
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Check if raised
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Raise the flag when one of `signals` arrives.
    ///
    /// The signals are blocked on the calling thread, and on threads it spawns
    /// later, and collected by a watcher thread. Call this before spawning
    /// other threads. A repeat delivery after the flag is up exits the process
    /// with status 130.
    #[cfg(unix)]
    pub fn raise_on_signals(
        &self,
        signals: &[nix::sys::signal::Signal],
    ) -> io::Result<std::thread::JoinHandle<()>> {
        use nix::sys::signal::SigSet;

        let mut set = SigSet::empty();
        for &signal in signals {
            set.add(signal);
        }
        set.thread_block().map_err(io::Error::from)?;

        let interrupt = self.clone();
        std::thread::Builder::new()
            .name("copybench-signals".to_string())
            .spawn(move || loop {
                match set.wait() {
                    Ok(signal) if interrupt.is_raised() => {
                        tracing::warn!("{:?} received again, exiting", signal);
                        std::process::exit(130);
                    }
                    Ok(signal) => {
                        tracing::warn!("{:?} received, interrupting the run", signal);
                        interrupt.raise();
                    }
                    Err(e) => {
                        tracing::warn!("Signal watcher stopped: {}", e);
                        break;
                    }
                }
            })
    }

    fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(CopyBenchError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Copy operation statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStats {
    /// Bytes consumed from the input
    pub bytes_read: u64,
    /// Bytes handed to the output
    pub bytes_written: u64,
    /// Transfer units read (bytes, blocks, characters or character runs)
    pub reads: u64,
    /// Transfer units written
    pub writes: u64,
}

/// Runs one strategy over a pair of streams
#[derive(Debug, Clone)]
pub struct Copier {
    strategy: Strategy,
    interrupt: Interrupt,
}

impl Copier {
    /// Create a copier for `strategy`
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            interrupt: Interrupt::new(),
        }
    }

    /// Poll `interrupt` while copying
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The strategy this copier runs
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Copy everything from `input` to `output`.
    ///
    /// Buffered layers are flushed before returning; the streams themselves
    /// stay open and belong to the caller.
    pub fn copy<R: Read, W: Write>(&self, input: &mut R, output: &mut W) -> Result<CopyStats> {
        self.strategy.validate()?;

        match self.strategy {
            Strategy::Single => transfer_bytes(input, output, &self.interrupt),
            Strategy::Block { block_bytes } => {
                transfer_blocks(input, output, block_bytes, &self.interrupt)
            }
            Strategy::BufferedChars => {
                transfer_chars(input, output, DEFAULT_CHAR_BUFFER, &self.interrupt)
            }
            Strategy::BufferedBlock { block_bytes } => {
                transfer_char_blocks(input, output, block_bytes, &self.interrupt)
            }
        }
    }

    /// Copy between task handles, then release both.
    ///
    /// The handles are released on every path; a release failure is reported
    /// only when the copy itself succeeded.
    pub fn copy_handles(&self, mut input: InputHandle, mut output: OutputHandle) -> Result<CopyStats> {
        let copied = self.copy(&mut input, &mut output);
        retain_first(copied, release_pair(input, output))
    }
}

/// Copy one byte at a time
pub fn copy_single<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<CopyStats> {
    Copier::new(Strategy::Single).copy(input, output)
}

/// Copy through a `block_bytes` buffer, writing exactly what each read returned
pub fn copy_block<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    block_bytes: usize,
) -> Result<CopyStats> {
    Copier::new(Strategy::Block { block_bytes }).copy(input, output)
}

/// Copy character by character through buffered UTF-8 layers
pub fn copy_buffered_chars<R: Read, W: Write>(input: &mut R, output: &mut W) -> Result<CopyStats> {
    Copier::new(Strategy::BufferedChars).copy(input, output)
}

/// Copy runs of `block_bytes` characters through buffered UTF-8 layers
pub fn copy_buffered_block<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    block_bytes: usize,
) -> Result<CopyStats> {
    Copier::new(Strategy::BufferedBlock { block_bytes }).copy(input, output)
}

/// Allocate a zeroed block, failing the task instead of aborting the process
fn block_buffer(block_bytes: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(block_bytes)
        .map_err(|e| CopyBenchError::invalid_param("block_bytes", e.to_string()))?;
    buffer.resize(block_bytes, 0);
    Ok(buffer)
}

/// Read once, retrying reads cut short by a signal
fn read_some<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match input.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyBenchError::io(IoPhase::Read, e)),
        }
    }
}

fn transfer_bytes<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    interrupt: &Interrupt,
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    let mut byte = [0u8; 1];

    loop {
        if stats.reads % INTERRUPT_POLL_INTERVAL == 0 {
            interrupt.check()?;
        }
        if read_some(input, &mut byte)? == 0 {
            break;
        }
        stats.reads += 1;
        stats.bytes_read += 1;

        output.write_all(&byte).in_phase(IoPhase::Write)?;
        stats.writes += 1;
        stats.bytes_written += 1;
    }

    Ok(stats)
}

fn transfer_blocks<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    block_bytes: usize,
    interrupt: &Interrupt,
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    let mut buffer = block_buffer(block_bytes)?;

    loop {
        interrupt.check()?;
        let bytes_read = read_some(input, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        stats.reads += 1;
        stats.bytes_read += bytes_read as u64;

        // Only the filled prefix; the tail still holds the previous block
        output
            .write_all(&buffer[..bytes_read])
            .in_phase(IoPhase::Write)?;
        stats.writes += 1;
        stats.bytes_written += bytes_read as u64;
    }

    Ok(stats)
}

fn transfer_chars<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    capacity: usize,
    interrupt: &Interrupt,
) -> Result<CopyStats> {
    let mut reader = CharReader::new(BufReader::with_capacity(capacity, input));
    let mut writer = CharWriter::new(BufWriter::with_capacity(capacity, output));
    let mut units = 0u64;

    loop {
        if units % INTERRUPT_POLL_INTERVAL == 0 {
            interrupt.check()?;
        }
        match reader.read_char()? {
            Some(c) => writer.write_char(c)?,
            None => break,
        }
        units += 1;
    }
    writer.flush()?;

    Ok(CopyStats {
        bytes_read: reader.bytes_consumed(),
        bytes_written: writer.bytes_written(),
        reads: units,
        writes: units,
    })
}

fn transfer_char_blocks<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    block_chars: usize,
    interrupt: &Interrupt,
) -> Result<CopyStats> {
    let mut block = String::new();
    block
        .try_reserve_exact(block_chars)
        .map_err(|e| CopyBenchError::invalid_param("block_bytes", e.to_string()))?;
    let mut reader = CharReader::new(BufReader::with_capacity(block_chars, input));
    let mut writer = CharWriter::new(BufWriter::with_capacity(block_chars, output));
    let mut runs = 0u64;

    loop {
        interrupt.check()?;
        block.clear();
        if reader.read_chars(&mut block, block_chars)? == 0 {
            break;
        }
        writer.write_str(&block)?;
        runs += 1;
    }
    writer.flush()?;

    Ok(CopyStats {
        bytes_read: reader.bytes_consumed(),
        bytes_written: writer.bytes_written(),
        reads: runs,
        writes: runs,
    })
}
