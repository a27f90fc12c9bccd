//! Image source selection shared by commands that touch an image.
//!
//! Commands attach either to the live game process (Windows) or to a raw
//! memory dump file, which works on any platform.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use zsig_core::{DumpReader, ReadMemory};

#[derive(Args)]
pub struct SourceArgs {
    /// Attach to a specific process id instead of searching by name
    #[cfg(target_os = "windows")]
    #[arg(long)]
    pub pid: Option<u32>,

    /// Read from a raw memory dump file instead of a live process
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Base address the dump was captured at (hex, defaults to 0x400000)
    #[arg(long, requires = "dump")]
    pub base: Option<String>,
}

impl SourceArgs {
    /// Open the selected source and hand a reader to `f`.
    pub fn with_reader<T>(&self, f: impl FnOnce(&dyn ReadMemory) -> Result<T>) -> Result<T> {
        if let Some(path) = &self.dump {
            let reader = match &self.base {
                Some(text) => {
                    DumpReader::load(path, crate::commands::hex_utils::parse_hex_address(text)?)?
                }
                None => DumpReader::load_default(path)?,
            };
            return f(&reader);
        }

        self.with_process_reader(f)
    }

    #[cfg(target_os = "windows")]
    fn with_process_reader<T>(&self, f: impl FnOnce(&dyn ReadMemory) -> Result<T>) -> Result<T> {
        use zsig_core::{MemoryReader, ProcessHandle};

        let process = match self.pid {
            Some(pid) => ProcessHandle::open_pid(pid)?,
            None => ProcessHandle::find_and_open()?,
        };
        let reader = MemoryReader::new(&process);
        f(&reader)
    }

    #[cfg(not(target_os = "windows"))]
    fn with_process_reader<T>(&self, _f: impl FnOnce(&dyn ReadMemory) -> Result<T>) -> Result<T> {
        anyhow::bail!("live process attach is Windows-only; use --dump <file> here")
    }
}
