//! Live process access (Windows only).
//!
//! Finds the running game by executable name, opens it for reading, and
//! exposes its main module through [`ReadMemory`].

use tracing::{debug, info};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::ProcessStatus::{
    K32EnumProcessModules, K32GetModuleInformation, MODULEINFO,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

use super::{ReadMemory, check_bounds};
use crate::error::{Error, Result};

/// Executable names of the four retail builds (both games reuse names
/// across classic/addon, so the name alone never identifies the version).
pub const GAME_EXECUTABLES: &[&str] = &["gothic.exe", "gothic2.exe", "gothicgame.exe"];

pub struct ProcessHandle {
    pub pid: u32,
    pub exe_name: String,
    pub base_address: u64,
    pub image_size: usize,
    handle: HANDLE,
}

// HANDLE is a plain kernel handle; reads are position-independent.
unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

impl ProcessHandle {
    /// Find a running game process by executable name and open it.
    pub fn find_and_open() -> Result<Self> {
        let (pid, exe_name) = find_game_process()?;
        info!("Found game process '{}' (pid {})", exe_name, pid);
        Self::open(pid, exe_name)
    }

    /// Open a specific process by id.
    pub fn open_pid(pid: u32) -> Result<Self> {
        Self::open(pid, format!("pid {}", pid))
    }

    fn open(pid: u32, exe_name: String) -> Result<Self> {
        // SAFETY: OpenProcess with read-only access rights.
        let handle = unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid) }
            .map_err(|e| Error::ProcessOpenFailed(format!("{} ({})", exe_name, e)))?;

        let (base_address, image_size) = match main_module_info(handle) {
            Ok(info) => info,
            Err(e) => {
                // SAFETY: handle came from OpenProcess above.
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Err(e);
            }
        };

        debug!(
            "Opened '{}': base {:#x}, image size {:#x}",
            exe_name, base_address, image_size
        );

        Ok(Self {
            pid,
            exe_name,
            base_address,
            image_size,
            handle,
        })
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: handle is owned by this struct and closed exactly once.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

fn find_game_process() -> Result<(u32, String)> {
    // SAFETY: snapshot handle is closed before returning on every path.
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map_err(|e| Error::ProcessNotFound(format!("CreateToolhelp32Snapshot failed: {}", e)))?;

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut found = None;
    // SAFETY: entry.dwSize is initialized as required by the ToolHelp API.
    if unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok() {
        loop {
            let name = utf16_to_string(&entry.szExeFile);
            if GAME_EXECUTABLES
                .iter()
                .any(|exe| name.eq_ignore_ascii_case(exe))
            {
                found = Some((entry.th32ProcessID, name));
                break;
            }
            // SAFETY: same snapshot/entry as above.
            if unsafe { Process32NextW(snapshot, &mut entry) }.is_err() {
                break;
            }
        }
    }

    // SAFETY: snapshot came from CreateToolhelp32Snapshot.
    unsafe {
        let _ = CloseHandle(snapshot);
    }

    found.ok_or_else(|| {
        Error::ProcessNotFound(format!("no process matching {:?}", GAME_EXECUTABLES))
    })
}

fn main_module_info(handle: HANDLE) -> Result<(u64, usize)> {
    let mut module = Default::default();
    let mut needed = 0u32;

    // The first module returned is the main executable.
    // SAFETY: out-pointers reference locals that outlive the call.
    unsafe {
        K32EnumProcessModules(
            handle,
            &mut module,
            std::mem::size_of_val(&module) as u32,
            &mut needed,
        )
    }
    .ok()
    .map_err(|e| Error::ProcessOpenFailed(format!("K32EnumProcessModules failed: {}", e)))?;

    let mut info = MODULEINFO::default();
    // SAFETY: info is a plain out-struct of the documented size.
    unsafe {
        K32GetModuleInformation(
            handle,
            module,
            &mut info,
            std::mem::size_of::<MODULEINFO>() as u32,
        )
    }
    .ok()
    .map_err(|e| Error::ProcessOpenFailed(format!("K32GetModuleInformation failed: {}", e)))?;

    Ok((info.lpBaseOfDll as u64, info.SizeOfImage as usize))
}

fn utf16_to_string(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

/// [`ReadMemory`] over an open [`ProcessHandle`].
pub struct MemoryReader<'a> {
    process: &'a ProcessHandle,
}

impl<'a> MemoryReader<'a> {
    pub fn new(process: &'a ProcessHandle) -> Self {
        Self { process }
    }
}

impl ReadMemory for MemoryReader<'_> {
    fn base_address(&self) -> u64 {
        self.process.base_address
    }

    fn image_size(&self) -> usize {
        self.process.image_size
    }

    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        check_bounds(self.process.base_address, self.process.image_size, addr, len)?;

        let mut buffer = vec![0u8; len];
        let mut read = 0usize;

        // SAFETY: buffer holds `len` bytes and `read` outlives the call.
        unsafe {
            ReadProcessMemory(
                self.process.handle,
                addr as *const std::ffi::c_void,
                buffer.as_mut_ptr() as *mut std::ffi::c_void,
                len,
                Some(&mut read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address: addr,
            message: e.to_string(),
        })?;

        if read != len {
            return Err(Error::MemoryReadFailed {
                address: addr,
                message: format!("short read: {} of {} bytes", read, len),
            });
        }

        Ok(buffer)
    }
}
