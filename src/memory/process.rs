use crate::memory::{MemoryError, RemoteAddress, RemoteRead};
use libc::{c_void, iovec, pid_t, process_vm_readv};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const AT_PHDR: u64 = 3;
const PT_LOAD: u32 = 1;
const PAGE_SIZE: u64 = 0x1000;

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub base: RemoteAddress,
    pub size: u64,
    pub path: String,
}

/// Direct attachment to a running process, reading through process_vm_readv.
pub struct ProcessMemory {
    pid: pid_t,
}

impl ProcessMemory {
    pub fn attach(pid: pid_t) -> Result<Self, MemoryError> {
        if !Path::new(&format!("/proc/{}", pid)).exists() {
            return Err(MemoryError::ProcessNotFound(format!("pid {}", pid)));
        }
        let proc = Self { pid };
        proc.check_read_privilege();
        Ok(proc)
    }

    pub fn attach_by_name(name: &str) -> Result<Self, MemoryError> {
        let pids = Self::find_pids_by_name(name)?;
        match pids.first() {
            Some(&pid) => {
                info!("Attached to '{}' (pid {})", name, pid);
                Self::attach(pid)
            }
            None => Err(MemoryError::ProcessNotFound(name.to_string())),
        }
    }

    pub fn find_pids_by_name(name: &str) -> Result<Vec<pid_t>, MemoryError> {
        let mut pids = Vec::new();
        for entry in fs::read_dir("/proc")? {
            let entry = entry?;
            let pid: pid_t = match entry.file_name().to_string_lossy().parse() {
                Ok(p) => p,
                Err(_) => continue,
            };
            if let Ok(comm) = fs::read_to_string(entry.path().join("comm")) {
                if comm_matches(comm.trim(), name) {
                    pids.push(pid);
                    continue;
                }
            }
            if let Ok(cmdline) = fs::read(entry.path().join("cmdline")) {
                if let Some(argv0) = cmdline.split(|&b| b == 0).next() {
                    let argv0 = String::from_utf8_lossy(argv0);
                    if argv0.rsplit('/').next() == Some(name) {
                        pids.push(pid);
                    }
                }
            }
        }
        pids.sort_unstable();
        pids.dedup();
        Ok(pids)
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        unsafe { libc::kill(self.pid, 0) == 0 }
    }

    fn check_read_privilege(&self) {
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        if let Ok(scope) = fs::read_to_string("/proc/sys/kernel/yama/ptrace_scope") {
            if scope.trim() != "0" {
                warn!(
                    "yama ptrace_scope={} and not running as root; reads may be denied",
                    scope.trim()
                );
            }
        }
    }

    /// Cheap sanity check that direct reads work: the main module must start
    /// with an ELF header.
    pub fn verify_reads(&self, module: &ModuleInfo) -> Result<(), MemoryError> {
        let mut magic = [0u8; 4];
        self.read_bytes(module.base, &mut magic)?;
        if magic != ELF_MAGIC {
            return Err(MemoryError::InvalidAddress(module.base.as_u64()));
        }
        Ok(())
    }

    /// Locate the main game module. Tries, in order: the maps file, the
    /// map_files directory, and an auxv-guided header walk. Each tier covers
    /// a harder-to-inspect target than the last.
    pub fn find_module(&self, name: &str) -> Result<ModuleInfo, MemoryError> {
        if let Some(m) = self.module_from_maps(name) {
            debug!("module '{}' via maps: base={} size=0x{:x}", name, m.base, m.size);
            return Ok(m);
        }
        if let Some(m) = self.module_from_map_files(name) {
            debug!("module '{}' via map_files: base={} size=0x{:x}", name, m.base, m.size);
            return Ok(m);
        }
        if let Some(m) = self.module_from_auxv() {
            debug!("main module via auxv walk: base={} size=0x{:x}", m.base, m.size);
            return Ok(m);
        }
        Err(MemoryError::ModuleNotFound(name.to_string()))
    }

    fn module_from_maps(&self, name: &str) -> Option<ModuleInfo> {
        let maps = fs::read_to_string(format!("/proc/{}/maps", self.pid)).ok()?;
        let mut lo = u64::MAX;
        let mut hi = 0u64;
        let mut path = String::new();
        for line in maps.lines() {
            let file = line.split_whitespace().nth(5).unwrap_or("");
            if !file.ends_with(name) {
                continue;
            }
            let range = line.split_whitespace().next()?;
            let (start, end) = range.split_once('-')?;
            let start = u64::from_str_radix(start, 16).ok()?;
            let end = u64::from_str_radix(end, 16).ok()?;
            lo = lo.min(start);
            hi = hi.max(end);
            path = file.to_string();
        }
        if lo == u64::MAX {
            return None;
        }
        Some(ModuleInfo { base: RemoteAddress::new(lo), size: hi - lo, path })
    }

    fn module_from_map_files(&self, name: &str) -> Option<ModuleInfo> {
        let dir = fs::read_dir(format!("/proc/{}/map_files", self.pid)).ok()?;
        let mut lo = u64::MAX;
        let mut hi = 0u64;
        let mut path = String::new();
        for entry in dir.flatten() {
            let target = match fs::read_link(entry.path()) {
                Ok(t) => t,
                Err(_) => continue,
            };
            if !target.to_string_lossy().ends_with(name) {
                continue;
            }
            let fname = entry.file_name();
            let range = fname.to_string_lossy().into_owned();
            let (start, end) = range.split_once('-')?;
            let start = u64::from_str_radix(start, 16).ok()?;
            let end = u64::from_str_radix(end, 16).ok()?;
            lo = lo.min(start);
            hi = hi.max(end);
            path = target.to_string_lossy().into_owned();
        }
        if lo == u64::MAX {
            return None;
        }
        Some(ModuleInfo { base: RemoteAddress::new(lo), size: hi - lo, path })
    }

    /// Last resort when procfs mappings are unreadable: AT_PHDR from auxv
    /// points into the main image, and the ELF magic marks its base page.
    fn module_from_auxv(&self) -> Option<ModuleInfo> {
        let auxv = fs::read(format!("/proc/{}/auxv", self.pid)).ok()?;
        let mut phdr = 0u64;
        for pair in auxv.chunks_exact(16) {
            let key = u64::from_le_bytes(pair[0..8].try_into().ok()?);
            let val = u64::from_le_bytes(pair[8..16].try_into().ok()?);
            if key == AT_PHDR {
                phdr = val;
                break;
            }
        }
        if phdr == 0 {
            return None;
        }

        let mut page = RemoteAddress::new(phdr).align_down(PAGE_SIZE);
        let mut base = None;
        for _ in 0..64 {
            let mut magic = [0u8; 4];
            if self.read_bytes(page, &mut magic).is_ok() && magic == ELF_MAGIC {
                base = Some(page);
                break;
            }
            page = page - PAGE_SIZE;
        }
        let base = base?;

        // Walk the program headers for the image extent
        let e_phoff = self.read_u64(base + 0x20).ok()?;
        let e_phentsize = self.read_u16(base + 0x36).ok()? as u64;
        let e_phnum = self.read_u16(base + 0x38).ok()? as u64;
        if e_phentsize == 0 || e_phnum == 0 || e_phnum > 128 {
            return None;
        }

        let mut max_end = 0u64;
        for i in 0..e_phnum {
            let ph = base + e_phoff + i * e_phentsize;
            let p_type = self.read_u32(ph).ok()?;
            if p_type != PT_LOAD {
                continue;
            }
            let p_vaddr = self.read_u64(ph + 0x10).ok()?;
            let p_memsz = self.read_u64(ph + 0x28).ok()?;
            max_end = max_end.max(p_vaddr + p_memsz);
        }
        if max_end == 0 {
            return None;
        }

        Some(ModuleInfo {
            base,
            size: (max_end + PAGE_SIZE - 1) & !(PAGE_SIZE - 1),
            path: String::new(),
        })
    }
}

/// The kernel truncates comm to 15 bytes, possibly mid-character for
/// multi-byte names, so the long-name comparison works on raw bytes.
fn comm_matches(comm: &str, name: &str) -> bool {
    if comm == name {
        return true;
    }
    match name.as_bytes().get(..15) {
        Some(prefix) => comm.as_bytes() == prefix,
        None => false,
    }
}

impl RemoteRead for ProcessMemory {
    fn read_bytes(&self, addr: RemoteAddress, buf: &mut [u8]) -> Result<(), MemoryError> {
        if buf.is_empty() {
            return Ok(());
        }
        if !addr.is_plausible() {
            return Err(MemoryError::InvalidAddress(addr.as_u64()));
        }
        let local = iovec { iov_base: buf.as_mut_ptr() as *mut c_void, iov_len: buf.len() };
        let remote = iovec { iov_base: addr.as_u64() as *mut c_void, iov_len: buf.len() };
        let n = unsafe { process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };
        if n < 0 {
            return Err(MemoryError::ReadFailed(addr.as_u64()));
        }
        if n as usize != buf.len() {
            return Err(MemoryError::ShortRead {
                addr: addr.as_u64(),
                wanted: buf.len(),
                got: n as usize,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::comm_matches;

    #[test]
    fn comm_matching_handles_truncation() {
        assert!(comm_matches("dungeoncrawler", "dungeoncrawler"));
        assert!(comm_matches("DungeonCrawler.", "DungeonCrawler.exe"));
        assert!(!comm_matches("dungeon", "dungeoncrawler"));
    }

    #[test]
    fn comm_matching_survives_a_mid_character_cutoff() {
        // 14 ASCII bytes then a two-byte char; byte 15 is not a char boundary
        let name = "spielverlagersü";
        assert!(!comm_matches("spielverlagers", name));
        assert!(comm_matches(name, name));
    }
}
