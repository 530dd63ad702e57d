//! ELF validation using elb
//!
//! Used by the extractor's ELF check: every extracted ELF must parse and its
//! dynamic table must be readable after fixups were applied.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use elb::DynamicTag;
use elb::Elf;

use crate::error::ElfError;

use super::types::ElfInfo;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Fallback when the system page size can't be queried
const DEFAULT_PAGE_SIZE: u64 = 4096;

fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        DEFAULT_PAGE_SIZE
    }
}

/// Whether the file starts with the ELF magic
pub fn is_elf(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ELF_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Parse an ELF file and summarize its dynamic table
pub fn inspect_elf(path: &Path) -> Result<ElfInfo, ElfError> {
    let invalid = |reason: String| ElfError::InvalidElf {
        path: path.to_path_buf(),
        reason,
    };

    let mut file = File::open(path).map_err(|e| invalid(format!("Failed to open file: {}", e)))?;
    let elf = Elf::read(&mut file, page_size())
        .map_err(|e| invalid(format!("Failed to parse ELF: {}", e)))?;

    let mut info = ElfInfo::default();
    let dynamic_table = elf
        .read_dynamic_table(&mut file)
        .map_err(|e| invalid(format!("Failed to read dynamic table: {}", e)))?;

    if let Some(dynamic_table) = dynamic_table {
        info.dynamic = true;
        for (tag, _value) in dynamic_table.iter() {
            match tag {
                DynamicTag::Needed => info.needed_count += 1,
                DynamicTag::Rpath => info.has_rpath = true,
                DynamicTag::Runpath => info.has_runpath = true,
                _ => {}
            }
        }
    }

    Ok(info)
}
