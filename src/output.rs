//! Output-side collaborators.
//!
//! Layout owns the output sections and segments and assigns their addresses;
//! the symbol table only reads the results through these traits once
//! `finalize` runs. The output file hands out writable views of its bytes.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::MmapMut;

/// A chunk of the output image with an assigned address: an output section
/// or any other linker-generated data block.
pub trait OutputData {
    /// Final virtual address.
    fn address(&self) -> u64;

    /// Size of the contents in bytes.
    fn data_size(&self) -> u64;

    /// Section index in the output section header table.
    fn out_shndx(&self) -> u16;
}

/// A loadable output segment.
pub trait OutputSegment {
    /// Final virtual address of the segment start.
    fn vaddr(&self) -> u64;

    /// Size of the segment in memory.
    fn memsz(&self) -> u64;

    /// Size of the segment's file image.
    fn filesz(&self) -> u64;
}

/// The finished layout, queried when linker-defined symbols are anchored.
pub trait Layout {
    /// Find an output section by name.
    fn find_output_section(&self, name: &str) -> Option<&dyn OutputData>;

    /// Find the first output segment with the given type whose flags include
    /// all of `flags_set` and none of `flags_clear`.
    fn find_output_segment(
        &self,
        segment_type: u32,
        flags_set: u32,
        flags_clear: u32,
    ) -> Option<&dyn OutputSegment>;
}

/// The output file being written.
///
/// A view is a mutable borrow of the file's bytes; releasing it is the end
/// of the borrow, so a held view can never leak past the writing phase.
pub trait OutputFile {
    /// Borrow `size` writable bytes starting at `offset`.
    fn get_output_view(&mut self, offset: u64, size: usize) -> Result<&mut [u8]>;
}

/// Memory-mapped output file.
pub struct MmapOutputFile {
    map: MmapMut,
}

impl MmapOutputFile {
    /// Create (or truncate) the file at `path` with the given final size and
    /// map it writable.
    pub fn create(path: &Path, size: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.set_len(size)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(MmapOutputFile { map })
    }

    /// Flush dirty pages to disk.
    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

impl OutputFile for MmapOutputFile {
    fn get_output_view(&mut self, offset: u64, size: usize) -> Result<&mut [u8]> {
        let start = offset as usize;
        let end = start
            .checked_add(size)
            .filter(|&end| end <= self.map.len());
        match end {
            Some(end) => Ok(&mut self.map[start..end]),
            None => bail!(
                "output view {}+{} outside mapped file of {} bytes",
                offset,
                size,
                self.map.len()
            ),
        }
    }
}

/// In-memory output, mainly for tests and for drivers that assemble the file
/// before writing it in one call. The buffer grows to fit any view.
impl OutputFile for Vec<u8> {
    fn get_output_view(&mut self, offset: u64, size: usize) -> Result<&mut [u8]> {
        let start = offset as usize;
        let end = start.checked_add(size).context("output view overflow")?;
        if self.len() < end {
            self.resize(end, 0);
        }
        Ok(&mut self[start..end])
    }
}
