//! Binary file formats.
//!
//! - `BVH2`: binary input tree with faces and vertices ([`read_bvh2`], [`save_bvh2`])
//! - `BVH8`: collapsed GPU buffers ([`save_bvh8`], [`read_bvh8`])
//!
//! All values are little-endian. Both formats start with a 4-byte magic and a
//! `u32` version.

mod bvh2;
mod bvh8;

pub use bvh2::{read_bvh2, read_bvh2_bytes, save_bvh2, write_bvh2, BVH2_MAGIC};
pub use bvh8::{read_bvh8, read_bvh8_bytes, save_bvh8, write_bvh8, BVH8_MAGIC};

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use crate::util::{Aabb, Error, Result, Vec3};

/// Current version of both formats.
pub const FORMAT_VERSION: u32 = 1;

/// Header size shared by both formats: magic + version.
const PREAMBLE_SIZE: usize = 8;

/// Summary of a `BVH2` or `BVH8` file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Header {
    Bvh2 { nodes: u32, faces: u32, vertices: u32 },
    Bvh8 { aabb: Aabb, nodes: u32, faces: u32 },
}

/// Read just the header of either format.
pub fn read_header(data: &[u8]) -> Result<Header> {
    if data.len() < 4 {
        return Err(Error::UnexpectedEof(data.len() as u64));
    }
    let mut r = ByteReader::new(data);
    if data[..4] == BVH2_MAGIC {
        r.preamble(BVH2_MAGIC)?;
        Ok(Header::Bvh2 { nodes: r.u32()?, faces: r.u32()?, vertices: r.u32()? })
    } else if data[..4] == BVH8_MAGIC {
        r.preamble(BVH8_MAGIC)?;
        Ok(Header::Bvh8 { aabb: r.aabb()?, nodes: r.u32()?, faces: r.u32()? })
    } else {
        Err(Error::InvalidMagic { expected: BVH2_MAGIC })
    }
}

/// Bounds-checked little-endian reader over a byte slice.
pub(crate) struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    #[inline]
    fn eof(&self) -> Error {
        Error::UnexpectedEof(self.cursor.position())
    }

    /// Fail early if fewer than `len` bytes remain.
    pub fn require(&self, len: u64) -> Result<()> {
        let total = self.cursor.get_ref().len() as u64;
        if total.saturating_sub(self.cursor.position()) < len {
            return Err(Error::UnexpectedEof(total));
        }
        Ok(())
    }

    pub fn preamble(&mut self, magic: [u8; 4]) -> Result<()> {
        self.require(PREAMBLE_SIZE as u64)?;
        let mut found = [0u8; 4];
        for b in &mut found {
            *b = self.cursor.read_u8().map_err(|_| self.eof())?;
        }
        if found != magic {
            return Err(Error::InvalidMagic { expected: magic });
        }
        let version = self.u32()?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(())
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(|_| self.eof())
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<LittleEndian>().map_err(|_| self.eof())
    }

    pub fn f32x3(&mut self) -> Result<[f32; 3]> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    pub fn aabb(&mut self) -> Result<Aabb> {
        let min = Vec3::from(self.f32x3()?);
        let max = Vec3::from(self.f32x3()?);
        Ok(Aabb::new(min, max))
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }
}

/// File contents, memory-mapped when the `mmap` feature is on.
pub(crate) enum FileBytes {
    #[cfg(feature = "mmap")]
    Mmap(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl FileBytes {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        #[cfg(feature = "mmap")]
        {
            if file.metadata()?.len() > 0 {
                // Safety: mapped read-only; the file is not modified while mapped.
                let mmap = unsafe { memmap2::Mmap::map(&file) }
                    .map_err(|e| Error::MmapFailed(e.to_string()))?;
                return Ok(Self::Mmap(mmap));
            }
        }

        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut &file, &mut data)?;
        Ok(Self::Owned(data))
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mmap(m) => m.as_ref(),
            Self::Owned(v) => v.as_slice(),
        }
    }
}

/// Read the header of a file on disk.
pub fn read_file_header(path: impl AsRef<Path>) -> Result<Header> {
    let bytes = FileBytes::open(path.as_ref())?;
    read_header(bytes.as_slice())
}

/// Checked `usize` → `u32` for counts written to file headers.
pub(crate) fn count_u32(what: &'static str, count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::IndexOverflow { what, count })
}
