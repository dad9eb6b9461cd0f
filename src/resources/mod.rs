use std::{
    fs::{self, File},
    io::{BufReader, Read, Seek},
    path::Path,
};

use zip::read::ZipArchive;

use crate::{
    definitions::{cpu, memory},
    RomError,
};

/// The amount of bytes available for a program loaded to the default location.
pub const PROGRAM_CAPACITY: usize = memory::SIZE - cpu::PROGRAM_COUNTER as usize;

/// The amount of bytes available for a program loaded to `origin`.
///
/// # Example
/// ```rust
/// # use chip::resources::{capacity_at, PROGRAM_CAPACITY};
/// assert_eq!(capacity_at(0x200), PROGRAM_CAPACITY);
/// assert_eq!(capacity_at(0x100), 0xF00);
/// assert_eq!(capacity_at(0x2000), 0);
/// ```
pub fn capacity_at(origin: u16) -> usize {
    memory::SIZE.saturating_sub(origin as usize)
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Represents a single rom with it's information
pub struct Rom {
    /// The rom name
    name: String,
    /// The raw program stored as a u8 slice on the heap
    data: Box<[u8]>,
}

impl Rom {
    /// Will generate a new rom based of the given data
    pub fn new(name: &str, data: Box<[u8]>) -> Self {
        Rom {
            name: name.to_string(),
            data,
        }
    }

    /// Will read the rom from the given file, the file stem is used as the name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        Self::from_path_at(path, cpu::PROGRAM_COUNTER)
    }

    /// Will read the rom from the given file, it has to fit into the memory
    /// when loaded to `origin`.
    pub fn from_path_at<P: AsRef<Path>>(path: P, origin: u16) -> Result<Self, RomError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = fs::read(path)?;
        Self::checked(&name, data, capacity_at(origin))
    }

    /// rejects the roms that do not fit into the given capacity
    fn checked(name: &str, data: Vec<u8>, capacity: usize) -> Result<Self, RomError> {
        if data.is_empty() {
            return Err(RomError::Empty(name.to_string()));
        }
        if data.len() > capacity {
            return Err(RomError::TooLarge {
                name: name.to_string(),
                len: data.len(),
                capacity,
            });
        }
        Ok(Self::new(name, data.into_boxed_slice()))
    }

    /// Will return a slice internal values of the given data
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Will return the name of the rom.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

/// Represents an archive of roms, every entry is a single rom.
pub struct RomArchive<R> {
    archive: ZipArchive<R>,
}

impl RomArchive<BufReader<File>> {
    /// Will open the zip archive at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R> RomArchive<R>
where
    R: Read + Seek,
{
    pub fn from_reader(reader: R) -> Result<Self, RomError> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    /// Will return all the rom names available to be chosen
    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.archive.file_names().collect();
        names.sort_unstable();
        names
    }

    /// Will decompress the rom from the zip archive
    pub fn get_file_data(&mut self, name: &str) -> Result<Rom, RomError> {
        self.get_file_data_at(name, cpu::PROGRAM_COUNTER)
    }

    /// Will decompress the rom, it has to fit into the memory when loaded to `origin`.
    pub fn get_file_data_at(&mut self, name: &str, origin: u16) -> Result<Rom, RomError> {
        let mut file = self.archive.by_name(name)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Rom::checked(name, data, capacity_at(origin))
    }
}
