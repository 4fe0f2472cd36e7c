//! MRC2014 micrograph reader
//!
//! Read-only support for flat (`nz = 1`) maps in modes 0, 1, 2 and 6, which
//! covers the micrographs CTFFIND4 runs on.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

const HEADER_SIZE: usize = 1024;
const MAP_ID: &[u8; 4] = b"MAP ";

#[derive(Debug, thiserror::Error)]
pub enum MrcError {
    #[error("failed to read {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("{0:?} is too short for an MRC header ({1} bytes)")]
    Header(PathBuf, usize),
    #[error("{0:?} is missing the MAP identifier")]
    MapId(PathBuf),
    #[error("{0:?} has an unknown machine stamp {1:02x?}")]
    MachineStamp(PathBuf, [u8; 2]),
    #[error("{0:?} has unsupported mode {1}")]
    Mode(PathBuf, i32),
    #[error("{0:?} has invalid dimensions {1}x{2}x{3}")]
    Dimensions(PathBuf, i32, i32, i32),
    #[error("{0:?} is not flat (nz = {1}), only single images are supported")]
    NotFlat(PathBuf, i32),
    #[error("{path:?} is truncated: expected {expected} bytes, found {found}")]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
}
type Result<T> = std::result::Result<T, MrcError>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Endian {
    Little,
    Big,
}
impl Endian {
    fn from_stamp(stamp: [u8; 2]) -> Option<Self> {
        match stamp {
            [0x44, 0x44] | [0x44, 0x41] => Some(Endian::Little),
            [0x11, 0x11] => Some(Endian::Big),
            _ => None,
        }
    }
}

/// Header words and pixel decoding for one endianness
struct Reader<'a> {
    bytes: &'a [u8],
    endian: Endian,
}
impl<'a> Reader<'a> {
    fn word(&self, offset: usize) -> [u8; 4] {
        let b = &self.bytes[offset..offset + 4];
        [b[0], b[1], b[2], b[3]]
    }
    fn i32(&self, offset: usize) -> i32 {
        match self.endian {
            Endian::Little => i32::from_le_bytes(self.word(offset)),
            Endian::Big => i32::from_be_bytes(self.word(offset)),
        }
    }
    fn f32(&self, offset: usize) -> f32 {
        match self.endian {
            Endian::Little => f32::from_le_bytes(self.word(offset)),
            Endian::Big => f32::from_be_bytes(self.word(offset)),
        }
    }
    fn u16_pair(&self, chunk: &[u8]) -> [u8; 2] {
        [chunk[0], chunk[1]]
    }
    fn pixels(&self, mode: Mode, block: &[u8]) -> Vec<f32> {
        match mode {
            Mode::Int8 => block.iter().map(|&b| b as i8 as f32).collect(),
            Mode::Int16 => block
                .chunks_exact(2)
                .map(|c| match self.endian {
                    Endian::Little => i16::from_le_bytes(self.u16_pair(c)) as f32,
                    Endian::Big => i16::from_be_bytes(self.u16_pair(c)) as f32,
                })
                .collect(),
            Mode::UInt16 => block
                .chunks_exact(2)
                .map(|c| match self.endian {
                    Endian::Little => u16::from_le_bytes(self.u16_pair(c)) as f32,
                    Endian::Big => u16::from_be_bytes(self.u16_pair(c)) as f32,
                })
                .collect(),
            Mode::Float32 => block
                .chunks_exact(4)
                .map(|c| {
                    let w = [c[0], c[1], c[2], c[3]];
                    match self.endian {
                        Endian::Little => f32::from_le_bytes(w),
                        Endian::Big => f32::from_be_bytes(w),
                    }
                })
                .collect(),
        }
    }
}

/// MRC data modes
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Int8,
    Int16,
    Float32,
    UInt16,
}
impl Mode {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Mode::Int8),
            1 => Some(Mode::Int16),
            2 => Some(Mode::Float32),
            6 => Some(Mode::UInt16),
            _ => None,
        }
    }
    fn bytes_per_pixel(&self) -> usize {
        match self {
            Mode::Int8 => 1,
            Mode::Int16 | Mode::UInt16 => 2,
            Mode::Float32 => 4,
        }
    }
}

/// A single 2D micrograph
#[derive(Debug, Clone, PartialEq)]
pub struct Micrograph {
    /// number of columns
    pub nx: usize,
    /// number of rows
    pub ny: usize,
    /// pixel size [Å], 0 if the header does not define the cell
    pub pixel_size: f32,
    /// row-major pixel intensities, first row first as stored in the file
    pub data: Vec<f32>,
}
impl Micrograph {
    /// Returns the (min,max) pixel intensities
    pub fn minmax(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &x| {
                (min.min(x), max.max(x))
            })
    }
    /// Decodes a micrograph from the content of an MRC file
    pub fn from_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if bytes.len() < HEADER_SIZE {
            return Err(MrcError::Header(path, bytes.len()));
        }
        if &bytes[208..212] != MAP_ID {
            return Err(MrcError::MapId(path));
        }
        let stamp = [bytes[212], bytes[213]];
        let endian =
            Endian::from_stamp(stamp).ok_or_else(|| MrcError::MachineStamp(path.clone(), stamp))?;
        let header = Reader { bytes, endian };

        let (nx, ny, nz) = (header.i32(0), header.i32(4), header.i32(8));
        if nx <= 0 || ny <= 0 || nz <= 0 {
            return Err(MrcError::Dimensions(path, nx, ny, nz));
        }
        if nz > 1 {
            return Err(MrcError::NotFlat(path, nz));
        }
        let code = header.i32(12);
        let mode = Mode::from_code(code).ok_or_else(|| MrcError::Mode(path.clone(), code))?;
        let mx = header.i32(28);
        let cell_x = header.f32(40);
        let pixel_size = if mx > 0 && cell_x.is_finite() && cell_x > 0. {
            cell_x / mx as f32
        } else {
            0.
        };
        let n_ext = header.i32(92).max(0) as usize;

        let (nx, ny) = (nx as usize, ny as usize);
        let start = HEADER_SIZE + n_ext;
        let expected = start + nx * ny * mode.bytes_per_pixel();
        if bytes.len() < expected {
            return Err(MrcError::Truncated {
                path,
                expected,
                found: bytes.len(),
            });
        }
        let data = header.pixels(mode, &bytes[start..expected]);
        Ok(Self {
            nx,
            ny,
            pixel_size,
            data,
        })
    }
}

/// Loads a micrograph from an MRC file
pub fn load_image(path: impl AsRef<Path>) -> Result<Micrograph> {
    let path = path.as_ref();
    log::info!("Loading {:?}...", path);
    let bytes = fs::read(path).map_err(|e| MrcError::Io(e, path.to_path_buf()))?;
    Micrograph::from_bytes(path, &bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Little-endian MRC2014 file content
    pub(crate) fn mrc_bytes(nx: i32, ny: i32, nz: i32, mode: i32, pixel_size: f32, data: &[u8]) -> Vec<u8> {
        let mut header = vec![0u8; HEADER_SIZE];
        let mut put = |offset: usize, word: [u8; 4]| header[offset..offset + 4].copy_from_slice(&word);
        put(0, nx.to_le_bytes());
        put(4, ny.to_le_bytes());
        put(8, nz.to_le_bytes());
        put(12, mode.to_le_bytes());
        put(28, nx.to_le_bytes());
        put(32, ny.to_le_bytes());
        put(36, nz.to_le_bytes());
        put(40, (pixel_size * nx as f32).to_le_bytes());
        put(44, (pixel_size * ny as f32).to_le_bytes());
        put(48, pixel_size.to_le_bytes());
        put(208, *MAP_ID);
        put(212, [0x44, 0x44, 0, 0]);
        header.extend_from_slice(data);
        header
    }

    pub(crate) fn float_data(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    #[test]
    fn float32_image() {
        let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
        let bytes = mrc_bytes(4, 3, 1, 2, 1.25, &float_data(&values));
        let mic = Micrograph::from_bytes("test.mrc", &bytes).unwrap();
        assert_eq!((mic.nx, mic.ny), (4, 3));
        assert_eq!(mic.data, values);
        assert!((mic.pixel_size - 1.25).abs() < 1e-6);
        assert_eq!(mic.minmax(), (0., 5.5));
    }

    #[test]
    fn int16_and_uint16_images() {
        let values: [i16; 4] = [-2, -1, 0, 300];
        let data: Vec<u8> = values.iter().flat_map(|x| x.to_le_bytes()).collect();
        let mic = Micrograph::from_bytes("a.mrc", &mrc_bytes(2, 2, 1, 1, 1., &data)).unwrap();
        assert_eq!(mic.data, vec![-2., -1., 0., 300.]);

        let values: [u16; 4] = [0, 1, 40000, 65535];
        let data: Vec<u8> = values.iter().flat_map(|x| x.to_le_bytes()).collect();
        let mic = Micrograph::from_bytes("b.mrc", &mrc_bytes(2, 2, 1, 6, 1., &data)).unwrap();
        assert_eq!(mic.data, vec![0., 1., 40000., 65535.]);
    }

    #[test]
    fn int8_image() {
        let data = [0u8, 127, 128, 255];
        let mic = Micrograph::from_bytes("c.mrc", &mrc_bytes(4, 1, 1, 0, 1., &data)).unwrap();
        assert_eq!(mic.data, vec![0., 127., -128., -1.]);
    }

    #[test]
    fn extended_header_is_skipped() {
        let mut bytes = mrc_bytes(2, 1, 1, 2, 1., &[]);
        bytes[92..96].copy_from_slice(&8i32.to_le_bytes());
        bytes.extend_from_slice(&[0xffu8; 8]);
        bytes.extend_from_slice(&float_data(&[3., 4.]));
        let mic = Micrograph::from_bytes("ext.mrc", &bytes).unwrap();
        assert_eq!(mic.data, vec![3., 4.]);
    }

    #[test]
    fn big_endian_image() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&2i32.to_be_bytes());
        bytes[4..8].copy_from_slice(&1i32.to_be_bytes());
        bytes[8..12].copy_from_slice(&1i32.to_be_bytes());
        bytes[12..16].copy_from_slice(&2i32.to_be_bytes());
        bytes[208..212].copy_from_slice(MAP_ID);
        bytes[212..214].copy_from_slice(&[0x11, 0x11]);
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        bytes.extend_from_slice(&(-2f32).to_be_bytes());
        let mic = Micrograph::from_bytes("be.mrc", &bytes).unwrap();
        assert_eq!(mic.data, vec![1.5, -2.]);
        assert_eq!(mic.pixel_size, 0.);
    }

    #[test]
    fn format_errors() {
        assert!(matches!(
            Micrograph::from_bytes("short.mrc", &[0u8; 100]),
            Err(MrcError::Header(_, 100))
        ));

        let mut bytes = mrc_bytes(2, 2, 1, 2, 1., &float_data(&[0.; 4]));
        bytes[208..212].copy_from_slice(b"XXXX");
        assert!(matches!(
            Micrograph::from_bytes("id.mrc", &bytes),
            Err(MrcError::MapId(_))
        ));

        let bytes = mrc_bytes(2, 2, 1, 12, 1., &[0u8; 8]);
        assert!(matches!(
            Micrograph::from_bytes("mode.mrc", &bytes),
            Err(MrcError::Mode(_, 12))
        ));

        let bytes = mrc_bytes(2, 2, 3, 2, 1., &float_data(&[0.; 12]));
        assert!(matches!(
            Micrograph::from_bytes("stack.mrc", &bytes),
            Err(MrcError::NotFlat(_, 3))
        ));

        let bytes = mrc_bytes(0, 2, 1, 2, 1., &[]);
        assert!(matches!(
            Micrograph::from_bytes("dims.mrc", &bytes),
            Err(MrcError::Dimensions(..))
        ));

        let bytes = mrc_bytes(4, 4, 1, 2, 1., &float_data(&[0.; 10]));
        match Micrograph::from_bytes("trunc.mrc", &bytes) {
            Err(MrcError::Truncated {
                expected, found, ..
            }) => {
                assert_eq!(expected, HEADER_SIZE + 64);
                assert_eq!(found, HEADER_SIZE + 40);
            }
            other => panic!("expected a truncation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            load_image("does/not/exist.mrc"),
            Err(MrcError::Io(..))
        ));
    }
}
