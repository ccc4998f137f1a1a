//! `.ltex` 压缩纹理容器
//!
//! 文件布局：
//!
//! ```text
//! [8 字节 native-endian 的 header 长度 N]
//! [N 字节 json header: {"width":..,"height":..,"binarySize":..}]
//! [binarySize 字节的 lz4 block 数据]
//! ```
//!
//! 解码只负责把压缩数据读出来，解压发生在上传阶段：直接解压到 staging buffer 中，
//! 目标大小由 header 中的 width / height 决定。

use std::{
    fs::File,
    io::{self, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, AssetResult};

/// 压缩纹理容器的扩展名
pub const TEXTURE_EXTENSION: &str = "ltex";

/// RGBA8，每个像素 4 字节
pub const BYTES_PER_PIXEL: usize = 4;

const HEADER_LEN_PREFIX: usize = size_of::<u64>();

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct TextureHeader {
    width: u32,
    height: u32,
    #[serde(rename = "binarySize")]
    binary_size: u32,
}

/// 压缩后的 RGBA8 纹理
///
/// `compressed_bytes.len()` 总是等于 header 中的 binarySize，
/// `raw_size` 在构造时已经检查过不会溢出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedTexture {
    width: u32,
    height: u32,
    raw_size: usize,
    compressed_bytes: Vec<u8>,
}

// new & init
impl CompressedTexture {
    /// 压缩 RGBA8 像素
    ///
    /// 压缩结果可能比原始数据更大，此时依然保存压缩结果
    ///
    /// # Panics
    /// - `width` 或 `height` 为 0
    /// - `pixels.len() != width * height * 4`
    pub fn encode(pixels: &[u8], width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "texture extent must not be zero: {}x{}", width, height);
        let raw_size = Self::checked_raw_size(width, height);
        assert_eq!(
            Some(pixels.len()),
            raw_size,
            "pixel buffer does not match {}x{} RGBA8",
            width,
            height
        );

        // block 格式：内部按照最大可能的长度分配，然后截断到实际长度
        let compressed_bytes = lz4_flex::block::compress(pixels);
        if compressed_bytes.len() >= pixels.len() {
            log::debug!(
                "texture {}x{} does not shrink after compression: {} -> {} bytes",
                width,
                height,
                pixels.len(),
                compressed_bytes.len()
            );
        }

        Self {
            width,
            height,
            raw_size: pixels.len(),
            compressed_bytes,
        }
    }

    /// 读取容器文件，只读出压缩数据，不解压
    pub fn decode(path: impl AsRef<Path>) -> AssetResult<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| AssetError::not_found(path, e))?;
        let file_len = file.metadata().map_err(|e| AssetError::not_found(path, e))?.len();

        let read_err = |e: std::io::Error| AssetError::corrupt(path, format!("read failed: {e}"));

        // 1. header 长度
        if file_len < HEADER_LEN_PREFIX as u64 {
            return Err(AssetError::corrupt(path, format!("file is {file_len} bytes, too short for a header")));
        }
        let mut prefix = [0u8; HEADER_LEN_PREFIX];
        file.read_exact(&mut prefix).map_err(read_err)?;
        let header_len = u64::from_ne_bytes(prefix);

        let remaining = file_len - HEADER_LEN_PREFIX as u64;
        if header_len == 0 || header_len > remaining {
            return Err(AssetError::corrupt(
                path,
                format!("header length {header_len} does not fit in {remaining} remaining bytes"),
            ));
        }

        // 2. header
        let mut header_bytes = vec![0u8; header_len as usize];
        file.read_exact(&mut header_bytes).map_err(read_err)?;
        let header: TextureHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| AssetError::corrupt(path, format!("invalid texture header: {e}")))?;
        if header.width == 0 || header.height == 0 {
            return Err(AssetError::corrupt(
                path,
                format!("texture extent must not be zero: {}x{}", header.width, header.height),
            ));
        }
        let raw_size = Self::checked_raw_size(header.width, header.height).ok_or_else(|| {
            AssetError::corrupt(
                path,
                format!("texture extent {}x{} is too large to address", header.width, header.height),
            )
        })?;

        // 3. payload，只读 binarySize 个字节
        let remaining = remaining - header_len;
        if u64::from(header.binary_size) > remaining {
            return Err(AssetError::corrupt(
                path,
                format!("payload is truncated: expected {} bytes, found {}", header.binary_size, remaining),
            ));
        }
        let mut compressed_bytes = vec![0u8; header.binary_size as usize];
        file.read_exact(&mut compressed_bytes).map_err(read_err)?;

        if remaining > u64::from(header.binary_size) {
            log::warn!(
                "{}: ignoring {} trailing bytes after payload",
                path.display(),
                remaining - u64::from(header.binary_size)
            );
        }

        Ok(Self {
            width: header.width,
            height: header.height,
            raw_size,
            compressed_bytes,
        })
    }
}

// getters
impl CompressedTexture {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 压缩数据的长度，即 header 中的 binarySize
    #[inline]
    pub fn binary_size(&self) -> usize {
        self.compressed_bytes.len()
    }

    #[inline]
    pub fn compressed_bytes(&self) -> &[u8] {
        &self.compressed_bytes
    }

    /// 解压之后的字节数：width * height * 4
    #[inline]
    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    fn checked_raw_size(width: u32, height: u32) -> Option<usize> {
        usize::try_from(width)
            .ok()?
            .checked_mul(usize::try_from(height).ok()?)?
            .checked_mul(BYTES_PER_PIXEL)
    }

    /// header 中的 binarySize 只有 32 位
    fn binary_size_field(len: usize) -> io::Result<u32> {
        u32::try_from(len).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("compressed payload is {len} bytes, binarySize only holds {}", u32::MAX),
            )
        })
    }
}

// tools
impl CompressedTexture {
    /// 序列化为容器的字节布局
    pub fn to_container_bytes(&self) -> io::Result<Vec<u8>> {
        let header = TextureHeader {
            width: self.width,
            height: self.height,
            binary_size: Self::binary_size_field(self.compressed_bytes.len())?,
        };
        let header_json = serde_json::to_vec(&header)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN_PREFIX + header_json.len() + self.compressed_bytes.len());
        bytes.extend_from_slice(&(header_json.len() as u64).to_ne_bytes());
        bytes.extend_from_slice(&header_json);
        bytes.extend_from_slice(&self.compressed_bytes);
        Ok(bytes)
    }

    /// 写出容器文件
    pub fn write_to(&self, path: impl AsRef<Path>) -> AssetResult<()> {
        let path = path.as_ref();
        let write_err = |source| AssetError::Write {
            path: path.to_path_buf(),
            source,
        };

        let bytes = self.to_container_bytes().map_err(write_err)?;
        let mut file = File::create(path).map_err(write_err)?;
        file.write_all(&bytes).map_err(write_err)?;
        file.flush().map_err(write_err)?;

        log::info!(
            "write texture {}: {}x{}, {} -> {} bytes",
            path.display(),
            self.width,
            self.height,
            self.raw_size(),
            self.binary_size()
        );
        Ok(())
    }

    /// 将压缩数据解压到 `dst`，`dst` 的长度必须等于 [`Self::raw_size`]
    ///
    /// `source` 仅用于错误信息
    pub fn decompress_into(&self, dst: &mut [u8], source: &Path) -> AssetResult<()> {
        if dst.len() != self.raw_size() {
            return Err(AssetError::corrupt(
                source,
                format!("destination is {} bytes, texture needs {}", dst.len(), self.raw_size()),
            ));
        }

        let written = lz4_flex::block::decompress_into(&self.compressed_bytes, dst)
            .map_err(|e| AssetError::corrupt(source, format!("lz4 payload is invalid: {e}")))?;
        if written != dst.len() {
            return Err(AssetError::corrupt(
                source,
                format!("payload decompressed to {} bytes, expected {}", written, dst.len()),
            ));
        }
        Ok(())
    }

    pub fn decompress(&self, source: &Path) -> AssetResult<Vec<u8>> {
        let mut pixels = vec![0u8; self.raw_size()];
        self.decompress_into(&mut pixels, source)?;
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetErrorKind;

    fn checker_pixels(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let on = ((i % width) + (i / width)) % 2 == 0;
                if on { [255u8, 255, 255, 255] } else { [20u8, 40, 60, 255] }
            })
            .collect()
    }

    /// 手工拼出一个容器：header 长度前缀 + header + payload
    fn raw_container(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut bytes = (header.len() as u64).to_ne_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn encode_then_decode_restores_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.ltex");
        let pixels = checker_pixels(16, 8);

        let texture = CompressedTexture::encode(&pixels, 16, 8);
        texture.write_to(&path).unwrap();

        let decoded = CompressedTexture::decode(&path).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
        assert_eq!(decoded.binary_size(), texture.binary_size());
        assert_eq!(decoded.decompress(&path).unwrap(), pixels);
    }

    #[test]
    fn header_uses_three_field_template() {
        let texture = CompressedTexture::encode(&[7u8; 16], 2, 2);
        let bytes = texture.to_container_bytes().unwrap();

        let header_len = u64::from_ne_bytes(bytes[..8].try_into().unwrap()) as usize;
        let header = std::str::from_utf8(&bytes[8..8 + header_len]).unwrap();
        assert_eq!(header, format!(r#"{{"width":2,"height":2,"binarySize":{}}}"#, texture.binary_size()));
        assert_eq!(bytes.len(), 8 + header_len + texture.binary_size());
    }

    #[test]
    fn decode_reads_exactly_binary_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.ltex");
        let payload: Vec<u8> = (0..12).collect();
        std::fs::write(&path, raw_container(r#"{"width":4,"height":4,"binarySize":12}"#, &payload)).unwrap();

        let decoded = CompressedTexture::decode(&path).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
        assert_eq!(decoded.compressed_bytes(), payload.as_slice());
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.ltex");
        let payload: Vec<u8> = (0..10).collect();
        std::fs::write(&path, raw_container(r#"{"width":4,"height":4,"binarySize":12}"#, &payload)).unwrap();

        let err = CompressedTexture::decode(&path).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn header_fields_in_any_order_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reordered.ltex");
        std::fs::write(&path, raw_container(r#" { "binarySize": 3, "height": 1, "width": 2 } "#, &[1, 2, 3])).unwrap();

        let decoded = CompressedTexture::decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height(), decoded.binary_size()), (2, 1, 3));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CompressedTexture::decode(dir.path().join("absent.ltex")).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::NotFound);
    }

    #[test]
    fn empty_and_short_files_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.ltex");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(CompressedTexture::decode(&empty).unwrap_err().kind(), AssetErrorKind::Corrupt);

        // header 长度前缀声明的长度超出了文件
        let short = dir.path().join("short.ltex");
        let mut bytes = 64u64.to_ne_bytes().to_vec();
        bytes.extend_from_slice(br#"{"width":1"#);
        std::fs::write(&short, bytes).unwrap();
        assert_eq!(CompressedTexture::decode(&short).unwrap_err().kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn bad_header_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();

        let not_json = dir.path().join("not_json.ltex");
        std::fs::write(&not_json, raw_container("width=4", &[0; 4])).unwrap();
        assert_eq!(CompressedTexture::decode(&not_json).unwrap_err().kind(), AssetErrorKind::Corrupt);

        let zero = dir.path().join("zero.ltex");
        std::fs::write(&zero, raw_container(r#"{"width":0,"height":4,"binarySize":0}"#, &[])).unwrap();
        assert_eq!(CompressedTexture::decode(&zero).unwrap_err().kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn oversized_extent_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.ltex");
        std::fs::write(&path, raw_container(r#"{"width":4294967295,"height":4294967295,"binarySize":0}"#, &[])).unwrap();

        let err = CompressedTexture::decode(&path).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn decoded_raw_size_comes_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.ltex");
        std::fs::write(&path, raw_container(r#"{"width":65536,"height":3,"binarySize":2}"#, &[0, 0])).unwrap();

        let decoded = CompressedTexture::decode(&path).unwrap();
        assert_eq!(decoded.raw_size(), 65536 * 3 * BYTES_PER_PIXEL);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn binary_size_beyond_u32_is_rejected() {
        assert_eq!(CompressedTexture::binary_size_field(1024).unwrap(), 1024);

        let err = CompressedTexture::binary_size_field(u32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn decompress_rejects_wrong_sizes() {
        let texture = CompressedTexture::encode(&checker_pixels(4, 4), 4, 4);
        let mut too_small = vec![0u8; 8];
        let err = texture.decompress_into(&mut too_small, Path::new("mem")).unwrap_err();
        assert_eq!(err.kind(), AssetErrorKind::Corrupt);
    }

    #[test]
    fn incompressible_data_keeps_real_size() {
        // 伪随机数据，lz4 无法压缩
        let mut state = 0x1234_5678u32;
        let pixels: Vec<u8> = (0..64 * 4)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state & 0xff) as u8
            })
            .collect();

        let texture = CompressedTexture::encode(&pixels, 8, 8);
        assert!(texture.binary_size() >= pixels.len());
        assert!(texture.binary_size() <= lz4_flex::block::get_maximum_output_size(pixels.len()));
        assert_eq!(texture.decompress(Path::new("mem")).unwrap(), pixels);
    }
}
