//! Utility functions

use crate::error::{FrameError, Result};
use bytemuck::{Pod, Zeroable};
use std::mem;

/// Decode raw bytes into a typed frame buffer
pub fn bytes_to_frame<T: Pod>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.len() % mem::size_of::<T>() != 0 {
        return Err(FrameError::InvalidFormat(format!(
            "byte length {} is not a multiple of the element size {}",
            bytes.len(),
            mem::size_of::<T>()
        )));
    }
    // copy through a typed buffer, the source needs no particular alignment
    let mut frame = vec![T::zeroed(); bytes.len() / mem::size_of::<T>()];
    bytemuck::cast_slice_mut::<T, u8>(&mut frame).copy_from_slice(bytes);
    Ok(frame)
}

/// Encode a typed frame buffer as raw bytes
pub fn frame_to_bytes<T: Pod>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

/// Length of each contiguous partition when `len` items are spread over
/// `workers`. Returns `len` itself when the work should stay sequential.
pub fn partition_len(len: usize, min_partition_len: usize, workers: usize) -> usize {
    let min_part = min_partition_len.max(1);
    if len <= min_part || workers <= 1 {
        return len.max(1);
    }
    len.div_ceil(workers * 4).max(min_part)
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_conversion() {
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let bytes = frame_to_bytes(&data);
        assert_eq!(bytes.len(), data.len() * 4);

        let recovered: Vec<f32> = bytes_to_frame(&bytes).unwrap();
        assert_eq!(data, recovered);
    }

    #[test]
    fn test_unaligned_bytes() {
        let bytes = [0u8, 1, 0, 2, 0];
        assert!(matches!(
            bytes_to_frame::<u16>(&bytes),
            Err(FrameError::InvalidFormat(_))
        ));
        let decoded: Vec<u16> = bytes_to_frame(&bytes[1..]).unwrap();
        assert_eq!(decoded, vec![u16::from_ne_bytes([1, 0]), u16::from_ne_bytes([2, 0])]);
    }

    #[test]
    fn test_partition_len() {
        assert_eq!(partition_len(0, 16, 8), 1);
        assert_eq!(partition_len(10, 16, 8), 10);
        assert_eq!(partition_len(1000, 16, 1), 1000);
        assert_eq!(partition_len(1000, 16, 4), 63);
        assert_eq!(partition_len(1000, 100, 4), 100);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }
}
