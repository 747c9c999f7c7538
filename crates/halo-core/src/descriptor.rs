//! Strided transfer descriptors.
//!
//! A descriptor addresses `count` blocks of `block_len` contiguous
//! elements in a flat row-major buffer, consecutive blocks `stride`
//! elements apart, starting at `offset`. A tile row is one block, a tile
//! column is `h` blocks of length 1 strided by the row pitch, and a
//! rectangular sub-block is `rows` blocks of `cols` elements.

use halo_types::error::{HaloError, HaloResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub offset: usize,
    pub count: usize,
    pub block_len: usize,
    pub stride: usize,
}

impl TransferDescriptor {
    /// Contiguous run of `len` elements.
    pub fn row(offset: usize, len: usize) -> Self {
        Self {
            offset,
            count: 1,
            block_len: len,
            stride: len,
        }
    }

    /// `len` single elements, `pitch` apart.
    pub fn column(offset: usize, len: usize, pitch: usize) -> Self {
        Self {
            offset,
            count: len,
            block_len: 1,
            stride: pitch,
        }
    }

    /// `rows × cols` rectangle inside a buffer with row pitch `pitch`.
    pub fn block(offset: usize, rows: usize, cols: usize, pitch: usize) -> Self {
        Self {
            offset,
            count: rows,
            block_len: cols,
            stride: pitch,
        }
    }

    /// Number of elements addressed.
    pub fn len(&self) -> usize {
        self.count * self.block_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the last flat index touched.
    pub fn extent(&self) -> usize {
        if self.is_empty() {
            return self.offset;
        }
        self.offset + (self.count - 1) * self.stride + self.block_len
    }

    /// Flat indices in transfer order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.count).flat_map(move |b| {
            let start = self.offset + b * self.stride;
            start..start + self.block_len
        })
    }

    fn check_bounds(&self, buf_len: usize) -> HaloResult<()> {
        if self.extent() > buf_len {
            return Err(HaloError::Shape(format!(
                "descriptor {self:?} reaches index {} in a buffer of {buf_len}",
                self.extent()
            )));
        }
        Ok(())
    }

    /// Copy the addressed elements of `src` into `out` (cleared first).
    pub fn pack(&self, src: &[f64], out: &mut Vec<f64>) -> HaloResult<()> {
        self.check_bounds(src.len())?;
        out.clear();
        out.reserve(self.len());
        for b in 0..self.count {
            let start = self.offset + b * self.stride;
            out.extend_from_slice(&src[start..start + self.block_len]);
        }
        Ok(())
    }

    /// Scatter `data` into the addressed elements of `dst`.
    pub fn unpack(&self, data: &[f64], dst: &mut [f64]) -> HaloResult<()> {
        if data.len() != self.len() {
            return Err(HaloError::Shape(format!(
                "received {} elements for a descriptor of {}",
                data.len(),
                self.len()
            )));
        }
        self.check_bounds(dst.len())?;
        if self.block_len == 0 {
            return Ok(());
        }
        for (b, chunk) in data.chunks_exact(self.block_len).enumerate() {
            let start = self.offset + b * self.stride;
            dst[start..start + self.block_len].copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Direct copy between two buffers described by equally sized
    /// descriptors.
    pub fn copy(
        src: &[f64],
        src_desc: &TransferDescriptor,
        dst: &mut [f64],
        dst_desc: &TransferDescriptor,
    ) -> HaloResult<()> {
        if src_desc.count != dst_desc.count || src_desc.block_len != dst_desc.block_len {
            return Err(HaloError::Shape(format!(
                "descriptor shapes differ: {}x{} vs {}x{}",
                src_desc.count, src_desc.block_len, dst_desc.count, dst_desc.block_len
            )));
        }
        src_desc.check_bounds(src.len())?;
        dst_desc.check_bounds(dst.len())?;
        for b in 0..src_desc.count {
            let s = src_desc.offset + b * src_desc.stride;
            let d = dst_desc.offset + b * dst_desc.stride;
            dst[d..d + dst_desc.block_len].copy_from_slice(&src[s..s + src_desc.block_len]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x5 buffer holding 0..20 row-major.
    fn sample() -> Vec<f64> {
        (0..20).map(|v| v as f64).collect()
    }

    #[test]
    fn test_row_descriptor_is_contiguous() {
        let d = TransferDescriptor::row(6, 3);
        assert_eq!(d.indices().collect::<Vec<_>>(), vec![6, 7, 8]);
        let mut out = Vec::new();
        d.pack(&sample(), &mut out).unwrap();
        assert_eq!(out, vec![6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_column_descriptor_strides_by_pitch() {
        let d = TransferDescriptor::column(6, 2, 5);
        assert_eq!(d.indices().collect::<Vec<_>>(), vec![6, 11]);
        assert_eq!(d.extent(), 12);
    }

    #[test]
    fn test_block_pack_unpack_between_pitches() {
        // 2x3 interior of the 4x5 buffer, moved into an 8-wide target.
        let src_desc = TransferDescriptor::block(6, 2, 3, 5);
        let mut packed = Vec::new();
        src_desc.pack(&sample(), &mut packed).unwrap();
        assert_eq!(packed, vec![6.0, 7.0, 8.0, 11.0, 12.0, 13.0]);

        let mut dst = vec![0.0; 32];
        let dst_desc = TransferDescriptor::block(9, 2, 3, 8);
        dst_desc.unpack(&packed, &mut dst).unwrap();
        assert_eq!(&dst[9..12], &[6.0, 7.0, 8.0]);
        assert_eq!(&dst[17..20], &[11.0, 12.0, 13.0]);
        assert_eq!(dst[12], 0.0);
    }

    #[test]
    fn test_copy_matches_pack_then_unpack() {
        let src = sample();
        let src_desc = TransferDescriptor::column(1, 4, 5);
        let dst_desc = TransferDescriptor::row(2, 4);
        let mut dst = vec![-1.0; 8];
        TransferDescriptor::copy(&src, &src_desc, &mut dst, &dst_desc).expect_err("shape differs");

        let dst_desc = TransferDescriptor::column(0, 4, 2);
        TransferDescriptor::copy(&src, &src_desc, &mut dst, &dst_desc).unwrap();
        assert_eq!(dst, vec![1.0, -1.0, 6.0, -1.0, 11.0, -1.0, 16.0, -1.0]);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let d = TransferDescriptor::row(0, 4);
        let mut dst = vec![0.0; 4];
        let err = d.unpack(&[1.0, 2.0], &mut dst).expect_err("short payload");
        match err {
            HaloError::Shape(msg) => assert!(msg.contains("received 2")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let d = TransferDescriptor::column(5, 4, 5);
        let mut out = Vec::new();
        assert!(d.pack(&sample(), &mut out).is_err());
    }
}
