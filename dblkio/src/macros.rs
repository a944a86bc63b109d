// SPDX-License-Identifier: MIT

/// Implements little-endian read/write helpers for primitive types on DblkIO.
#[macro_export]
macro_rules! dblkio_impl_primitive_rw {
    ($($ty:ty),+ $(,)?) => {
        $(
            paste::paste! {
                #[inline(always)]
                fn [<write_ $ty _at>](&mut self, offset: u64, value: $ty) -> DblkIOResult {
                    let buf = value.to_le_bytes();
                    self.write_at(offset, &buf)
                }

                #[inline(always)]
                fn [<read_ $ty _at>](&mut self, offset: u64) -> DblkIOResult<$ty> {
                    let mut buf = [0u8; core::mem::size_of::<$ty>()];
                    self.read_at(offset, &mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )+
    };
}

/// Implements little-endian field accessors on a sector-sized byte buffer.
#[macro_export]
macro_rules! sector_impl_le_fields {
    ($($ty:ty),+ $(,)?) => {
        $(
            paste::paste! {
                /// Reads a little-endian value at `off`.
                #[inline(always)]
                pub fn [<$ty _at>](&self, off: usize) -> $ty {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&self.bytes[off..off + core::mem::size_of::<$ty>()]);
                    <$ty>::from_le_bytes(raw)
                }

                /// Writes a little-endian value at `off`.
                #[inline(always)]
                pub fn [<set_ $ty _at>](&mut self, off: usize, value: $ty) {
                    self.bytes[off..off + core::mem::size_of::<$ty>()]
                        .copy_from_slice(&value.to_le_bytes());
                }
            }
        )+
    };
}
