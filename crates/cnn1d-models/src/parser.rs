//! Binary reader and writer for `.c1dn` model blobs
//!
//! Layout, all little-endian:
//!
//! ```text
//! 0   magic        "C1DN"
//! 4   version      u16 (1)
//! 6   kernel_width u16 (3)
//! 8   d_in         u32
//! 12  conv_out     u32
//! 16  classes      u32
//! 20  conv weights f32 × conv_out·3   (filter-major, taps prev/curr/next)
//!     conv bias    f32 × conv_out
//!     dense weight f32 × d_in·conv_out·classes  (row t·conv_out+f, column c)
//!     dense bias   f32 × classes
//! ```

use crate::error::{ModelError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use cnn1d_driver::{ConvLayer, DenseLayer, Tables};
use cnn1d_ip::{Dims, KERNEL_WIDTH};

/// Magic bytes at the start of every blob
pub const MODEL_MAGIC: [u8; 4] = *b"C1DN";

/// Format version written by [`pack`]
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 20;

const F32_LEN: usize = 4;

#[allow(clippy::cast_possible_truncation)]
const WIDTH_FIELD: u16 = KERNEL_WIDTH as u16;

/// Parsed blob header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    /// Format version
    pub version: u16,

    /// Convolution width
    pub kernel_width: u16,

    /// Model dimensions
    pub dims: Dims,
}

impl ModelHeader {
    /// Number of f32 values following the header, or `None` on overflow.
    fn payload_values(&self) -> Option<usize> {
        let Dims {
            d_in,
            conv_out,
            classes,
        } = self.dims;
        let conv = conv_out.checked_mul(KERNEL_WIDTH)?.checked_add(conv_out)?;
        let dense = d_in
            .checked_mul(conv_out)?
            .checked_mul(classes)?
            .checked_add(classes)?;
        conv.checked_add(dense)
    }
}

/// Parse and validate the fixed header.
///
/// # Errors
///
/// Returns error on bad magic, an unknown version, a kernel width other
/// than three, or a blob shorter than the header.
pub fn parse_header(data: &[u8]) -> Result<ModelHeader> {
    let mut found = [0u8; 4];
    let n = data.len().min(4);
    found[..n].copy_from_slice(&data[..n]);
    if found != MODEL_MAGIC {
        tracing::error!("Invalid magic bytes: {found:02x?}");
        return Err(ModelError::InvalidHeader { found });
    }
    if data.len() < HEADER_LEN {
        return Err(ModelError::truncated("header", HEADER_LEN, data.len()));
    }

    let mut buf = &data[4..HEADER_LEN];
    let version = buf.get_u16_le();
    if version != FORMAT_VERSION {
        return Err(ModelError::UnsupportedVersion { version });
    }
    let kernel_width = buf.get_u16_le();
    if kernel_width != WIDTH_FIELD {
        return Err(ModelError::UnsupportedKernelWidth {
            width: kernel_width,
        });
    }
    let d_in = buf.get_u32_le() as usize;
    let conv_out = buf.get_u32_le() as usize;
    let classes = buf.get_u32_le() as usize;

    let header = ModelHeader {
        version,
        kernel_width,
        dims: Dims::new(d_in, conv_out, classes),
    };
    tracing::debug!("Model header: v{version}, {}", header.dims);
    Ok(header)
}

/// Read `count` f32 values, failing if the buffer is short.
fn read_table(buf: &mut &[u8], count: usize, section: &'static str) -> Result<Vec<f32>> {
    let needed = count.saturating_mul(F32_LEN);
    if buf.remaining() < needed {
        return Err(ModelError::truncated(section, needed, buf.remaining()));
    }
    Ok((0..count).map(|_| buf.get_f32_le()).collect())
}

/// Parse a complete blob into weight tables.
///
/// # Errors
///
/// Returns any header error, [`ModelError::Truncated`] if a table is cut
/// short, or [`ModelError::TrailingBytes`] if data follows the dense bias.
pub fn parse(data: &[u8]) -> Result<Tables> {
    let header = parse_header(data)?;
    let dims = header.dims;
    let mut buf = &data[HEADER_LEN..];

    // Reject impossible sizes before allocating anything.
    let payload = header
        .payload_values()
        .and_then(|v| v.checked_mul(F32_LEN))
        .unwrap_or(usize::MAX);
    if buf.remaining() < payload {
        return Err(ModelError::truncated("payload", payload, buf.remaining()));
    }

    let conv_w = read_table(&mut buf, dims.conv_weight_len(), "conv weights")?;
    let conv_b = read_table(&mut buf, dims.conv_out, "conv bias")?;
    let dense_w = read_table(&mut buf, dims.dense_weight_len(), "dense weights")?;
    let dense_b = read_table(&mut buf, dims.classes, "dense bias")?;

    if buf.has_remaining() {
        return Err(ModelError::TrailingBytes {
            count: buf.remaining(),
        });
    }

    let conv = ConvLayer::from_flat(&conv_w, conv_b)?;
    let dense = DenseLayer {
        weights: dense_w,
        bias: dense_b,
    };
    Ok(Tables::new(dims, conv, dense)?)
}

/// Serialise tables into a blob.
///
/// # Errors
///
/// Returns [`ModelError::DimensionTooLarge`] if a dimension does not fit the
/// header's `u32` fields.
pub fn pack(tables: &Tables) -> Result<Bytes> {
    let dims = tables.dims();
    let mut fields = [0u32; 3];
    for (field, d) in fields.iter_mut().zip([dims.d_in, dims.conv_out, dims.classes]) {
        *field = u32::try_from(d).map_err(|_| ModelError::DimensionTooLarge { value: d })?;
    }

    let mut buf = BytesMut::with_capacity(encoded_len(&dims));
    buf.put_slice(&MODEL_MAGIC);
    buf.put_u16_le(FORMAT_VERSION);
    buf.put_u16_le(WIDTH_FIELD);
    for field in fields {
        buf.put_u32_le(field);
    }

    for taps in &tables.conv().weights {
        for &w in taps {
            buf.put_f32_le(w);
        }
    }
    for table in [
        &tables.conv().bias,
        &tables.dense().weights,
        &tables.dense().bias,
    ] {
        for &v in table {
            buf.put_f32_le(v);
        }
    }
    Ok(buf.freeze())
}

/// Size of the blob [`pack`] produces for `dims`.
pub const fn encoded_len(dims: &Dims) -> usize {
    HEADER_LEN
        + F32_LEN * (dims.conv_weight_len() + dims.conv_out + dims.dense_weight_len() + dims.classes)
}
