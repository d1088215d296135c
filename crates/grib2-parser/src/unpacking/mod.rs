//! GRIB2 data unpacking.
//!
//! Simple packing (template 5.0) is unpacked here. Other packings
//! (complex, JPEG2000, PNG) are handed to the `grib` crate decoder.

use std::io::Cursor;

use tracing::debug;

use crate::sections::DataRepresentation;
use crate::{Grib2Error, Grib2Result};

/// Unpack simple packed data onto `num_points` grid points.
///
/// value = (R + X * 2^E) * 10^-D
///
/// Only points set in the bitmap have a packed value; the rest come back as
/// NaN.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: usize,
    repr: &DataRepresentation,
    bitmap: Option<&[u8]>,
) -> Grib2Result<Vec<f32>> {
    let reference = repr.reference_value as f64;
    let binary_scale = 2.0_f64.powi(repr.binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(-(repr.decimal_scale_factor as i32));
    let bits_per_value = repr.bits_per_value as usize;

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;

    for i in 0..num_points {
        if let Some(bm) = bitmap {
            let byte_idx = i / 8;
            let bit_idx = 7 - (i % 8);
            let present = bm
                .get(byte_idx)
                .map(|b| (b >> bit_idx) & 1 == 1)
                .ok_or_else(|| {
                    Grib2Error::UnpackingError(format!(
                        "bitmap has {} bytes, grid has {} points",
                        bm.len(),
                        num_points
                    ))
                })?;
            if !present {
                values.push(f32::NAN);
                continue;
            }
        }

        let packed_value = if bits_per_value == 0 {
            0
        } else {
            extract_bits(packed_data, bit_position, bits_per_value)
                .map_err(|e| Grib2Error::UnpackingError(format!("Failed to extract bits: {}", e)))?
        };
        bit_position += bits_per_value;

        let value = (reference + packed_value as f64 * binary_scale) * decimal_scale;
        values.push(value as f32);
    }

    Ok(values)
}

/// Extract bits from a byte array, MSB first.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32, String> {
    if num_bits > 32 || num_bits == 0 {
        return Err(format!("Invalid number of bits: {}", num_bits));
    }

    let mut result = 0u32;

    for i in 0..num_bits {
        let absolute_bit = start_bit + i;
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8);

        if byte_idx >= data.len() {
            return Err("Not enough data to extract bits".to_string());
        }

        let bit = (data[byte_idx] >> bit_idx) & 1;
        result = (result << 1) | (bit as u32);
    }

    Ok(result)
}

/// Decode one field of a message with the `grib` crate.
///
/// `submessage` is the ordinal of the field within the message.
pub fn decode_with_grib_crate(message: &[u8], submessage: usize) -> Grib2Result<Vec<f32>> {
    let grib_file = grib::from_reader(Cursor::new(message))
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder: {}", e)))?;

    let (_, submsg) = grib_file
        .iter()
        .nth(submessage)
        .ok_or_else(|| Grib2Error::UnpackingError(format!("no field #{}", submessage)))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submsg)
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder: {}", e)))?;
    let values: Vec<f32> = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder: {}", e)))?
        .collect();

    debug!(count = values.len(), "Decoded field with grib crate");
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repr(reference: f32, e: i16, d: i16, bits: u8) -> DataRepresentation {
        DataRepresentation {
            num_values: 0,
            template: 0,
            reference_value: reference,
            binary_scale_factor: e,
            decimal_scale_factor: d,
            bits_per_value: bits,
        }
    }

    #[test]
    fn test_extract_bits() {
        let data = vec![0b10110101];
        assert_eq!(extract_bits(&data, 0, 2).unwrap(), 0b10);
        assert_eq!(extract_bits(&data, 2, 2).unwrap(), 0b11);
        assert_eq!(extract_bits(&data, 0, 8).unwrap(), 0b10110101);
        assert!(extract_bits(&data, 4, 8).is_err());
    }

    #[test]
    fn test_simple_unpacking() {
        let values = unpack_simple(&[100, 200], 2, &repr(0.0, 0, 0, 8), None).unwrap();
        assert_eq!(values, vec![100.0, 200.0]);
    }

    #[test]
    fn test_scale_factors() {
        // (10 + 3 * 2^-1) * 10^-1 = 1.15
        let values = unpack_simple(&[3], 1, &repr(10.0, -1, 1, 8), None).unwrap();
        assert!((values[0] - 1.15).abs() < 1e-6);
    }

    #[test]
    fn test_constant_field() {
        let values = unpack_simple(&[], 4, &repr(2.5, 0, 0, 0), None).unwrap();
        assert_eq!(values, vec![2.5; 4]);
    }

    #[test]
    fn test_bitmap_skips_missing_points() {
        // Points 0 and 2 present; packed data holds only those two.
        let bitmap = [0b1010_0000];
        let values = unpack_simple(&[7, 9], 4, &repr(0.0, 0, 0, 8), Some(&bitmap)).unwrap();

        assert_eq!(values[0], 7.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 9.0);
        assert!(values[3].is_nan());
    }
}
