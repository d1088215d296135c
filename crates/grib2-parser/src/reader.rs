//! Message splitting and field extraction.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use wave_common::Parameter;

use crate::sections::{
    self, Bitmap, DataRepresentation, GridDefinition, Identification, ProductDefinition,
};
use crate::unpacking;
use crate::{Grib2Error, Grib2Result};

/// One decoded field: a single quantity at a single time.
#[derive(Debug, Clone)]
pub struct Grib2Field {
    pub discipline: u8,
    pub reference_time: DateTime<Utc>,
    pub grid: GridDefinition,
    pub product: ProductDefinition,
    /// Values in storage order; NaN where the bitmap marks a point missing
    pub values: Vec<f32>,
}

impl Grib2Field {
    pub fn parameter(&self) -> Option<Parameter> {
        self.product.parameter(self.discipline)
    }

    pub fn short_name(&self) -> String {
        sections::parameter_short_name(
            self.discipline,
            self.product.parameter_category,
            self.product.parameter_number,
        )
    }

    pub fn valid_time(&self) -> Option<DateTime<Utc>> {
        self.product
            .lead_time()
            .map(|lead| self.reference_time + lead)
    }
}

/// Iterates the messages of a GRIB2 file held in memory.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Next complete message, or `None` at end of data.
    ///
    /// Bytes between messages are skipped.
    pub fn next_message(&mut self) -> Grib2Result<Option<Bytes>> {
        let remaining = &self.data[self.offset..];
        let Some(start) = remaining.windows(4).position(|w| w == b"GRIB") else {
            self.offset = self.data.len();
            return Ok(None);
        };

        let start = self.offset + start;
        let indicator = sections::parse_indicator(&self.data[start..])?;
        let length = indicator.message_length as usize;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= self.data.len() && length >= 20)
            .ok_or_else(|| {
                Grib2Error::InvalidFormat(format!(
                    "message at offset {} claims {} bytes, {} available",
                    start,
                    length,
                    self.data.len() - start
                ))
            })?;

        if &self.data[end - 4..end] != b"7777" {
            return Err(Grib2Error::InvalidFormat(format!(
                "message at offset {} is missing its end marker",
                start
            )));
        }

        self.offset = end;
        Ok(Some(self.data.slice(start..end)))
    }

    /// Decode every field of every remaining message for which `wanted`
    /// returns true. Unwanted fields are not unpacked.
    pub fn read_fields<F>(&mut self, wanted: F) -> Grib2Result<Vec<Grib2Field>>
    where
        F: Fn(u8, &ProductDefinition) -> bool,
    {
        let mut fields = Vec::new();
        while let Some(message) = self.next_message()? {
            fields.extend(parse_message(&message, &wanted)?);
        }
        Ok(fields)
    }
}

/// Walk the sections of one message, emitting a field at every data section.
///
/// Sections 2 to 7 may repeat within a message; each field uses the most
/// recent grid, product, representation and bitmap sections.
pub fn parse_message<F>(message: &[u8], wanted: F) -> Grib2Result<Vec<Grib2Field>>
where
    F: Fn(u8, &ProductDefinition) -> bool,
{
    let indicator = sections::parse_indicator(message)?;

    let mut ident: Option<Identification> = None;
    let mut grid: Option<GridDefinition> = None;
    let mut product: Option<ProductDefinition> = None;
    let mut repr: Option<DataRepresentation> = None;
    let mut bitmap: Option<Vec<u8>> = None;
    let mut previous_bitmap: Option<Vec<u8>> = None;
    let mut submessage = 0;
    let mut fields = Vec::new();

    let mut offset = 16;
    while offset + 4 <= message.len() && &message[offset..offset + 4] != b"7777" {
        if offset + 5 > message.len() {
            return Err(Grib2Error::InvalidFormat("truncated section header".into()));
        }
        let length = sections::read_u32(message, offset) as usize;
        let number = message[offset + 4];
        if length < 5 || offset + length > message.len() {
            return Err(Grib2Error::section(number, "Invalid section length"));
        }
        let section = &message[offset..offset + length];
        trace!(number, length, "GRIB2 section");

        match number {
            1 => ident = Some(sections::parse_identification(section)?),
            2 => {}
            3 => grid = Some(sections::parse_grid_definition(section)?),
            4 => product = Some(sections::parse_product_definition(section)?),
            5 => repr = Some(sections::parse_data_representation(section)?),
            6 => match sections::parse_bitmap(section)? {
                Bitmap::None => bitmap = None,
                Bitmap::Present(bits) => {
                    previous_bitmap = Some(bits.clone());
                    bitmap = Some(bits);
                }
                Bitmap::Previous => bitmap = previous_bitmap.clone(),
            },
            7 => {
                let (Some(ident), Some(grid), Some(product), Some(repr)) =
                    (&ident, &grid, &product, &repr)
                else {
                    return Err(Grib2Error::section(7, "data section before its metadata"));
                };

                if wanted(indicator.discipline, product) {
                    let payload = sections::data_payload(section)?;
                    let values = match repr.template {
                        0 => unpacking::unpack_simple(
                            payload,
                            grid.num_points(),
                            repr,
                            bitmap.as_deref(),
                        )?,
                        _ => unpacking::decode_with_grib_crate(message, submessage)?,
                    };

                    if values.len() != grid.num_points() {
                        return Err(Grib2Error::UnpackingError(format!(
                            "decoded {} values for {} grid points",
                            values.len(),
                            grid.num_points()
                        )));
                    }

                    fields.push(Grib2Field {
                        discipline: indicator.discipline,
                        reference_time: ident.reference_time,
                        grid: grid.clone(),
                        product: product.clone(),
                        values,
                    });
                } else {
                    debug!(
                        name = %sections::parameter_short_name(
                            indicator.discipline,
                            product.parameter_category,
                            product.parameter_number
                        ),
                        "Skipping field"
                    );
                }
                submessage += 1;
            }
            other => {
                return Err(Grib2Error::section(other, "unexpected section number"));
            }
        }

        offset += length;
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_has_no_messages() {
        let mut reader = Grib2Reader::new(Bytes::from_static(b"not a grib file"));
        assert!(reader.next_message().unwrap().is_none());
    }

    #[test]
    fn test_truncated_message_rejected() {
        let mut data = b"GRIB\0\0\x0a\x02".to_vec();
        data.extend_from_slice(&1000u64.to_be_bytes());
        data.extend_from_slice(&[0; 20]);

        let mut reader = Grib2Reader::new(Bytes::from(data));
        assert!(matches!(
            reader.next_message(),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }
}
