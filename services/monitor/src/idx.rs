//! GRIB2 inventory (`.idx`) parsing and byte-range selection.
//!
//! An inventory line looks like
//! `12:3456789:d=2020100807:HTSGW:surface:3 hour fcst:` and gives the byte
//! offset of each record in the GRIB file. Records are fetched from their own
//! offset to the next record's offset minus one; the last record runs to the
//! end of the file.

use anyhow::{bail, Context, Result};

/// One inventory line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxRecord {
    /// Record number, `7` or `7.2` for submessages
    pub number: String,
    pub offset: u64,
    pub date: String,
    pub variable: String,
    pub level: String,
    pub forecast: String,
}

/// Inclusive byte range, open-ended when `end` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Value for an HTTP `Range` header.
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }

    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end + 1 - self.start)
    }
}

/// Parse inventory text. Blank lines are ignored.
pub fn parse_inventory(text: &str) -> Result<Vec<IdxRecord>> {
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 6 {
            bail!("inventory line {} has {} fields: {}", n + 1, fields.len(), line);
        }

        let offset = fields[1]
            .parse()
            .with_context(|| format!("inventory line {}: bad offset '{}'", n + 1, fields[1]))?;

        records.push(IdxRecord {
            number: fields[0].to_string(),
            offset,
            date: fields[2].trim_start_matches("d=").to_string(),
            variable: fields[3].to_string(),
            level: fields[4].to_string(),
            forecast: fields[5].to_string(),
        });
    }

    if records.is_empty() {
        bail!("inventory is empty");
    }
    Ok(records)
}

/// Byte ranges of the records whose variable is in `variables`, with
/// adjacent ranges merged.
pub fn select_ranges(records: &[IdxRecord], variables: &[String]) -> Vec<ByteRange> {
    let mut ranges: Vec<ByteRange> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if !variables.iter().any(|v| v == &record.variable) {
            continue;
        }

        // Submessages share an offset; the record ends where the next
        // distinct offset begins.
        let end = records[i + 1..]
            .iter()
            .map(|r| r.offset)
            .find(|&o| o > record.offset)
            .map(|o| o - 1);
        let range = ByteRange {
            start: record.offset,
            end,
        };

        match ranges.last_mut() {
            Some(last) if last.start == range.start => {}
            Some(last) if last.end.map(|e| e + 1) == Some(range.start) => last.end = range.end,
            _ => ranges.push(range),
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "\
1:0:d=2020100807:WIND:surface:anl:
2:1000:d=2020100807:WDIR:surface:anl:
3:2500:d=2020100807:UGRD:surface:anl:
4:4000:d=2020100807:HTSGW:surface:anl:
5:5200:d=2020100807:WIND:surface:1 hour fcst:
";

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_inventory() {
        let records = parse_inventory(INVENTORY).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[3].variable, "HTSGW");
        assert_eq!(records[3].offset, 4000);
        assert_eq!(records[3].date, "2020100807");
        assert_eq!(records[4].forecast, "1 hour fcst");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_inventory("<html>404</html>").is_err());
        assert!(parse_inventory("1:abc:d=1:WIND:surface:anl:").is_err());
        assert!(parse_inventory("\n\n").is_err());
    }

    #[test]
    fn test_adjacent_records_merge() {
        let records = parse_inventory(INVENTORY).unwrap();
        let ranges = select_ranges(&records, &vars(&["WIND", "WDIR", "HTSGW"]));
        assert_eq!(
            ranges,
            vec![
                ByteRange { start: 0, end: Some(2499) },
                ByteRange { start: 4000, end: None },
            ]
        );
        assert_eq!(ranges[0].header_value(), "bytes=0-2499");
        assert_eq!(ranges[1].header_value(), "bytes=4000-");
        assert_eq!(ranges[0].len(), Some(2500));
    }

    #[test]
    fn test_single_middle_record() {
        let records = parse_inventory(INVENTORY).unwrap();
        let ranges = select_ranges(&records, &vars(&["WDIR"]));
        assert_eq!(ranges, vec![ByteRange { start: 1000, end: Some(2499) }]);
    }

    #[test]
    fn test_submessages_share_range() {
        let text = "\
1:0:d=2020100807:WIND:surface:anl:
1.1:0:d=2020100807:WDIR:surface:anl:
2:800:d=2020100807:TMP:surface:anl:
";
        let records = parse_inventory(text).unwrap();
        let ranges = select_ranges(&records, &vars(&["WIND", "WDIR"]));
        assert_eq!(ranges, vec![ByteRange { start: 0, end: Some(799) }]);
    }

    #[test]
    fn test_nothing_selected() {
        let records = parse_inventory(INVENTORY).unwrap();
        assert!(select_ranges(&records, &vars(&["PRMSL"])).is_empty());
    }
}
