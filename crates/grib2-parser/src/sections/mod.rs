//! GRIB2 section parsing.
//!
//! Every parser takes the bytes of a single section, starting at its 4-byte
//! length field. Offsets in the layout comments are zero-based indices into
//! that slice.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use wave_common::{Array2, ForecastGrid, Parameter, WaveResult};

use crate::lambert::LambertConformal;
use crate::{Grib2Error, Grib2Result};

/// Mean earth radius used when the file specifies shape 6 (m).
pub const EARTH_RADIUS: f64 = 6_371_229.0;

// ===== Byte helpers =====

pub(crate) fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

pub(crate) fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// GRIB2 signed integers are sign-magnitude: the top bit is the sign.
pub(crate) fn read_i16(data: &[u8], at: usize) -> i16 {
    let raw = read_u16(data, at);
    let magnitude = (raw & 0x7fff) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

pub(crate) fn read_i32(data: &[u8], at: usize) -> i32 {
    let raw = read_u32(data, at);
    let magnitude = (raw & 0x7fff_ffff) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn require(section: u8, data: &[u8], len: usize) -> Grib2Result<()> {
    if data.len() < len {
        return Err(Grib2Error::section(
            section,
            format!("need at least {} bytes, got {}", len, data.len()),
        ));
    }
    Ok(())
}

// ===== Section 0 =====

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Parse Section 0 from the start of a message.
pub fn parse_indicator(data: &[u8]) -> Grib2Result<Indicator> {
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // 0-3: "GRIB"
    // 4-5: reserved
    // 6: discipline
    // 7: edition
    // 8-15: total message length
    let edition = data[7];
    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let mut length = [0u8; 8];
    length.copy_from_slice(&data[8..16]);

    Ok(Indicator {
        discipline: data[6],
        edition,
        message_length: u64::from_be_bytes(length),
    })
}

// ===== Section 1 =====

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    /// Model initialization time
    pub reference_time: DateTime<Utc>,
}

pub fn parse_identification(section: &[u8]) -> Grib2Result<Identification> {
    require(1, section, 21)?;

    // 5-6: center, 7-8: sub-center, 9-11: tables and significance
    // 12-13: year, 14: month, 15: day, 16: hour, 17: minute, 18: second
    let year = read_u16(section, 12);
    let (month, day, hour, minute, second) = (
        section[14],
        section[15],
        section[16],
        section[17],
        section[18],
    );

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            Grib2Error::section(
                1,
                format!(
                    "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ),
            )
        })?;

    Ok(Identification {
        center: read_u16(section, 5),
        sub_center: read_u16(section, 7),
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
    })
}

// ===== Section 3 =====

/// Scanning mode flags (Flag Table 3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanMode(pub u8);

impl ScanMode {
    /// Points along a row run east to west.
    pub fn i_negative(self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Rows run south to north.
    pub fn j_positive(self) -> bool {
        self.0 & 0x40 != 0
    }

    /// Consecutive values walk along a column instead of a row.
    pub fn j_consecutive(self) -> bool {
        self.0 & 0x20 != 0
    }

    /// Alternate rows reverse direction.
    pub fn boustrophedon(self) -> bool {
        self.0 & 0x10 != 0
    }
}

/// Template 3.0: regular latitude/longitude grid. Angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    pub ni: usize,
    pub nj: usize,
    pub la1: f64,
    pub lo1: f64,
    pub la2: f64,
    pub lo2: f64,
    pub di: f64,
    pub dj: f64,
    pub scan: ScanMode,
}

/// Template 3.30: Lambert conformal grid. Angles in degrees, spacing in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertGrid {
    pub nx: usize,
    pub ny: usize,
    pub la1: f64,
    pub lo1: f64,
    pub lad: f64,
    pub lov: f64,
    pub dx: f64,
    pub dy: f64,
    pub latin1: f64,
    pub latin2: f64,
    pub earth_radius: f64,
    pub scan: ScanMode,
}

/// Section 3: Grid Definition Section
#[derive(Debug, Clone, PartialEq)]
pub enum GridDefinition {
    LatLon(LatLonGrid),
    Lambert(LambertGrid),
}

impl GridDefinition {
    /// Points along a row (i) and along a column (j).
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            GridDefinition::LatLon(g) => (g.ni, g.nj),
            GridDefinition::Lambert(g) => (g.nx, g.ny),
        }
    }

    pub fn scan_mode(&self) -> ScanMode {
        match self {
            GridDefinition::LatLon(g) => g.scan,
            GridDefinition::Lambert(g) => g.scan,
        }
    }

    pub fn num_points(&self) -> usize {
        let (ni, nj) = self.dimensions();
        ni * nj
    }

    /// (rows, columns) of the grid in the order values are stored.
    pub fn shape(&self) -> (usize, usize) {
        let (ni, nj) = self.dimensions();
        if self.scan_mode().j_consecutive() {
            (ni, nj)
        } else {
            (nj, ni)
        }
    }

    /// Grid (i, j) position of the k-th stored value.
    fn ij(&self, k: usize) -> (usize, usize) {
        let (ni, nj) = self.dimensions();
        if self.scan_mode().j_consecutive() {
            (k / nj, k % nj)
        } else {
            (k % ni, k / ni)
        }
    }

    /// Longitude and latitude of every point, laid out like the data values,
    /// with longitudes mapped into −180..180.
    pub fn coordinates(&self) -> WaveResult<ForecastGrid> {
        let (rows, cols) = self.shape();
        let n = self.num_points();
        let scan = self.scan_mode();

        let mut lons = Vec::with_capacity(n);
        let mut lats = Vec::with_capacity(n);

        match self {
            GridDefinition::LatLon(g) => {
                let di = if scan.i_negative() { -g.di } else { g.di };
                let dj = if scan.j_positive() { g.dj } else { -g.dj };
                for k in 0..n {
                    let (i, j) = self.ij(k);
                    lons.push(g.lo1 + i as f64 * di);
                    lats.push(g.la1 + j as f64 * dj);
                }
            }
            GridDefinition::Lambert(g) => {
                let proj = LambertConformal::from_grid(g);
                let si = if scan.i_negative() { -1.0 } else { 1.0 };
                let sj = if scan.j_positive() { 1.0 } else { -1.0 };
                for k in 0..n {
                    let (i, j) = self.ij(k);
                    let (lat, lon) = proj.grid_to_geo(si * i as f64, sj * j as f64);
                    lons.push(lon);
                    lats.push(lat);
                }
            }
        }

        let grid = ForecastGrid::new(
            Array2::from_flat(rows, cols, lons)?,
            Array2::from_flat(rows, cols, lats)?,
        )?;
        Ok(grid.with_normalized_longitudes())
    }
}

fn earth_radius(gd: &[u8]) -> f64 {
    // 0: shape of the earth, 1: scale factor, 2-5: scaled radius
    match gd[0] {
        0 => 6_367_470.0,
        1 => {
            let scale = gd[1] as i32;
            let value = read_u32(gd, 2) as f64;
            if value > 0.0 {
                value / 10f64.powi(scale)
            } else {
                EARTH_RADIUS
            }
        }
        _ => EARTH_RADIUS,
    }
}

pub fn parse_grid_definition(section: &[u8]) -> Grib2Result<GridDefinition> {
    require(3, section, 14)?;

    // 5: source of grid definition
    // 6-9: number of data points
    // 10-11: optional list description
    // 12-13: grid definition template number
    // 14+: template
    let template = read_u16(section, 12);
    let gd = &section[14..];

    // Angles are in microdegrees.
    let degrees = |at: usize| read_i32(gd, at) as f64 / 1e6;

    let grid = match template {
        0 => {
            if gd.len() < 58 {
                return Err(Grib2Error::section(
                    3,
                    format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
                ));
            }
            // 16-19: Ni, 20-23: Nj, 24-31: basic angle
            // 32-35: La1, 36-39: Lo1, 40: flags, 41-44: La2, 45-48: Lo2
            // 49-52: Di, 53-56: Dj, 57: scanning mode
            GridDefinition::LatLon(LatLonGrid {
                ni: read_u32(gd, 16) as usize,
                nj: read_u32(gd, 20) as usize,
                la1: degrees(32),
                lo1: degrees(36),
                la2: degrees(41),
                lo2: degrees(45),
                di: read_u32(gd, 49) as f64 / 1e6,
                dj: read_u32(gd, 53) as f64 / 1e6,
                scan: ScanMode(gd[57]),
            })
        }
        30 => {
            if gd.len() < 59 {
                return Err(Grib2Error::section(
                    3,
                    format!("Template 30 needs at least 59 bytes, got {}", gd.len()),
                ));
            }
            // 16-19: Nx, 20-23: Ny, 24-27: La1, 28-31: Lo1, 32: flags
            // 33-36: LaD, 37-40: LoV, 41-44: Dx (mm), 45-48: Dy (mm)
            // 49: projection centre, 50: scanning mode
            // 51-54: Latin1, 55-58: Latin2
            GridDefinition::Lambert(LambertGrid {
                nx: read_u32(gd, 16) as usize,
                ny: read_u32(gd, 20) as usize,
                la1: degrees(24),
                lo1: degrees(28),
                lad: degrees(33),
                lov: degrees(37),
                dx: read_u32(gd, 41) as f64 / 1e3,
                dy: read_u32(gd, 45) as f64 / 1e3,
                latin1: degrees(51),
                latin2: degrees(55),
                earth_radius: earth_radius(gd),
                scan: ScanMode(gd[50]),
            })
        }
        number => {
            return Err(Grib2Error::UnsupportedTemplate {
                kind: "grid definition",
                number,
            })
        }
    };

    if grid.scan_mode().boustrophedon() {
        return Err(Grib2Error::section(3, "alternating row scanning not supported"));
    }
    if grid.num_points() == 0 {
        return Err(Grib2Error::section(3, "grid has no points"));
    }

    Ok(grid)
}

// ===== Section 4 =====

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    /// Code Table 4.4
    pub time_unit: u8,
    pub forecast_time: u32,
    pub level_type: u8,
}

impl ProductDefinition {
    /// Offset of the valid time from the reference time.
    pub fn lead_time(&self) -> Option<Duration> {
        let t = self.forecast_time as i64;
        match self.time_unit {
            0 => Some(Duration::minutes(t)),
            1 => Some(Duration::hours(t)),
            2 => Some(Duration::days(t)),
            10 => Some(Duration::hours(3 * t)),
            11 => Some(Duration::hours(6 * t)),
            12 => Some(Duration::hours(12 * t)),
            13 => Some(Duration::seconds(t)),
            _ => None,
        }
    }

    /// The quantity this message carries, if it is one we extract.
    pub fn parameter(&self, discipline: u8) -> Option<Parameter> {
        match (discipline, self.parameter_category, self.parameter_number) {
            (10, 0, 3) => Some(Parameter::WaveHeight),
            (0, 2, 1) => Some(Parameter::WindSpeed),
            (0, 2, 0) => Some(Parameter::WindDirection),
            _ => None,
        }
    }
}

pub fn parse_product_definition(section: &[u8]) -> Grib2Result<ProductDefinition> {
    require(4, section, 23)?;

    // 5-6: number of coordinate values
    // 7-8: product definition template number
    // 9: parameter category, 10: parameter number
    // 11-16: generating process and cutoff
    // 17: unit of time range, 18-21: forecast time
    // 22: type of first fixed surface
    let template = read_u16(section, 7);
    if template > 15 {
        return Err(Grib2Error::UnsupportedTemplate {
            kind: "product definition",
            number: template,
        });
    }

    Ok(ProductDefinition {
        template,
        parameter_category: section[9],
        parameter_number: section[10],
        time_unit: section[17],
        forecast_time: read_u32(section, 18),
        level_type: section[22],
    })
}

/// Short name for a parameter, for logging.
pub fn parameter_short_name(discipline: u8, category: u8, number: u8) -> String {
    match (discipline, category, number) {
        (0, 2, 0) => "WDIR".to_string(),
        (0, 2, 1) => "WIND".to_string(),
        (0, 2, 2) => "UGRD".to_string(),
        (0, 2, 3) => "VGRD".to_string(),
        (10, 0, 3) => "HTSGW".to_string(),
        (10, 0, 4) => "WVDIR".to_string(),
        (10, 0, 5) => "WVHGT".to_string(),
        (10, 0, 6) => "WVPER".to_string(),
        (10, 0, 7) => "SWDIR".to_string(),
        (10, 0, 8) => "SWELL".to_string(),
        (10, 0, 9) => "SWPER".to_string(),
        (10, 0, 10) => "DIRPW".to_string(),
        (10, 0, 11) => "PERPW".to_string(),
        (10, 2, 0) => "ICEC".to_string(),
        _ => format!("P{}_{}_{}", discipline, category, number),
    }
}

// ===== Section 5 =====

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    /// Number of packed values (points present in the bitmap)
    pub num_values: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

pub fn parse_data_representation(section: &[u8]) -> Grib2Result<DataRepresentation> {
    require(5, section, 20)?;

    // 5-8: number of values
    // 9-10: template number
    // 11-14: reference value (IEEE float)
    // 15-16: binary scale factor E, 17-18: decimal scale factor D
    // 19: bits per packed value
    // Templates 5.0, 5.2, 5.3, 5.40 and 5.41 all start this way.
    Ok(DataRepresentation {
        num_values: read_u32(section, 5),
        template: read_u16(section, 9),
        reference_value: f32::from_be_bytes([section[11], section[12], section[13], section[14]]),
        binary_scale_factor: read_i16(section, 15),
        decimal_scale_factor: read_i16(section, 17),
        bits_per_value: section[19],
    })
}

// ===== Section 6 =====

/// Section 6: Bitmap Section
#[derive(Debug, Clone, PartialEq)]
pub enum Bitmap {
    /// Every point has a value
    None,
    /// One bit per grid point, 1 = present
    Present(Vec<u8>),
    /// Reuse the bitmap of the previous field in the message
    Previous,
}

pub fn parse_bitmap(section: &[u8]) -> Grib2Result<Bitmap> {
    require(6, section, 6)?;

    match section[5] {
        0 => Ok(Bitmap::Present(section[6..].to_vec())),
        254 => Ok(Bitmap::Previous),
        255 => Ok(Bitmap::None),
        other => Err(Grib2Error::section(
            6,
            format!("predefined bitmap {} not supported", other),
        )),
    }
}

// ===== Section 7 =====

/// Packed data of Section 7.
pub fn data_payload(section: &[u8]) -> Grib2Result<&[u8]> {
    require(7, section, 5)?;
    Ok(&section[5..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(read_i16(&[0x80, 0x05], 0), -5);
        assert_eq!(read_i16(&[0x00, 0x05], 0), 5);
        assert_eq!(read_i32(&[0x85, 0x36, 0x3a, 0x80], 0), -87_440_000);
        assert_eq!(read_i32(&[0x02, 0x7f, 0x12, 0x40], 0), 41_882_176);
    }

    #[test]
    fn test_scan_mode_flags() {
        let scan = ScanMode(0b0100_0000);
        assert!(scan.j_positive());
        assert!(!scan.i_negative());
        assert!(!scan.j_consecutive());
        assert!(ScanMode(0x20).j_consecutive());
    }

    #[test]
    fn test_lead_time_units() {
        let mut pd = ProductDefinition {
            template: 0,
            parameter_category: 0,
            parameter_number: 3,
            time_unit: 1,
            forecast_time: 6,
            level_type: 1,
        };
        assert_eq!(pd.lead_time(), Some(Duration::hours(6)));
        pd.time_unit = 0;
        assert_eq!(pd.lead_time(), Some(Duration::minutes(6)));
        pd.time_unit = 11;
        assert_eq!(pd.lead_time(), Some(Duration::hours(36)));
        pd.time_unit = 99;
        assert_eq!(pd.lead_time(), None);
    }

    #[test]
    fn test_parameter_mapping() {
        let pd = ProductDefinition {
            template: 0,
            parameter_category: 0,
            parameter_number: 3,
            time_unit: 1,
            forecast_time: 0,
            level_type: 1,
        };
        assert_eq!(pd.parameter(10), Some(Parameter::WaveHeight));
        // Same numbers in the meteorological discipline are not a wave field.
        assert_eq!(pd.parameter(0), None);
    }

    #[test]
    fn test_j_consecutive_shape() {
        let grid = GridDefinition::LatLon(LatLonGrid {
            ni: 3,
            nj: 2,
            la1: 42.0,
            lo1: 270.0,
            la2: 43.0,
            lo2: 272.0,
            di: 1.0,
            dj: 1.0,
            scan: ScanMode(0x60),
        });
        assert_eq!(grid.shape(), (3, 2));

        let coords = grid.coordinates().unwrap();
        // Second stored value is one step north of the first.
        assert_eq!(coords.lats().as_slice()[1], 43.0);
        assert_eq!(coords.lons().as_slice()[2], -89.0);
    }
}
