//! Synthetic GRIB2 message builder.
//!
//! Produces small, structurally valid GRIB2 messages with simple packing for
//! decoder tests. NaN data values are written as missing through a bitmap.

use wave_common::Parameter;

/// Grid definition written into Section 3.
#[derive(Debug, Clone)]
pub enum GridTemplate {
    /// Template 3.0, angles in degrees
    LatLon {
        ni: u32,
        nj: u32,
        la1: f64,
        lo1: f64,
        di: f64,
        dj: f64,
    },
    /// Template 3.30, angles in degrees, spacing in meters
    Lambert {
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        lov: f64,
        latin: f64,
        dx: f64,
        dy: f64,
    },
}

impl GridTemplate {
    fn num_points(&self) -> u32 {
        match self {
            GridTemplate::LatLon { ni, nj, .. } => ni * nj,
            GridTemplate::Lambert { nx, ny, .. } => nx * ny,
        }
    }
}

/// Build a single-field GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    grid: GridTemplate,
    scanning_mode: u8,
    param_category: u8,
    param_number: u8,
    time_unit: u8,
    forecast_time: u32,
    level_type: u8,
    decimal_scale: i16,
    data_values: Vec<f32>,
}

/// GRIB2 sign-magnitude encoding.
pub fn encode_i32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7fff_ffff;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

pub fn encode_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7fff;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

fn micro(degrees: f64) -> [u8; 4] {
    encode_i32((degrees * 1e6).round() as i32)
}

impl Grib2Builder {
    /// Significant wave height on a 4x3 lat/lon grid over southern Lake
    /// Michigan, longitudes in 0..360 like the wave model writes them.
    pub fn new_wave_height() -> Self {
        let grid = GridTemplate::LatLon {
            ni: 4,
            nj: 3,
            la1: 41.5,
            lo1: 271.5,
            di: 0.5,
            dj: 0.5,
        };
        let n = grid.num_points() as usize;
        Self {
            discipline: 10, // Oceanographic
            center: 7,      // NCEP
            year: 2020,
            month: 10,
            day: 8,
            hour: 7,
            grid,
            scanning_mode: 0b0100_0000, // +i, +j, i consecutive
            param_category: 0,
            param_number: 3, // HTSGW
            time_unit: 1,
            forecast_time: 0,
            level_type: 1,
            decimal_scale: 0,
            data_values: vec![1.0; n],
        }
    }

    /// Builder preset for one of the extracted quantities.
    pub fn for_parameter(param: Parameter) -> Self {
        let builder = Self::new_wave_height();
        match param {
            Parameter::WaveHeight => builder,
            Parameter::WindSpeed => builder.with_parameter(0, 2, 1).with_constant_value(8.0),
            Parameter::WindDirection => builder.with_parameter(0, 2, 0).with_constant_value(225.0),
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_parameter(mut self, discipline: u8, category: u8, number: u8) -> Self {
        self.discipline = discipline;
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_lat_lon_grid(mut self, ni: u32, nj: u32, la1: f64, lo1: f64, di: f64, dj: f64) -> Self {
        self.grid = GridTemplate::LatLon {
            ni,
            nj,
            la1,
            lo1,
            di,
            dj,
        };
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_lambert_grid(
        mut self,
        nx: u32,
        ny: u32,
        la1: f64,
        lo1: f64,
        lov: f64,
        latin: f64,
        dx: f64,
        dy: f64,
    ) -> Self {
        self.grid = GridTemplate::Lambert {
            nx,
            ny,
            la1,
            lo1,
            lov,
            latin,
            dx,
            dy,
        };
        self.data_values = vec![0.0; (nx * ny) as usize];
        self
    }

    pub fn with_scanning_mode(mut self, mode: u8) -> Self {
        self.scanning_mode = mode;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.time_unit = 1;
        self.forecast_time = hour;
        self
    }

    pub fn with_forecast_time(mut self, unit: u8, value: u32) -> Self {
        self.time_unit = unit;
        self.forecast_time = value;
        self
    }

    pub fn with_decimal_scale(mut self, d: i16) -> Self {
        self.decimal_scale = d;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; self.grid.num_points() as usize];
        self
    }

    pub fn with_gradient(mut self, min_val: f32, max_val: f32) -> Self {
        let n = self.grid.num_points() as usize;
        self.data_values = (0..n)
            .map(|i| min_val + (max_val - min_val) * (i as f32 / n as f32))
            .collect();
        self
    }

    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut message = Vec::new();

        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];

        let message_length = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        // Section 0: Indicator
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());

        for section in &sections {
            message.extend_from_slice(section);
        }

        // Section 8: End
        message.extend_from_slice(b"7777");

        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);

        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Start of forecast

        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0);
        section.push(0);

        section.push(0); // Operational
        section.push(1); // Forecast
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut template = Vec::new();

        // Shape of the earth: spherical, radius 6371229 m
        template.push(6);
        template.push(0);
        template.extend_from_slice(&0u32.to_be_bytes());
        template.push(0);
        template.extend_from_slice(&0u32.to_be_bytes());
        template.push(0);
        template.extend_from_slice(&0u32.to_be_bytes());

        let number: u16 = match &self.grid {
            GridTemplate::LatLon {
                ni,
                nj,
                la1,
                lo1,
                di,
                dj,
            } => {
                let i_sign = if self.scanning_mode & 0x80 != 0 { -1.0 } else { 1.0 };
                let j_sign = if self.scanning_mode & 0x40 != 0 { 1.0 } else { -1.0 };
                let la2 = la1 + j_sign * dj * (*nj as f64 - 1.0);
                let lo2 = lo1 + i_sign * di * (*ni as f64 - 1.0);

                template.extend_from_slice(&ni.to_be_bytes());
                template.extend_from_slice(&nj.to_be_bytes());
                template.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
                template.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
                template.extend_from_slice(&micro(*la1));
                template.extend_from_slice(&micro(*lo1));
                template.push(48); // Resolution and component flags
                template.extend_from_slice(&micro(la2));
                template.extend_from_slice(&micro(lo2));
                template.extend_from_slice(&((di * 1e6).round() as u32).to_be_bytes());
                template.extend_from_slice(&((dj * 1e6).round() as u32).to_be_bytes());
                template.push(self.scanning_mode);
                0
            }
            GridTemplate::Lambert {
                nx,
                ny,
                la1,
                lo1,
                lov,
                latin,
                dx,
                dy,
            } => {
                template.extend_from_slice(&nx.to_be_bytes());
                template.extend_from_slice(&ny.to_be_bytes());
                template.extend_from_slice(&micro(*la1));
                template.extend_from_slice(&micro(*lo1));
                template.push(8); // Resolution and component flags
                template.extend_from_slice(&micro(*latin)); // LaD
                template.extend_from_slice(&micro(*lov));
                template.extend_from_slice(&((dx * 1e3).round() as u32).to_be_bytes());
                template.extend_from_slice(&((dy * 1e3).round() as u32).to_be_bytes());
                template.push(0); // North pole on projection plane
                template.push(self.scanning_mode);
                template.extend_from_slice(&micro(*latin));
                template.extend_from_slice(&micro(*latin));
                template.extend_from_slice(&micro(-90.0)); // Southern pole
                template.extend_from_slice(&micro(0.0));
                30
            }
        };

        let mut section = Vec::new();
        section.extend_from_slice(&(14 + template.len() as u32).to_be_bytes());
        section.push(3);
        section.push(0); // Source of grid definition
        section.extend_from_slice(&self.grid.num_points().to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&number.to_be_bytes());
        section.extend_from_slice(&template);
        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&34u32.to_be_bytes());
        section.push(4);

        section.extend_from_slice(&0u16.to_be_bytes()); // Coordinate values
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0

        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2); // Forecast
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes());
        section.push(0);
        section.push(self.time_unit);
        section.extend_from_slice(&self.forecast_time.to_be_bytes());

        section.push(self.level_type);
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.push(255);
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section
    }

    /// Present values scaled by 10^D.
    fn scaled_values(&self) -> Vec<f64> {
        let factor = 10f64.powi(self.decimal_scale as i32);
        self.data_values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|&v| v as f64 * factor)
            .collect()
    }

    /// (reference value, binary scale factor, bits per value)
    fn packing_parameters(&self) -> (f32, i16, u8) {
        let scaled = self.scaled_values();
        let (min_val, max_val) = scaled
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            });

        if scaled.is_empty() {
            return (0.0, 0, 0);
        }

        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val as f32, 0, 0);
        }

        // packed = (value - R) / 2^E must fit in 16 bits
        let e = (range / 65535.0).log2().ceil() as i16;
        (min_val as f32, e, 16)
    }

    fn build_section5(&self) -> Vec<u8> {
        let (reference, e, bits) = self.packing_parameters();

        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);

        section.extend_from_slice(&(self.scaled_values().len() as u32).to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 5.0

        section.extend_from_slice(&reference.to_be_bytes());
        section.extend_from_slice(&encode_i16(e));
        section.extend_from_slice(&encode_i16(self.decimal_scale));
        section.push(bits);
        section.push(0); // Floating point
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        let mut section = Vec::new();

        if self.data_values.iter().any(|v| v.is_nan()) {
            let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
            for (i, v) in self.data_values.iter().enumerate() {
                if !v.is_nan() {
                    bitmap[i / 8] |= 0x80 >> (i % 8);
                }
            }
            section.extend_from_slice(&(6 + bitmap.len() as u32).to_be_bytes());
            section.push(6);
            section.push(0);
            section.extend_from_slice(&bitmap);
        } else {
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6);
            section.push(255); // No bitmap
        }
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let (reference, e, bits) = self.packing_parameters();

        let mut packed = Vec::new();
        if bits > 0 {
            let scale = 2f64.powi(e as i32);
            for v in self.scaled_values() {
                let x = ((v - reference as f64) / scale).round().clamp(0.0, 65535.0) as u16;
                packed.extend_from_slice(&x.to_be_bytes());
            }
        }

        let mut section = Vec::new();
        section.extend_from_slice(&(5 + packed.len() as u32).to_be_bytes());
        section.push(7);
        section.extend_from_slice(&packed);
        section
    }
}

/// Concatenate messages into one file.
pub fn build_file(messages: &[Vec<u8>]) -> Vec<u8> {
    messages.concat()
}
