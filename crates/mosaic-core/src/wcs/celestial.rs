use serde::{Deserialize, Serialize};

/// Celestial reference frame of a coordinate solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CelestialFrame {
    /// ICRS / FK5 J2000 right ascension and declination.
    Equatorial,
    /// IAU galactic longitude and latitude.
    #[default]
    Galactic,
}

impl CelestialFrame {
    /// CTYPE prefixes (padded to 4 characters) for the longitude and latitude axes.
    pub fn ctype_prefixes(self) -> (&'static str, &'static str) {
        match self {
            Self::Equatorial => ("RA--", "DEC-"),
            Self::Galactic => ("GLON", "GLAT"),
        }
    }

    /// Identify the frame from a longitude-axis CTYPE value such as `RA---TAN`.
    pub fn from_lon_ctype(ctype: &str) -> Option<Self> {
        let prefix = ctype.split('-').next().unwrap_or("");
        match prefix {
            "RA" => Some(Self::Equatorial),
            "GLON" => Some(Self::Galactic),
            _ => None,
        }
    }

    /// Identify the frame from a latitude-axis CTYPE value such as `DEC--TAN`.
    pub fn from_lat_ctype(ctype: &str) -> Option<Self> {
        let prefix = ctype.split('-').next().unwrap_or("");
        match prefix {
            "DEC" => Some(Self::Equatorial),
            "GLAT" => Some(Self::Galactic),
            _ => None,
        }
    }
}

impl std::fmt::Display for CelestialFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equatorial => write!(f, "Equatorial"),
            Self::Galactic => write!(f, "Galactic"),
        }
    }
}

/// ICRS to galactic rotation (Hipparcos, ESA 1997 vol. 1 §1.5.3).
const ICRS_TO_GALACTIC: [[f64; 3]; 3] = [
    [-0.054_875_560_416_215_4, -0.873_437_090_234_885, -0.483_835_015_548_713_2],
    [0.494_109_427_875_583_7, -0.444_829_629_960_011_2, 0.746_982_244_497_218_9],
    [-0.867_666_149_019_004_7, -0.198_076_373_431_201_5, 0.455_983_776_175_066_9],
];

/// A position on the sky in degrees, tagged with its frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyCoord {
    pub lon: f64,
    pub lat: f64,
    pub frame: CelestialFrame,
}

impl SkyCoord {
    pub fn new(lon: f64, lat: f64, frame: CelestialFrame) -> Self {
        Self {
            lon: lon.rem_euclid(360.0),
            lat,
            frame,
        }
    }

    pub fn from_unit_vector(v: [f64; 3], frame: CelestialFrame) -> Self {
        let lon = v[1].atan2(v[0]).to_degrees();
        let lat = v[2].clamp(-1.0, 1.0).asin().to_degrees();
        Self::new(lon, lat, frame)
    }

    pub fn to_unit_vector(&self) -> [f64; 3] {
        let (lon, lat) = (self.lon.to_radians(), self.lat.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    /// Express this position in another frame.
    pub fn to_frame(&self, frame: CelestialFrame) -> SkyCoord {
        if frame == self.frame {
            return *self;
        }
        let v = self.to_unit_vector();
        let rotated = match (self.frame, frame) {
            (CelestialFrame::Equatorial, CelestialFrame::Galactic) => mat_vec(&ICRS_TO_GALACTIC, v),
            (CelestialFrame::Galactic, CelestialFrame::Equatorial) => {
                mat_t_vec(&ICRS_TO_GALACTIC, v)
            }
            _ => v,
        };
        SkyCoord::from_unit_vector(rotated, frame)
    }

    /// Great-circle distance to another coordinate, in degrees.
    pub fn separation(&self, other: &SkyCoord) -> f64 {
        let a = self.to_unit_vector();
        let b = other.to_frame(self.frame).to_unit_vector();
        let cross = [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ];
        let sin = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        let cos = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        sin.atan2(cos).to_degrees()
    }
}

fn mat_vec(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn mat_t_vec(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
    ]
}
