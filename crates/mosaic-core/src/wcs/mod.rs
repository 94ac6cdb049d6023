//! Two-dimensional celestial coordinate solutions.
//!
//! Pixel coordinates throughout this module are 0-based `(x, y)` = `(col, row)`,
//! i.e. FITS pixel coordinates minus one. `crpix` keeps the FITS 1-based value
//! so it can be written back to a header unchanged.
//!
//! Projection and linear-transform evaluation is delegated to the `wcs` crate,
//! which works in ICRS radians. [`Wcs`] adds the frame tag of the header it was
//! built from and turns results back into [`SkyCoord`]s in that frame.

pub mod celestial;
pub mod projection;

use std::fmt;
use std::sync::Arc;

use ::wcs::{ImgXY, LonLat, WCSParams, WCS};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{MosaicError, Result};
use crate::io::fits::{Card, FitsHeader, HeaderValue};

pub use celestial::{CelestialFrame, SkyCoord};
pub use projection::Projection;

/// Keywords carried from an input header into the solution, besides `CTYPEi`.
const SOLUTION_KEYWORDS: &[&str] = &[
    "CUNIT1", "CUNIT2", "CRPIX1", "CRPIX2", "CRVAL1", "CRVAL2", "CDELT1", "CDELT2", "CROTA2",
    "CD1_1", "CD1_2", "CD2_1", "CD2_2", "PC1_1", "PC1_2", "PC2_1", "PC2_2", "LONPOLE",
    "LATPOLE", "RADESYS", "EQUINOX",
];

/// A celestial WCS restricted to the two spatial axes of an image.
#[derive(Clone)]
pub struct Wcs {
    frame: CelestialFrame,
    projection: Projection,
    crpix: [f64; 2],
    crval: [f64; 2],
    /// Keywords the solution was built from, in output order.
    cards: Vec<Card>,
    solution: Arc<WCS>,
}

impl Wcs {
    /// North-up style solution from an explicit CD matrix (degrees per pixel).
    pub fn new(
        frame: CelestialFrame,
        projection: Projection,
        crpix: [f64; 2],
        crval: [f64; 2],
        cd: [[f64; 2]; 2],
    ) -> Result<Self> {
        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if det.abs() < 1e-30 || !det.is_finite() {
            return Err(MosaicError::Wcs("Singular CD matrix".into()));
        }

        let (lon_prefix, lat_prefix) = frame.ctype_prefixes();
        let code = projection.code();
        let mut cards = vec![
            Card::new("WCSAXES", 2i64),
            Card::new("CTYPE1", format!("{lon_prefix}-{code}").as_str()),
            Card::new("CTYPE2", format!("{lat_prefix}-{code}").as_str()),
            Card::new("CUNIT1", "deg"),
            Card::new("CUNIT2", "deg"),
            Card::new("CRPIX1", crpix[0]),
            Card::new("CRPIX2", crpix[1]),
            Card::new("CRVAL1", crval[0]),
            Card::new("CRVAL2", crval[1]),
            Card::new("CD1_1", cd[0][0]),
            Card::new("CD1_2", cd[0][1]),
            Card::new("CD2_1", cd[1][0]),
            Card::new("CD2_2", cd[1][1]),
        ];
        if frame == CelestialFrame::Equatorial {
            cards.push(Card::new("RADESYS", "ICRS"));
        }

        // Image size only feeds distortion terms, which a grid never has.
        Self::build(frame, projection, crpix, crval, cards, [1, 1])
    }

    /// Build the spatial WCS from a primary header, ignoring any spectral or band axis.
    pub fn from_header(header: &FitsHeader) -> Result<Self> {
        let ctype1 = header.require_str("CTYPE1")?.trim().to_uppercase();
        let ctype2 = header.require_str("CTYPE2")?.trim().to_uppercase();

        let frame = CelestialFrame::from_lon_ctype(&ctype1).ok_or_else(|| {
            MosaicError::Wcs(format!("CTYPE1 = '{ctype1}' is not a celestial longitude axis"))
        })?;
        if CelestialFrame::from_lat_ctype(&ctype2) != Some(frame) {
            return Err(MosaicError::Wcs(format!(
                "CTYPE2 = '{ctype2}' does not pair with CTYPE1 = '{ctype1}'"
            )));
        }

        let code1 = projection_code(&ctype1)?;
        let code2 = projection_code(&ctype2)?;
        if code1 != code2 {
            return Err(MosaicError::Wcs(format!(
                "Mismatched projections '{code1}' and '{code2}'"
            )));
        }
        let projection = Projection::from_code(code1)
            .ok_or_else(|| MosaicError::Wcs(format!("Unsupported projection '{code1}'")))?;
        if ctype1.len() > 8 {
            warn!(ctype = %ctype1, "Ignoring distortion terms; using the linear solution only");
        }

        let crpix = [header.require_f64("CRPIX1")?, header.require_f64("CRPIX2")?];
        let crval = [header.require_f64("CRVAL1")?, header.require_f64("CRVAL2")?];

        let mut cards = vec![
            Card::new("WCSAXES", 2i64),
            Card::new("CTYPE1", linear_ctype(&ctype1)),
            Card::new("CTYPE2", linear_ctype(&ctype2)),
        ];
        cards.extend(
            SOLUTION_KEYWORDS
                .iter()
                .filter_map(|&key| header.get(key).map(|value| Card::new(key, value.clone()))),
        );

        let size = [
            header.get_i64("NAXIS1").unwrap_or(1),
            header.get_i64("NAXIS2").unwrap_or(1),
        ];
        Self::build(frame, projection, crpix, crval, cards, size)
    }

    fn build(
        frame: CelestialFrame,
        projection: Projection,
        crpix: [f64; 2],
        crval: [f64; 2],
        cards: Vec<Card>,
        size: [i64; 2],
    ) -> Result<Self> {
        let solution = solve(&cards, size)?;
        Ok(Self {
            frame,
            projection,
            crpix,
            crval,
            cards,
            solution: Arc::new(solution),
        })
    }

    pub fn frame(&self) -> CelestialFrame {
        self.frame
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Reference pixel (FITS 1-based).
    pub fn crpix(&self) -> [f64; 2] {
        self.crpix
    }

    /// Sky coordinate (lon, lat) of the reference pixel, degrees.
    pub fn crval(&self) -> [f64; 2] {
        self.crval
    }

    /// 0-based pixel → sky in this solution's frame. `None` outside the projection's domain.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyCoord> {
        let lonlat = self.solution.unproj(&ImgXY::new(x + 1.0, y + 1.0))?;
        let (lon, lat) = (lonlat.lon().to_degrees(), lonlat.lat().to_degrees());
        if !(lon.is_finite() && lat.is_finite()) {
            return None;
        }
        Some(SkyCoord::new(lon, lat, CelestialFrame::Equatorial).to_frame(self.frame))
    }

    /// Sky → 0-based pixel, whatever frame `coord` is in.
    /// `None` where the projection is undefined.
    pub fn world_to_pixel(&self, coord: &SkyCoord) -> Option<(f64, f64)> {
        let icrs = coord.to_frame(CelestialFrame::Equatorial);
        let xy = self
            .solution
            .proj(&LonLat::new(icrs.lon.to_radians(), icrs.lat.to_radians()))?;
        let (x, y) = (xy.x() - 1.0, xy.y() - 1.0);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Angular size of one pixel along each pixel axis at the reference pixel, degrees.
    ///
    /// Measured on the sky across the reference pixel, so it holds for any of
    /// the CD, PC or CROTA forms the header used.
    pub fn pixel_scales(&self) -> (f64, f64) {
        let (x0, y0) = (self.crpix[0] - 1.0, self.crpix[1] - 1.0);
        let span = |dx: f64, dy: f64| {
            let a = self.pixel_to_world(x0 - 0.5 * dx, y0 - 0.5 * dy);
            let b = self.pixel_to_world(x0 + 0.5 * dx, y0 + 0.5 * dy);
            match (a, b) {
                (Some(a), Some(b)) => a.separation(&b),
                _ => f64::NAN,
            }
        };
        (span(1.0, 0.0), span(0.0, 1.0))
    }

    /// Header cards describing this solution.
    pub fn to_cards(&self) -> Vec<Card> {
        self.cards.clone()
    }
}

impl PartialEq for Wcs {
    fn eq(&self, other: &Self) -> bool {
        self.frame == other.frame && self.projection == other.projection && self.cards == other.cards
    }
}

impl fmt::Debug for Wcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wcs")
            .field("frame", &self.frame)
            .field("projection", &self.projection)
            .field("crpix", &self.crpix)
            .field("crval", &self.crval)
            .finish_non_exhaustive()
    }
}

/// Hand the keyword set to the `wcs` crate, keyed by FITS keyword.
fn solve(cards: &[Card], size: [i64; 2]) -> Result<WCS> {
    let mut params = Map::new();
    params.insert("NAXIS".into(), Value::from(2i64));
    params.insert("NAXIS1".into(), Value::from(size[0]));
    params.insert("NAXIS2".into(), Value::from(size[1]));
    for card in cards {
        if let Some(value) = card.value.as_ref().and_then(json_value) {
            params.insert(card.keyword.clone(), value);
        }
    }

    let params: WCSParams = serde_json::from_value(Value::Object(params))
        .map_err(|e| MosaicError::Wcs(format!("Unusable WCS keywords: {e}")))?;
    WCS::new(&params).map_err(|e| MosaicError::Wcs(e.to_string()))
}

fn json_value(value: &HeaderValue) -> Option<Value> {
    match value {
        HeaderValue::Logical(b) => Some(Value::from(*b)),
        HeaderValue::Integer(i) => Some(Value::from(*i)),
        HeaderValue::Real(r) => serde_json::Number::from_f64(*r).map(Value::Number),
        HeaderValue::Text(s) => Some(Value::from(s.as_str())),
    }
}

/// Projection code from a CTYPE such as `RA---TAN` or `RA---TAN-SIP`.
fn projection_code(ctype: &str) -> Result<&str> {
    ctype
        .get(5..8)
        .ok_or_else(|| MosaicError::Wcs(format!("CTYPE '{ctype}' carries no projection code")))
}

/// `RA---TAN-SIP` → `RA---TAN`.
fn linear_ctype(ctype: &str) -> &str {
    ctype.get(..8).unwrap_or(ctype)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cards: &[Card]) -> FitsHeader {
        let mut h = FitsHeader::new();
        for c in cards {
            h.push(c.clone());
        }
        h
    }

    fn base_cards() -> Vec<Card> {
        vec![
            Card::new("NAXIS", 2i64),
            Card::new("NAXIS1", 100i64),
            Card::new("NAXIS2", 100i64),
            Card::new("CTYPE1", "RA---TAN"),
            Card::new("CTYPE2", "DEC--TAN"),
            Card::new("CRPIX1", 50.0),
            Card::new("CRPIX2", 50.0),
            Card::new("CRVAL1", 10.0),
            Card::new("CRVAL2", 20.0),
            Card::new("RADESYS", "ICRS"),
        ]
    }

    #[test]
    fn crota_matches_cd_form() {
        let rho = 30f64.to_radians();
        let mut a = base_cards();
        a.extend([
            Card::new("CDELT1", -0.001),
            Card::new("CDELT2", 0.001),
            Card::new("CROTA2", 30.0),
        ]);
        let mut b = base_cards();
        b.extend([
            Card::new("CD1_1", -0.001 * rho.cos()),
            Card::new("CD1_2", -0.001 * rho.sin()),
            Card::new("CD2_1", -0.001 * rho.sin()),
            Card::new("CD2_2", 0.001 * rho.cos()),
        ]);
        let crota = Wcs::from_header(&header(&a)).unwrap();
        let cd = Wcs::from_header(&header(&b)).unwrap();

        for &(x, y) in &[(0.0, 0.0), (99.0, 0.0), (12.5, 80.25), (99.0, 99.0)] {
            let p = crota.pixel_to_world(x, y).unwrap();
            let q = cd.pixel_to_world(x, y).unwrap();
            assert!(p.separation(&q) < 1e-10, "({x}, {y}): {p:?} vs {q:?}");
        }
    }

    #[test]
    fn rejects_mismatched_axes() {
        let h = header(&[
            Card::new("CTYPE1", "RA---TAN"),
            Card::new("CTYPE2", "GLAT-TAN"),
            Card::new("CRPIX1", 1.0),
            Card::new("CRPIX2", 1.0),
            Card::new("CRVAL1", 0.0),
            Card::new("CRVAL2", 0.0),
        ]);
        assert!(matches!(Wcs::from_header(&h), Err(MosaicError::Wcs(_))));
    }

    #[test]
    fn distortion_suffix_is_dropped_from_solution() {
        let mut cards = base_cards();
        cards[3] = Card::new("CTYPE1", "RA---TAN-SIP");
        cards[4] = Card::new("CTYPE2", "DEC--TAN-SIP");
        cards.extend([Card::new("CDELT1", -0.001), Card::new("CDELT2", 0.001)]);
        let wcs = Wcs::from_header(&header(&cards)).unwrap();
        let out = wcs.to_cards();
        let ctype1 = out.iter().find(|c| c.keyword == "CTYPE1").unwrap();
        assert_eq!(ctype1.value, Some(HeaderValue::Text("RA---TAN".into())));
    }

    #[test]
    fn projection_code_with_distortion_suffix() {
        assert_eq!(projection_code("RA---TAN-SIP").unwrap(), "TAN");
        assert!(projection_code("RA").is_err());
    }

    #[test]
    fn reference_pixel_maps_to_crval() {
        let wcs = Wcs::new(
            CelestialFrame::Galactic,
            Projection::Sin,
            [8.0, 4.0],
            [120.0, -30.0],
            [[-1e-3, 0.0], [0.0, 1e-3]],
        )
        .unwrap();
        let c = wcs.pixel_to_world(7.0, 3.0).unwrap();
        assert_eq!(c.frame, CelestialFrame::Galactic);
        assert!((c.lon - 120.0).abs() < 1e-9, "lon = {}", c.lon);
        assert!((c.lat + 30.0).abs() < 1e-9, "lat = {}", c.lat);
    }
}
