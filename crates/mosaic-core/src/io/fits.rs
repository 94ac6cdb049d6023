use std::path::Path;
use std::sync::Mutex;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::ImageType;
use fitsio::FitsFile;
use ndarray::{ArrayD, IxDyn};
use tracing::trace;

use crate::consts::FITS_CARD_SIZE;
use crate::error::{MosaicError, Result};

/// Keywords read from an input header, grouped by the type they are read as.
const INTEGER_KEYWORDS: &[&str] = &[
    "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "WCSAXES", "BLANK", "NCOMBINE",
];
const REAL_KEYWORDS: &[&str] = &[
    "BSCALE", "BZERO", "CRPIX1", "CRPIX2", "CRVAL1", "CRVAL2", "CDELT1", "CDELT2", "CROTA2",
    "CD1_1", "CD1_2", "CD2_1", "CD2_2", "PC1_1", "PC1_2", "PC2_1", "PC2_2", "LONPOLE",
    "LATPOLE", "EQUINOX", "EXPTIME",
];
const TEXT_KEYWORDS: &[&str] = &[
    "CTYPE1", "CTYPE2", "CUNIT1", "CUNIT2", "RADESYS", "OBJECT", "BUNIT", "CHANNEL",
];

/// cfitsio keeps a process-wide file table; opens and reads go through this lock.
static CFITSIO: Mutex<()> = Mutex::new(());

/// Typed value of a header card.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        Self::Logical(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<usize> for HeaderValue {
    fn from(v: usize) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One 80-character header record.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<HeaderValue>,
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: impl Into<HeaderValue>) -> Self {
        Self {
            keyword: keyword.to_uppercase(),
            value: Some(value.into()),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Commentary card (`COMMENT`, `HISTORY`) with free text.
    pub fn commentary(keyword: &str, text: &str) -> Self {
        Self {
            keyword: keyword.to_uppercase(),
            value: None,
            comment: Some(text.to_string()),
        }
    }

    /// Render as a fixed-width 80-byte record.
    pub fn to_record(&self) -> [u8; FITS_CARD_SIZE] {
        let mut text = format!("{:<8}", self.keyword);
        match &self.value {
            Some(value) => {
                text.push_str("= ");
                text.push_str(&format_value(value));
                if let Some(ref c) = self.comment {
                    text.push_str(" / ");
                    text.push_str(c);
                }
            }
            None => {
                if let Some(ref c) = self.comment {
                    text.push_str(c);
                }
            }
        }
        let mut record = [b' '; FITS_CARD_SIZE];
        for (dst, src) in record.iter_mut().zip(text.bytes().filter(|b| b.is_ascii())) {
            *dst = src;
        }
        record
    }
}

fn format_value(value: &HeaderValue) -> String {
    match value {
        HeaderValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        HeaderValue::Integer(i) => format!("{:>20}", i),
        HeaderValue::Real(r) => {
            let mut s = format!("{:E}", r);
            if !s.contains('.') {
                s = s.replacen('E', ".0E", 1);
            }
            format!("{:>20}", s)
        }
        HeaderValue::Text(s) => {
            let escaped = s.replace('\'', "''");
            format!("'{:<8}'", escaped)
        }
    }
}

/// Ordered list of header cards from one HDU.
#[derive(Clone, Debug, Default)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// First valued card with this keyword.
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .filter(|c| c.keyword == keyword)
            .find_map(|c| c.value.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn require_i64(&self, keyword: &str) -> Result<i64> {
        self.get_i64(keyword)
            .ok_or_else(|| MosaicError::MissingKeyword(keyword.to_string()))
    }

    pub fn require_f64(&self, keyword: &str) -> Result<f64> {
        self.get_f64(keyword)
            .ok_or_else(|| MosaicError::MissingKeyword(keyword.to_string()))
    }

    pub fn require_str(&self, keyword: &str) -> Result<&str> {
        self.get_str(keyword)
            .ok_or_else(|| MosaicError::MissingKeyword(keyword.to_string()))
    }
}

/// Primary HDU of a FITS file.
#[derive(Clone, Debug)]
pub struct FitsImage {
    pub header: FitsHeader,
    /// Pixel data with axes in row-major order: (NAXISn, ..., NAXIS2, NAXIS1).
    pub data: ArrayD<f32>,
}

/// Read the primary HDU as `f32`, with BSCALE/BZERO applied and BLANK pixels as NaN.
pub fn read_fits(path: &Path) -> Result<FitsImage> {
    let file_len = std::fs::metadata(path)?.len();
    let _guard = CFITSIO.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut fptr = FitsFile::open(path).map_err(fits_error)?;
    let hdu = fptr.primary_hdu().map_err(fits_error)?;
    let (shape, value_size) = match &hdu.info {
        HduInfo::ImageInfo { shape, image_type } => (shape.clone(), bytes_per_value(image_type)),
        HduInfo::TableInfo { .. } | HduInfo::AnyInfo => {
            return Err(MosaicError::InvalidFits(
                "Primary HDU does not hold an image".into(),
            ))
        }
    };

    let count = pixel_count(&shape)?;
    let data_len = count
        .checked_mul(value_size)
        .ok_or_else(|| MosaicError::InvalidFits(format!("Data size of {shape:?} overflows")))?;
    if data_len as u64 > file_len {
        return Err(MosaicError::InvalidFits(format!(
            "File truncated: data needs {data_len} bytes, file holds {file_len}"
        )));
    }

    let header = read_header(&hdu, &mut fptr);
    let mut values: Vec<f32> = if count == 0 {
        Vec::new()
    } else {
        hdu.read_image(&mut fptr).map_err(fits_error)?
    };
    if values.len() != count {
        return Err(MosaicError::InvalidFits(format!(
            "Expected {count} pixels, read {}",
            values.len()
        )));
    }
    if let Some(blank) = scaled_blank(&header) {
        for v in values.iter_mut().filter(|v| **v == blank) {
            *v = f32::NAN;
        }
    }
    trace!(path = %path.display(), ?shape, value_size, "Read FITS");

    // cfitsio already reports the slowest axis first, matching ndarray's row-major order.
    let mut dims = shape;
    while dims.len() > 3 && dims[0] == 1 {
        dims.remove(0);
    }
    let data = if dims.is_empty() {
        ArrayD::zeros(IxDyn(&[0]))
    } else {
        ArrayD::from_shape_vec(IxDyn(&dims), values)
            .map_err(|e| MosaicError::InvalidFits(format!("Bad data shape: {e}")))?
    };

    Ok(FitsImage { header, data })
}

fn fits_error(e: fitsio::errors::Error) -> MosaicError {
    MosaicError::InvalidFits(e.to_string())
}

fn read_header(hdu: &FitsHdu, fptr: &mut FitsFile) -> FitsHeader {
    let mut header = FitsHeader::new();
    for &key in INTEGER_KEYWORDS {
        if let Ok(v) = hdu.read_key::<i64>(fptr, key) {
            header.push(Card::new(key, v));
        }
    }
    for &key in REAL_KEYWORDS {
        if let Ok(v) = hdu.read_key::<f64>(fptr, key) {
            header.push(Card::new(key, v));
        }
    }
    for &key in TEXT_KEYWORDS {
        if let Ok(v) = hdu.read_key::<String>(fptr, key) {
            header.push(Card::new(key, v.trim_end()));
        }
    }
    header
}

/// Number of pixels in an image of this shape, refusing sizes that do not fit in memory.
fn pixel_count(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() {
        return Ok(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &len| acc.checked_mul(len))
        .ok_or_else(|| MosaicError::InvalidFits(format!("Pixel count of {shape:?} overflows")))
}

fn bytes_per_value(image_type: &ImageType) -> usize {
    match image_type {
        ImageType::UnsignedByte | ImageType::Byte => 1,
        ImageType::Short | ImageType::UnsignedShort => 2,
        ImageType::Long | ImageType::UnsignedLong | ImageType::Float => 4,
        ImageType::LongLong | ImageType::Double => 8,
    }
}

/// Value a BLANK integer pixel takes once cfitsio has scaled it.
fn scaled_blank(header: &FitsHeader) -> Option<f32> {
    if header.get_i64("BITPIX")? < 0 {
        return None;
    }
    let blank = header.get_i64("BLANK")? as f64;
    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);
    Some((blank * bscale + bzero) as f32)
}
