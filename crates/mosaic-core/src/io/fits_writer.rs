use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use ndarray::{ArrayBase, Data, Dimension};
use tracing::debug;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{MosaicError, Result};
use crate::io::fits::Card;

/// Keywords the writer owns; caller-supplied cards with these names are skipped.
const STRUCTURAL_KEYWORDS: &[&str] = &["SIMPLE", "BITPIX", "NAXIS", "EXTEND", "END", "BSCALE", "BZERO"];

/// Write `data` as the primary HDU of a new FITS file (BITPIX = -32).
///
/// The last array axis becomes NAXIS1, so a `(band, row, col)` cube is written
/// as NAXIS1 = cols, NAXIS2 = rows, NAXIS3 = bands. Any existing file is replaced.
pub fn write_fits<S, D>(path: &Path, data: &ArrayBase<S, D>, cards: &[Card]) -> Result<()>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if data.ndim() == 0 {
        return Err(MosaicError::InvalidFits(
            "Refusing to write a zero-dimensional array".into(),
        ));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_header(&mut writer, data.shape(), cards)?;
    write_data(&mut writer, data)?;
    writer.flush()?;

    debug!(path = %path.display(), shape = ?data.shape(), "Wrote FITS");
    Ok(())
}

fn write_header(w: &mut impl Write, shape: &[usize], cards: &[Card]) -> Result<()> {
    let mut records: Vec<[u8; FITS_CARD_SIZE]> = Vec::new();
    records.push(Card::new("SIMPLE", true).with_comment("conforms to FITS standard").to_record());
    records.push(Card::new("BITPIX", -32i64).with_comment("IEEE single precision").to_record());
    records.push(Card::new("NAXIS", shape.len()).to_record());
    for (i, &len) in shape.iter().rev().enumerate() {
        records.push(Card::new(&format!("NAXIS{}", i + 1), len).to_record());
    }
    records.push(Card::new("EXTEND", true).to_record());

    for card in cards {
        let reserved = STRUCTURAL_KEYWORDS.contains(&card.keyword.as_str())
            || is_naxis_keyword(&card.keyword);
        if !reserved {
            records.push(card.to_record());
        }
    }

    let mut end = [b' '; FITS_CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    records.push(end);

    let mut written = 0;
    for record in &records {
        w.write_all(record)?;
        written += FITS_CARD_SIZE;
    }
    pad(w, written, b' ')
}

fn write_data<S, D>(w: &mut impl Write, data: &ArrayBase<S, D>) -> Result<()>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    // Logical (row-major) iteration order matches FITS axis order regardless of memory layout.
    for &value in data.iter() {
        w.write_f32::<BigEndian>(value)?;
    }
    pad(w, data.len() * std::mem::size_of::<f32>(), 0)
}

fn pad(w: &mut impl Write, written: usize, fill: u8) -> Result<()> {
    let remainder = written % FITS_BLOCK_SIZE;
    if remainder != 0 {
        let padding = vec![fill; FITS_BLOCK_SIZE - remainder];
        w.write_all(&padding)?;
    }
    Ok(())
}

fn is_naxis_keyword(keyword: &str) -> bool {
    keyword
        .strip_prefix("NAXIS")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}
