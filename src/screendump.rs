//! Converters from the raw ScopeMeter screendump stream to something a
//! host can use: an Encapsulated-PostScript-style vector file or an X11
//! bitmap (XBM) source file.

use std::fmt::Write;
use std::path::Path;

use thiserror::Error;

pub const SCREEN_WIDTH: usize = 480;
pub const SCREEN_HEIGHT: usize = 480;

/// The device prefixes its native vector stream with its resolution.
const VECTOR_MARKER: &[u8] = b"480 ";

/// Start of the embedded `image` keyword in the native dump.
const BITMAP_MARKER: &[u8] = b"imag";

/// Distance from the bitmap marker start to the first hex digit.
const BITMAP_PAYLOAD_OFFSET: usize = 7;

/// Trailing device-side "show page" command, not pixel data.
const BITMAP_TRAILER_LEN: usize = 11;

/// One bit per pixel.
const BITMAP_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 8;

const BYTES_PER_LINE: usize = 10;

const POSTSCRIPT_HEADER: &str = "%!PS-Adobe-3.0\n\
%%Creator: scopectrl\n\
%%BoundingBox: 72 72 552 552\n\
\n\
72 72 translate\n\
480 480 scale\n";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DumpError {
    #[error("Marker {:?} not found in screendump data", _0)]
    MarkerNotFound(&'static str),
    #[error("Screendump data is truncated")]
    Truncated,
}

/// Reframe the device's native vector stream as a PostScript file: fixed
/// preamble, then everything from the resolution marker onwards, verbatim.
pub fn to_postscript(raw: &[u8]) -> Result<Vec<u8>, DumpError> {
    let start = find_marker(raw, VECTOR_MARKER).ok_or(DumpError::MarkerNotFound("480 "))?;
    let mut out = Vec::with_capacity(POSTSCRIPT_HEADER.len() + raw.len() - start);
    out.extend_from_slice(POSTSCRIPT_HEADER.as_bytes());
    out.extend_from_slice(&raw[start..]);
    Ok(out)
}

/// Extract the embedded 480x480 1-bit image and emit it as an X11 bitmap
/// source file. `name` becomes the prefix of the generated C symbols.
pub fn to_xbm(raw: &[u8], name: &str) -> Result<Vec<u8>, DumpError> {
    let marker = find_marker(raw, BITMAP_MARKER).ok_or(DumpError::MarkerNotFound("imag"))?;
    let payload = raw
        .get(marker + BITMAP_PAYLOAD_OFFSET..)
        .ok_or(DumpError::Truncated)?;
    let pixels = payload
        .len()
        .checked_sub(BITMAP_TRAILER_LEN)
        .map(|n| &payload[..n])
        .ok_or(DumpError::Truncated)?;

    let mut out = String::new();
    let _ = write!(
        out,
        "#define {name}_width {SCREEN_WIDTH}\n#define {name}_height {SCREEN_HEIGHT}\nstatic char {name}_bits[] = {{"
    );

    let mut emitted = 0;
    let mut i = 0;
    // The device breaks its hex stream with CR/LF pairs; those are noise.
    // Each remaining pair is one output byte, low digit first.
    while i + 1 < pixels.len() && emitted < BITMAP_BYTES {
        let (c1, c2) = (pixels[i], pixels[i + 1]);
        i += 2;
        if c1 == b'\r' && c2 == b'\n' {
            continue;
        }
        if emitted > 0 {
            out.push_str(", ");
        }
        if emitted % BYTES_PER_LINE == 0 {
            out.push_str("\n\t");
        }
        out.push_str("0x");
        out.push(remap(c2) as char);
        out.push(remap(c1) as char);
        emitted += 1;
    }
    out.push_str("};\n");
    Ok(out.into_bytes())
}

/// Take a single 4 bit hex digit, rotate left 2 bits and invert. This is
/// fixed by the instrument's internal bit ordering for bitmap dumps.
/// Anything outside 0-9/A-F passes through unchanged.
pub fn remap(digit: u8) -> u8 {
    match digit.to_ascii_uppercase() {
        b'0' => b'F',
        b'1' => b'B',
        b'2' => b'7',
        b'3' => b'3',
        b'4' => b'E',
        b'5' => b'A',
        b'6' => b'6',
        b'7' => b'2',
        b'8' => b'D',
        b'9' => b'9',
        b'A' => b'5',
        b'B' => b'1',
        b'C' => b'C',
        b'D' => b'8',
        b'E' => b'4',
        b'F' => b'0',
        other => other,
    }
}

/// Derive a C identifier for the XBM symbols from the output filename.
pub fn symbol_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("screen");
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.chars().next().map_or(false, |c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

// First match wins; the dump carries the marker once.
fn find_marker(haystack: &[u8], marker: &[u8]) -> Option<usize> {
    haystack.windows(marker.len()).position(|w| w == marker)
}
