//! JSON output with plain decimal numbers.
//!
//! `serde_json` prints floats with their shortest round-trip representation,
//! which for `f32` data produces long tails like `0.10000000149011612`. The
//! game files are hand-inspected, so floats are rounded to four decimals and
//! printed without exponents.

use crate::error::Result;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;

/// Decimal places kept when writing floats.
const DECIMALS: i32 = 4;

/// Pretty formatter that writes floats as rounded plain decimals.
pub struct DecimalFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> DecimalFormatter<'a> {
    pub fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Default for DecimalFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Round to [`DECIMALS`] places and print without an exponent.
pub fn format_decimal(value: f64) -> String {
    let factor = 10f64.powi(DECIMALS);
    let rounded = (value * factor).round() / factor;
    // Also folds -0 into 0.
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{}", rounded)
}

impl Formatter for DecimalFormatter<'_> {
    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        self.write_f64(writer, value as f64)
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(format_decimal(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Serialize `value` as pretty JSON with plain decimal floats.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, DecimalFormatter::new());
    value.serialize(&mut serializer)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize `value` as a pretty JSON string with plain decimal floats.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = to_json_bytes(value)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
