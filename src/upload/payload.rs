//! Collector JSON body, streamed record by record through `core::fmt::Write`.

use core::fmt::{self, Write};

use crate::types::NetworkRecord;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PayloadHeader<'a> {
    pub badge_id: &'a str,
    pub firmware_version: &'a str,
    pub timestamp_ms: u64,
    pub battery_voltage: Option<f32>,
}

pub fn write_payload<W: Write>(
    out: &mut W,
    header: &PayloadHeader<'_>,
    records: &[NetworkRecord],
) -> fmt::Result {
    write_head(out, header)?;
    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            out.write_char(',')?;
        }
        write_record(out, record)?;
    }
    out.write_str("]}")
}

/// Exact byte length of [`write_payload`] output, for `Content-Length`.
pub fn payload_len(header: &PayloadHeader<'_>, records: &[NetworkRecord]) -> usize {
    let mut counter = CountingWriter::default();
    // Counting never fails.
    let _ = write_payload(&mut counter, header, records);
    counter.len
}

pub fn write_head<W: Write>(out: &mut W, header: &PayloadHeader<'_>) -> fmt::Result {
    out.write_str("{\"badge_id\":")?;
    write_json_str(out, header.badge_id)?;
    out.write_str(",\"firmware_version\":")?;
    write_json_str(out, header.firmware_version)?;
    write!(out, ",\"timestamp\":{}", header.timestamp_ms)?;
    if let Some(volts) = header.battery_voltage {
        write!(out, ",\"battery_voltage\":{:.2}", volts)?;
    }
    out.write_str(",\"networks\":[")
}

pub fn write_record<W: Write>(out: &mut W, record: &NetworkRecord) -> fmt::Result {
    out.write_str("{\"ssid\":\"")?;
    write!(JsonEscaper(&mut *out), "{}", record.ssid)?;
    write!(
        out,
        "\",\"bssid\":\"{}\",\"channel\":{},\"rssi\":{},\"encryption\":\"{}\",\
         \"first_seen\":{},\"last_seen\":{},\"frame_count\":{}}}",
        record.bssid,
        record.channel,
        record.signal_strength,
        record.encryption.label(),
        record.first_seen_ms,
        record.last_seen_ms,
        record.frame_count,
    )
}

fn write_json_str<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    out.write_char('"')?;
    JsonEscaper(&mut *out).write_str(value)?;
    out.write_char('"')
}

struct JsonEscaper<'w, W: Write>(&'w mut W);

impl<W: Write> Write for JsonEscaper<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            match ch {
                '"' => self.0.write_str("\\\"")?,
                '\\' => self.0.write_str("\\\\")?,
                '\n' => self.0.write_str("\\n")?,
                '\r' => self.0.write_str("\\r")?,
                '\t' => self.0.write_str("\\t")?,
                c if (c as u32) < 0x20 => write!(self.0, "\\u{:04x}", c as u32)?,
                c => self.0.write_char(c)?,
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingWriter {
    pub len: usize,
}

impl Write for CountingWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.len += s.len();
        Ok(())
    }
}
