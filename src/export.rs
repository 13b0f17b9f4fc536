//! Serialization of stored records to the three download formats.
//!
//! JSON is the only lossless format: it carries the full record list
//! including the nested weather payload. CSV wraps free-text fields in
//! double quotes without escaping embedded quotes, and XML emits scalar
//! fields verbatim (only the opaque payload gets CDATA protection). Both are
//! known limitations of the download format, kept as-is rather than patched
//! with escaping the consumers do not expect.

use std::str::FromStr;

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::Result;
use crate::error::WeatherVaultError;
use crate::models::WeatherRecord;

/// Render format for CSV/XML dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Render format for CSV/XML timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CSV_HEADERS: [&str; 12] = [
    "ID",
    "Location",
    "Latitude",
    "Longitude",
    "Start Date",
    "End Date",
    "Temperature Min",
    "Temperature Max",
    "Description",
    "Weather Data",
    "Created At",
    "Updated At",
];

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Xml];

    /// MIME type declared alongside the serialized content
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xml => "application/xml",
        }
    }

    /// Format token as used in requests and file extensions
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = WeatherVaultError;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xml" => Ok(ExportFormat::Xml),
            other => Err(WeatherVaultError::unsupported_format(other)),
        }
    }
}

/// Serialized export output with its declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub content: String,
    pub mime_type: &'static str,
}

/// Serialize a batch of records into the requested format.
///
/// Records are emitted as-is, in input order; an empty batch produces a
/// valid-but-empty document for every format.
pub fn export_records(records: &[WeatherRecord], format: ExportFormat) -> Result<Export> {
    if records.is_empty() {
        debug!("Exporting empty record list as {}", format.as_str());
    }

    let content = match format {
        ExportFormat::Json => serde_json::to_string_pretty(records)?,
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Xml => to_xml(records)?,
    };

    Ok(Export {
        content,
        mime_type: format.mime_type(),
    })
}

fn to_csv(records: &[WeatherRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for record in records {
        // Free-text fields are quote-wrapped only; embedded quotes pass
        // through unchanged.
        let row = [
            record.id.to_string(),
            format!("\"{}\"", record.location),
            record.latitude.to_string(),
            record.longitude.to_string(),
            record.start_date.format(DATE_FORMAT).to_string(),
            record.end_date.format(DATE_FORMAT).to_string(),
            record
                .temperature_min
                .map(|t| t.to_string())
                .unwrap_or_default(),
            record
                .temperature_max
                .map(|t| t.to_string())
                .unwrap_or_default(),
            format!("\"{}\"", record.description.as_deref().unwrap_or_default()),
            format!("\"{}\"", record.weather_data.as_deref().unwrap_or_default()),
            record.created_at.format(TIMESTAMP_FORMAT).to_string(),
            record.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ];
        lines.push(row.join(","));
    }

    lines.join("\n")
}

fn to_xml(records: &[WeatherRecord]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(&mut writer, Event::Start(BytesStart::new("weather_records")))?;

    for record in records {
        emit(&mut writer, Event::Start(BytesStart::new("record")))?;

        write_scalar(&mut writer, "id", &record.id.to_string())?;
        write_scalar(&mut writer, "location", &record.location)?;
        write_scalar(&mut writer, "latitude", &record.latitude.to_string())?;
        write_scalar(&mut writer, "longitude", &record.longitude.to_string())?;
        write_scalar(
            &mut writer,
            "start_date",
            &record.start_date.format(DATE_FORMAT).to_string(),
        )?;
        write_scalar(
            &mut writer,
            "end_date",
            &record.end_date.format(DATE_FORMAT).to_string(),
        )?;
        write_scalar(
            &mut writer,
            "temperature_min",
            &record
                .temperature_min
                .map(|t| t.to_string())
                .unwrap_or_default(),
        )?;
        write_scalar(
            &mut writer,
            "temperature_max",
            &record
                .temperature_max
                .map(|t| t.to_string())
                .unwrap_or_default(),
        )?;
        write_scalar(
            &mut writer,
            "description",
            record.description.as_deref().unwrap_or_default(),
        )?;

        // opaque payload: CDATA when present, empty element otherwise
        emit(&mut writer, Event::Start(BytesStart::new("weather_data")))?;
        if let Some(payload) = &record.weather_data {
            emit(&mut writer, Event::CData(BytesCData::new(payload.as_str())))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("weather_data")))?;

        write_scalar(
            &mut writer,
            "created_at",
            &record.created_at.format(TIMESTAMP_FORMAT).to_string(),
        )?;
        write_scalar(
            &mut writer,
            "updated_at",
            &record.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        )?;

        emit(&mut writer, Event::End(BytesEnd::new("record")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("weather_records")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| WeatherVaultError::general(format!("Export produced invalid UTF-8: {e}")))
}

fn write_scalar<W: std::io::Write>(writer: &mut Writer<W>, tag: &str, value: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(tag)))?;
    // scalar fields are emitted verbatim, no entity escaping
    emit(writer, Event::Text(BytesText::from_escaped(value)))?;
    emit(writer, Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| WeatherVaultError::general(format!("Failed to write XML event: {e}")))
}
