use crate::core::camera::EoColumnOrder;
use crate::types::{OrthoError, OrthoResult, RawAttitude, RawEo};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Columns per EO line: image, lon, lat, altitude and three attitude angles
const EO_COLUMNS: usize = 7;

/// One EO reading from an EO text file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EoRecord {
    pub image: String,
    pub raw: RawEo,
}

/// Reader for tab or whitespace separated EO files
/// (`image lon lat alt a1 a2 a3`, attitude in degrees)
pub struct EoFileReader;

impl EoFileReader {
    pub fn read<P: AsRef<Path>>(path: P, order: EoColumnOrder) -> OrthoResult<Vec<EoRecord>> {
        log::info!("Reading EO file: {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text, order)
    }

    pub fn parse(text: &str, order: EoColumnOrder) -> OrthoResult<Vec<EoRecord>> {
        let mut records = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != EO_COLUMNS {
                return Err(OrthoError::Parse {
                    line: line_no,
                    message: format!("expected {} columns, found {}", EO_COLUMNS, fields.len()),
                });
            }

            let mut values = [0.0f64; EO_COLUMNS - 1];
            for (value, field) in values.iter_mut().zip(&fields[1..]) {
                *value = parse_number(field, line_no)?;
            }

            let attitude: RawAttitude = order.attitude([values[3], values[4], values[5]]);
            records.push(EoRecord {
                image: fields[0].to_string(),
                raw: RawEo {
                    lon: values[0],
                    lat: values[1],
                    altitude: values[2],
                    attitude,
                },
            });
        }

        log::debug!("Parsed {} EO record(s)", records.len());
        Ok(records)
    }
}

fn parse_number(field: &str, line: usize) -> OrthoResult<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(OrthoError::Parse {
            line,
            message: format!("invalid number '{}'", field),
        }),
    }
}
