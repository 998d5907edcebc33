//! CSV export of persisted records, newest first.

use serde::Serialize;
use std::io::Write;

use super::{RecordStore, StorageError, StoredRecord};
use crate::types::{self, RiskVerdict};

/// Column order of an exported file.
pub const CSV_HEADER: [&str; 13] = [
    "id",
    "timestamp",
    "temp",
    "ph",
    "do",
    "turbidity",
    "pred_temp",
    "pred_ph",
    "pred_do",
    "pred_turb",
    "sensor_risk",
    "pred_risk",
    "status",
];

#[derive(Serialize)]
struct CsvRow {
    id: u64,
    timestamp: String,
    temp: f64,
    ph: f64,
    #[serde(rename = "do")]
    dissolved_oxygen: f64,
    turbidity: f64,
    pred_temp: Option<f64>,
    pred_ph: Option<f64>,
    pred_do: Option<f64>,
    pred_turb: Option<f64>,
    sensor_risk: RiskVerdict,
    pred_risk: Option<RiskVerdict>,
    status: RiskVerdict,
}

impl From<&StoredRecord> for CsvRow {
    fn from(row: &StoredRecord) -> Self {
        let r = &row.record;
        Self {
            id: row.id,
            timestamp: types::format_timestamp(&r.timestamp),
            temp: r.temp,
            ph: r.ph,
            dissolved_oxygen: r.dissolved_oxygen,
            turbidity: r.turbidity,
            pred_temp: r.pred_temp,
            pred_ph: r.pred_ph,
            pred_do: r.pred_do,
            pred_turb: r.pred_turb,
            sensor_risk: r.sensor_risk,
            pred_risk: r.pred_risk,
            status: r.status,
        }
    }
}

/// Write up to `limit` records (all when `None`), newest first.
/// Returns the number of rows written.
pub fn export_csv<W: Write>(
    store: &dyn RecordStore,
    writer: W,
    limit: Option<usize>,
) -> Result<usize, StorageError> {
    let records = store.latest(limit.unwrap_or(usize::MAX))?;
    let mut csv = csv::Writer::from_writer(writer);
    for row in &records {
        csv.serialize(CsvRow::from(row))?;
    }
    if records.is_empty() {
        csv.write_record(CSV_HEADER)?;
    }
    csv.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryRecordStore;
    use crate::types::{parse_timestamp, ChannelValues, EnrichedRecord, RawReading};

    #[test]
    fn exports_header_and_nullable_forecast() {
        let store = InMemoryRecordStore::new();
        let reading = RawReading {
            timestamp: parse_timestamp("2025-01-01 00:00:00").unwrap(),
            temperature: 29.0,
            ph: 7.2,
            dissolved_oxygen: 6.1,
            turbidity: 12.0,
        };
        store
            .insert(&EnrichedRecord::new(
                &reading,
                None,
                RiskVerdict::Safe,
                None,
                RiskVerdict::Safe,
            ))
            .unwrap();
        let forecast = ChannelValues {
            temperature: 29.5,
            ph: 7.1,
            dissolved_oxygen: 1.5,
            turbidity: 13.0,
        };
        let later = RawReading {
            timestamp: parse_timestamp("2025-01-01 01:00:00").unwrap(),
            ..reading
        };
        store
            .insert(&EnrichedRecord::new(
                &later,
                Some(&forecast),
                RiskVerdict::Safe,
                Some(RiskVerdict::Danger),
                RiskVerdict::Danger,
            ))
            .unwrap();

        let mut out = Vec::new();
        let written = export_csv(&store, &mut out, None).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "2,2025-01-01 01:00:00,29.0,7.2,6.1,12.0,29.5,7.1,1.5,13.0,Safe,Danger,Danger"
        );
        assert_eq!(lines[2], "1,2025-01-01 00:00:00,29.0,7.2,6.1,12.0,,,,,Safe,,Safe");
    }

    #[test]
    fn empty_store_still_writes_header() {
        let store = InMemoryRecordStore::new();
        let mut out = Vec::new();
        assert_eq!(export_csv(&store, &mut out, Some(10)).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap().trim(), CSV_HEADER.join(","));
    }
}
