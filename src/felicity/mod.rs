//! Local TCP protocol spoken by Felicity battery and inverter monitors.
//!
//! A fetch is one short-lived connection: send [`client::COMMAND`], collect
//! the reply, repair it with [`normalize`], then pick fields out of it with
//! the recognisers in [`recognizer`].

pub mod client;
pub mod diagnostics;
pub mod normalize;
pub mod recognizer;
pub mod record;

use crate::error::Error;
use diagnostics::DiagnosticSink;
use recognizer::Shape;
use record::TelemetryRecord;

/// Battery firmware packs `Batt`/`Batsoc` into one row of three; inverters
/// send the same readings one value per row.
const BATTERY_ROW: [Shape; 2] = [Shape::exact(1, 3), Shape::exact(3, 1)];

/// Normalise raw response text and extract a record from it.
pub fn parse(text: &str, sink: &dyn DiagnosticSink) -> Result<TelemetryRecord, Error> {
    let normalized = normalize::normalize(text, sink);
    extract(&normalized)
}

/// Run every recogniser over already-normalised text.
///
/// Optional fields that cannot be read come back as `None`. The call only
/// fails when neither `Batsoc` nor `Batt` could be read.
pub fn extract(text: &str) -> Result<TelemetryRecord, Error> {
    use recognizer::*;

    let record = TelemetryRecord {
        comm_ver: int_field(text, "CommVer"),
        device_type: int_field(text, "Type"),
        sub_type: int_field(text, "SubType"),
        wifi_sn: text_field(text, "wifiSN"),
        dev_sn: text_field(text, "DevSN"),
        state: int_field(text, "Estate"),
        fault: int_field(text, "Bfault"),
        warning: int_field(text, "Bwarn").unwrap_or(0),
        battery: group_field_any(text, "Batt", &BATTERY_ROW),
        soc: group_field_any(text, "Batsoc", &BATTERY_ROW),
        max_min: group_field(text, "BMaxMin", Shape::exact(2, 2)),
        limits: group_field(text, "LVolCur", Shape::exact(2, 2)),
        temperature: temperature_field(text),
        cell_voltages: cell_list_field(text, "BatcelVol"),

        ac_in: group_field(text, "ACin", Shape::between(1, 4, 1)),
        ac_out: group_field(text, "ACout", Shape::between(1, 4, 1)),
        inverter_temperature: group_field(text, "Temp", Shape::ragged(1, 1, 1, 8)),
        bus_voltage: int_field(text, "busVp"),
        load_percent: int_field(text, "lPerc"),
        power_flow: int_field(text, "pFlow"),
        work_mode: int_field(text, "workM"),
        inverter_warning: int_field(text, "warn"),
        inverter_fault: int_field(text, "fault"),
        warning_flags: int_field(text, "wan2F"),
    };

    if !record.has_essentials() {
        return Err(Error::ParseFailed {
            reason: "neither Batsoc nor Batt could be read".to_string(),
            text: text.to_string(),
        });
    }

    Ok(record)
}
