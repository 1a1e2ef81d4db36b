use serde::Serialize;

/// One inner `[a, b, c]` group of a grouped reading.
pub type Group = Vec<i64>;

/// A value as it appears under one key of the device payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Groups(Vec<Group>),
    List(Vec<i64>),
}

/// Every key the extractor knows about, in the order they are reported.
pub const KEYS: [&str; 24] = [
    "CommVer", "Type", "SubType", "wifiSN", "DevSN", "Estate", "Bfault", "Bwarn", "Batt",
    "Batsoc", "BMaxMin", "LVolCur", "BTemp", "BatcelVol", "ACin", "ACout", "Temp", "busVp",
    "lPerc", "pFlow", "workM", "warn", "fault", "wan2F",
];

/// Keys only inverters send.
pub const INVERTER_KEYS: [&str; 10] = [
    "ACin", "ACout", "Temp", "busVp", "lPerc", "pFlow", "workM", "warn", "fault", "wan2F",
];

// TelemetryRecord {{{
/// Telemetry decoded from a single `get dev real infor` reply.
///
/// All numbers are raw device units; `None` means the device did not send
/// the field (or sent it in a shape we could not read), which is distinct
/// from a reading of zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "CommVer")]
    pub comm_ver: Option<i64>,
    #[serde(rename = "Type")]
    pub device_type: Option<i64>,
    #[serde(rename = "SubType")]
    pub sub_type: Option<i64>,
    #[serde(rename = "wifiSN")]
    pub wifi_sn: Option<String>,
    #[serde(rename = "DevSN")]
    pub dev_sn: Option<String>,
    #[serde(rename = "Estate")]
    pub state: Option<i64>,
    #[serde(rename = "Bfault")]
    pub fault: Option<i64>,
    /// Zero when the device leaves it out; zero is "no warning".
    #[serde(rename = "Bwarn")]
    pub warning: i64,

    /// `[[voltage, current, reserved]]` from a battery, or
    /// `[[voltage], [current], [power]]` from an inverter.
    #[serde(rename = "Batt")]
    pub battery: Option<Vec<Group>>,
    /// `[[soc, scale, capacity]]`, or per-channel `[[soc], [scale], [capacity]]`.
    #[serde(rename = "Batsoc")]
    pub soc: Option<Vec<Group>>,
    /// `[[max_v, min_v], [max_i, min_i]]`
    #[serde(rename = "BMaxMin")]
    pub max_min: Option<Vec<Group>>,
    /// `[[v1, v2], [i1, i2]]`
    #[serde(rename = "LVolCur")]
    pub limits: Option<Vec<Group>>,
    /// One or two `[t1, t2]` groups.
    #[serde(rename = "BTemp")]
    pub temperature: Option<Vec<Group>>,
    #[serde(rename = "BatcelVol")]
    pub cell_voltages: Option<Vec<i64>>,

    // inverter only
    /// `[[voltage], [current], [power], [frequency]]`
    #[serde(rename = "ACin")]
    pub ac_in: Option<Vec<Group>>,
    #[serde(rename = "ACout")]
    pub ac_out: Option<Vec<Group>>,
    /// One row of probe readings; its length depends on the model.
    #[serde(rename = "Temp")]
    pub inverter_temperature: Option<Vec<Group>>,
    #[serde(rename = "busVp")]
    pub bus_voltage: Option<i64>,
    #[serde(rename = "lPerc")]
    pub load_percent: Option<i64>,
    #[serde(rename = "pFlow")]
    pub power_flow: Option<i64>,
    #[serde(rename = "workM")]
    pub work_mode: Option<i64>,
    #[serde(rename = "warn")]
    pub inverter_warning: Option<i64>,
    #[serde(rename = "fault")]
    pub inverter_fault: Option<i64>,
    #[serde(rename = "wan2F")]
    pub warning_flags: Option<i64>,
}

impl TelemetryRecord {
    /// Look a reading up by its wire key. `BtemList` is folded into `BTemp`
    /// and has no entry of its own.
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        let groups = |v: &Option<Vec<Group>>| v.clone().map(FieldValue::Groups);

        match key {
            "CommVer" => self.comm_ver.map(FieldValue::Int),
            "Type" => self.device_type.map(FieldValue::Int),
            "SubType" => self.sub_type.map(FieldValue::Int),
            "wifiSN" => self.wifi_sn.clone().map(FieldValue::Text),
            "DevSN" => self.dev_sn.clone().map(FieldValue::Text),
            "Estate" => self.state.map(FieldValue::Int),
            "Bfault" => self.fault.map(FieldValue::Int),
            "Bwarn" => Some(FieldValue::Int(self.warning)),
            "Batt" => groups(&self.battery),
            "Batsoc" => groups(&self.soc),
            "BMaxMin" => groups(&self.max_min),
            "LVolCur" => groups(&self.limits),
            "BTemp" => groups(&self.temperature),
            "BatcelVol" => self.cell_voltages.clone().map(FieldValue::List),
            "ACin" => groups(&self.ac_in),
            "ACout" => groups(&self.ac_out),
            "Temp" => groups(&self.inverter_temperature),
            "busVp" => self.bus_voltage.map(FieldValue::Int),
            "lPerc" => self.load_percent.map(FieldValue::Int),
            "pFlow" => self.power_flow.map(FieldValue::Int),
            "workM" => self.work_mode.map(FieldValue::Int),
            "warn" => self.inverter_warning.map(FieldValue::Int),
            "fault" => self.inverter_fault.map(FieldValue::Int),
            "wan2F" => self.warning_flags.map(FieldValue::Int),
            _ => None,
        }
    }

    /// Preferred identifier for the device: `DevSN`, falling back to `wifiSN`.
    pub fn serial(&self) -> Option<&str> {
        self.dev_sn
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.wifi_sn.as_deref().filter(|s| !s.is_empty()))
    }

    /// Non-zero `Bfault` or, on inverters, non-zero `fault`.
    pub fn has_fault(&self) -> bool {
        self.fault.unwrap_or(0) != 0 || self.inverter_fault.unwrap_or(0) != 0
    }

    pub fn has_warning(&self) -> bool {
        self.warning != 0 || self.inverter_warning.unwrap_or(0) != 0
    }

    /// True when the reply carried any inverter-only reading.
    pub fn is_inverter(&self) -> bool {
        INVERTER_KEYS.iter().any(|key| self.get(key).is_some())
    }

    /// True if either of the two core battery groups was decoded.
    pub fn has_essentials(&self) -> bool {
        self.soc.is_some() || self.battery.is_some()
    }
} // }}}
