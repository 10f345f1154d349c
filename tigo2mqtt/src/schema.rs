/// Column names of the appliance's optimizer table, in column order.
///
/// Cells are matched to names by position only. The table really does
/// carry two `VMPE` columns, see [`DeviceSnapshot`](crate::table::DeviceSnapshot)
/// for how they are resolved by name.
pub static METRIC_SCHEMA: [&str; 23] = [
    "Label",
    "Barcode",
    "MAC",
    "Voltage_Vin",
    "Voltage_Vin_%",
    "Voltage_Vout",
    "Voltage_Vout_%",
    "Current_A",
    "Power_W",
    "Power_%",
    "Temp_C",
    "RSSI",
    "BRSSI",
    "Slot",
    "VMPE",
    "VMPE",
    "Sync/Evt",
    "Mode",
    "Bypass",
    "Event",
    "Raw",
    "Extra_Raw",
    "Details_Raw",
];

/// Rows with this many cells or fewer are headers or separators.
pub const MIN_DATA_CELLS: usize = 10;

pub fn column_name(index: usize) -> Option<&'static str> {
    METRIC_SCHEMA.get(index).copied()
}

/// Index of the last column carrying `name`, which is the one that wins a
/// lookup by name.
pub fn last_column_of(name: &str) -> Option<usize> {
    METRIC_SCHEMA.iter().rposition(|column| *column == name)
}
