use std::fmt;

use log::debug;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::schema::{METRIC_SCHEMA, MIN_DATA_CELLS};
use crate::value::{normalize, MetricValue};

/// Identity of one optimizer within a poll: `<Label>___<Barcode>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceKey(String);

impl DeviceKey {
    pub const SEPARATOR: &'static str = "___";

    pub fn new(label: &str, barcode: &str) -> Self {
        Self(format!("{label}{}{barcode}", Self::SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized cells of one optimizer row, addressed by column position.
///
/// The schema names two columns `VMPE`. Both values are kept; a lookup by
/// name returns the later one, and [`DeviceSnapshot::metrics`] lists the
/// name once, at the position of its first column.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSnapshot {
    columns: Vec<MetricValue>,
}

impl DeviceSnapshot {
    pub fn column(&self, index: usize) -> Option<&MetricValue> {
        self.columns.get(index)
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        METRIC_SCHEMA
            .iter()
            .zip(&self.columns)
            .rev()
            .find(|(column, _)| **column == name)
            .map(|(_, value)| value)
    }

    /// Number of columns present in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One entry per distinct metric name, in column order.
    pub fn metrics(&self) -> impl Iterator<Item = (&'static str, &MetricValue)> + '_ {
        METRIC_SCHEMA
            .iter()
            .take(self.columns.len())
            .enumerate()
            .filter(|&(index, name)| !METRIC_SCHEMA[..index].contains(name))
            .filter_map(move |(_, name)| self.get(name).map(|value| (*name, value)))
    }
}

/// All optimizers read from one status page, in table order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PollResult {
    devices: Vec<(DeviceKey, DeviceSnapshot)>,
}

impl PollResult {
    /// A repeated key replaces the earlier snapshot in place.
    pub fn insert(&mut self, key: DeviceKey, snapshot: DeviceSnapshot) {
        match self.devices.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = snapshot,
            None => self.devices.push((key, snapshot)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DeviceSnapshot> {
        self.devices
            .iter()
            .find(|(existing, _)| existing.as_str() == key)
            .map(|(_, snapshot)| snapshot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceKey, &DeviceSnapshot)> {
        self.devices.iter().map(|(key, snapshot)| (key, snapshot))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn cell_texts(row: ElementRef<'_>, cells: &Selector) -> Vec<String> {
    row.select(cells)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect()
}

/// Reads the optimizer table (`table.list_tb`) out of the appliance's
/// status page.
pub fn extract(html: &str) -> Result<PollResult, ExtractError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&selector("table.list_tb"))
        .next()
        .ok_or(ExtractError::TableNotFound)?;

    let rows = selector("tr");
    let cells = selector("td");
    let mut result = PollResult::default();
    for row in table.select(&rows) {
        let line = cell_texts(row, &cells);
        debug!("Parsed line data: {line:?}");
        if let Some((key, snapshot)) = parse_row(&line) {
            result.insert(key, snapshot);
        }
    }

    if result.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(result)
}

/// Turns the trimmed cell texts of one row into a keyed snapshot.
///
/// Returns `None` for rows of [`MIN_DATA_CELLS`] cells or fewer. Cells past
/// the last known column are dropped.
pub fn parse_row<S: AsRef<str>>(line: &[S]) -> Option<(DeviceKey, DeviceSnapshot)> {
    if line.len() <= MIN_DATA_CELLS {
        return None;
    }
    // identity is taken from the raw text, before normalization
    let key = DeviceKey::new(line[0].as_ref(), line[1].as_ref());
    if line.len() > METRIC_SCHEMA.len() {
        debug!(
            "{key}: ignoring {} cells past the last known column",
            line.len() - METRIC_SCHEMA.len()
        );
    }
    let columns = line
        .iter()
        .take(METRIC_SCHEMA.len())
        .map(|cell| normalize(cell.as_ref()))
        .collect();
    Some((key, DeviceSnapshot { columns }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANEL_A: [&str; 23] = [
        "PanelA",
        "BC123",
        "AA:BB:CC:DD:EE:FF",
        "40.1",
        "2.5",
        "39.8",
        "2.1",
        "8.0",
        "320.5",
        "95",
        "35",
        "-60",
        "n-a",
        "1",
        "12",
        "0",
        "1/0",
        "on",
        "off",
        "ok",
        "r1",
        "r2",
        "r3",
    ];

    fn page(rows: &[Vec<&str>]) -> String {
        let mut html = String::from(
            "<html><body><table class=\"list_tb\"><tr><th>Label</th><th>Barcode</th></tr>",
        );
        for row in rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td> {cell} </td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    #[test]
    fn device_key_joins_label_and_barcode() {
        assert_eq!(DeviceKey::new("PanelA", "BC123").as_str(), "PanelA___BC123");
    }

    #[test]
    fn short_rows_are_skipped() {
        assert!(parse_row(&["a"; 10]).is_none());
        assert!(parse_row::<&str>(&[]).is_none());
        let (_, snapshot) = parse_row(&["a"; 11]).expect("data row");
        assert_eq!(snapshot.len(), 11);
    }

    #[test]
    fn excess_cells_are_dropped() {
        let mut line = PANEL_A.to_vec();
        line.extend(["x", "y"]);
        let (key, snapshot) = parse_row(&line).expect("data row");
        assert_eq!(key.as_str(), "PanelA___BC123");
        assert_eq!(snapshot.len(), METRIC_SCHEMA.len());
        assert_eq!(snapshot.get("Details_Raw"), Some(&MetricValue::Text("r3".into())));
    }

    #[test]
    fn extracts_a_panel_row() {
        let result = extract(&page(&[PANEL_A.to_vec()])).expect("table");
        assert_eq!(result.len(), 1);

        let panel = result.get("PanelA___BC123").expect("panel");
        assert_eq!(panel.get("Power_W"), Some(&MetricValue::Float(320.5)));
        assert_eq!(panel.get("Voltage_Vin"), Some(&MetricValue::Float(40.1)));
        assert_eq!(panel.get("RSSI"), Some(&MetricValue::Integer(-60)));
        assert_eq!(panel.get("Mode"), Some(&MetricValue::Integer(1)));
        assert_eq!(panel.get("Bypass"), Some(&MetricValue::Integer(0)));
        assert_eq!(panel.get("Sync/Evt"), Some(&MetricValue::Text("1-0".into())));
        assert!(panel.get("BRSSI").is_some_and(MetricValue::is_absent));
    }

    #[test]
    fn duplicate_column_name_keeps_both_values() {
        let (_, panel) = parse_row(&PANEL_A).expect("data row");
        assert_eq!(panel.column(14), Some(&MetricValue::Integer(12)));
        assert_eq!(panel.column(15), Some(&MetricValue::Integer(0)));
        assert_eq!(panel.get("VMPE"), Some(&MetricValue::Integer(0)));

        let names: Vec<_> = panel.metrics().map(|(name, _)| name).collect();
        assert_eq!(names.len(), 22);
        assert_eq!(names.iter().filter(|name| **name == "VMPE").count(), 1);
        assert_eq!(names[14], "VMPE");
        assert_eq!(names[15], "Sync/Evt");
    }

    #[test]
    fn snapshot_of_a_partial_row_uses_the_first_vmpe() {
        let (_, panel) = parse_row(&PANEL_A[..15]).expect("data row");
        assert_eq!(panel.get("VMPE"), Some(&MetricValue::Integer(12)));
        assert!(panel.get("Sync/Evt").is_none());
    }

    #[test]
    fn missing_table_is_reported() {
        let html = "<html><table class=\"other\"><tr><td>1</td></tr></table></html>";
        assert_eq!(extract(html), Err(ExtractError::TableNotFound));
    }

    #[test]
    fn table_without_data_rows_is_empty() {
        assert_eq!(extract(&page(&[vec!["a", "b"]])), Err(ExtractError::Empty));
    }

    #[test]
    fn repeated_device_replaces_in_place() {
        let mut second = PANEL_A.to_vec();
        second[1] = "BC999";
        let mut again = PANEL_A.to_vec();
        again[8] = "1.5";
        let result = extract(&page(&[PANEL_A.to_vec(), second, again])).expect("table");

        let keys: Vec<_> = result.iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, ["PanelA___BC123", "PanelA___BC999"]);
        let panel = result.get("PanelA___BC123").expect("panel");
        assert_eq!(panel.get("Power_W"), Some(&MetricValue::Float(1.5)));
    }
}
