use shared::domain::EarthquakeRecord;

pub fn format_record(record: &EarthquakeRecord) -> String {
    format!(
        "{}  M{:.1} [{}]  {}  ({:.3}, {:.3}, {:.1} km)",
        record.time().format("%Y-%m-%d %H:%M:%S UTC"),
        record.magnitude(),
        record.band().label(),
        record.place(),
        record.latitude(),
        record.longitude(),
        record.depth(),
    )
}

pub fn render_list(records: &[EarthquakeRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format_record(record));
        out.push('\n');
    }
    out
}

pub fn render_json_lines(records: &[EarthquakeRecord]) -> serde_json::Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}
