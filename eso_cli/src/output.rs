use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use eso_lib::{SelectOption, Series, SeriesSummary};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled, Serialize)]
struct ObjectRow {
    #[tabled(rename = "Object")]
    #[serde(rename = "Object")]
    value: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Tabled, Serialize)]
struct SeriesRow {
    #[tabled(rename = "Statistic")]
    #[serde(rename = "Statistic")]
    statistic_id: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Points")]
    #[serde(rename = "Points")]
    points: usize,
    #[tabled(rename = "First")]
    #[serde(rename = "First")]
    first: String,
    #[tabled(rename = "Last")]
    #[serde(rename = "Last")]
    last: String,
    #[tabled(rename = "Total kWh")]
    #[serde(rename = "Total kWh")]
    total: String,
}

#[derive(Tabled, Serialize)]
struct PointRow {
    #[tabled(rename = "Statistic")]
    #[serde(rename = "Statistic")]
    statistic_id: String,
    #[tabled(rename = "Start")]
    #[serde(rename = "Start")]
    start: String,
    #[tabled(rename = "kWh")]
    #[serde(rename = "kWh")]
    state: String,
    #[tabled(rename = "Sum")]
    #[serde(rename = "Sum")]
    sum: String,
}

// -- Row builders --

fn build_object_rows(objects: &[SelectOption]) -> Vec<ObjectRow> {
    objects
        .iter()
        .map(|o| ObjectRow {
            value: o.value.clone(),
            name: o.text.clone(),
        })
        .collect()
}

fn build_series_rows(summaries: &[SeriesSummary], tz: Tz) -> Vec<SeriesRow> {
    summaries
        .iter()
        .map(|s| SeriesRow {
            statistic_id: s.statistic_id.clone(),
            name: s.name.clone(),
            points: s.points,
            first: s.first.map(|t| format_local(t, tz)).unwrap_or_default(),
            last: s.last.map(|t| format_local(t, tz)).unwrap_or_default(),
            total: format_kwh(s.total),
        })
        .collect()
}

fn build_point_rows(series: &[Series], tz: Tz) -> Vec<PointRow> {
    series
        .iter()
        .flat_map(|s| {
            s.points.iter().map(move |p| PointRow {
                statistic_id: s.metadata.statistic_id.clone(),
                start: format_local(p.start, tz),
                state: p.state.map(format_kwh).unwrap_or_default(),
                sum: format_kwh(p.sum),
            })
        })
        .collect()
}

// -- Table output --

pub fn print_objects_table(objects: &[SelectOption]) {
    println!("{}", Table::new(build_object_rows(objects)));
}

pub fn print_series_table(summaries: &[SeriesSummary], tz: Tz) {
    println!("{}", Table::new(build_series_rows(summaries, tz)));
}

pub fn print_points_table(series: &[Series], tz: Tz) {
    println!("{}", Table::new(build_point_rows(series, tz)));
}

// -- Markdown output --

fn markdown<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}

pub fn print_objects_markdown(objects: &[SelectOption]) {
    println!("{}", markdown(build_object_rows(objects)));
}

pub fn print_series_markdown(summaries: &[SeriesSummary], tz: Tz) {
    println!("{}", markdown(build_series_rows(summaries, tz)));
}

pub fn print_points_markdown(series: &[Series], tz: Tz) {
    println!("{}", markdown(build_point_rows(series, tz)));
}

// -- CSV output --

fn write_csv<T: Serialize>(rows: Vec<T>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_objects_csv(objects: &[SelectOption]) -> Result<()> {
    write_csv(build_object_rows(objects))
}

pub fn print_series_csv(summaries: &[SeriesSummary], tz: Tz) -> Result<()> {
    write_csv(build_series_rows(summaries, tz))
}

pub fn print_points_csv(series: &[Series], tz: Tz) -> Result<()> {
    write_csv(build_point_rows(series, tz))
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn format_kwh(value: f64) -> String {
    format!("{:.3}", value)
}
