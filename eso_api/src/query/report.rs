use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};

use crate::form::FormFields;

/// Resolution of the report series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayType {
    /// One reading per hour. This is the default.
    #[default]
    Hourly,
    /// One reading per day.
    Daily,
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisplayType::Hourly => "hourly",
            DisplayType::Daily => "daily",
        };
        f.write_str(s)
    }
}

impl FromStr for DisplayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(DisplayType::Hourly),
            "daily" => Ok(DisplayType::Daily),
            _ => Err(format!("unknown display type `{}`", s)),
        }
    }
}

/// Span of time covered by one report, ending at the "next" boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Period {
    Day,
    /// The default.
    #[default]
    Week,
    Month,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            _ => Err(format!("unknown period `{}`", s)),
        }
    }
}

/// Directives layered on top of the scraped consumption form to request a
/// report export through the AJAX endpoint.
#[derive(Clone, Debug)]
pub struct ReportQuery {
    /// Option value of the meter/object, see [`crate::form::locate_selector`].
    pub object: String,
    pub display_type: DisplayType,
    pub period: Period,
    /// Date sent as `next_button_value` (at midnight). Defaults to today.
    pub next_boundary: NaiveDate,
}

impl ReportQuery {
    /// Hourly, weekly report for `object` ending today.
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            display_type: DisplayType::default(),
            period: Period::default(),
            next_boundary: Local::now().date_naive(),
        }
    }

    pub fn with_display_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = display_type;
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_next_boundary(mut self, date: NaiveDate) -> Self {
        self.next_boundary = date;
        self
    }

    /// Returns `base` with this query's directives applied.
    pub fn apply_to(&self, base: &FormFields) -> FormFields {
        let mut fields = base.clone();
        fields.insert("_triggering_element_name", "op");
        fields.insert("_wrapper_format", "drupal_ajax");
        fields.insert("objects[]", self.object.as_str());
        fields.insert("display_type", self.display_type.to_string());
        fields.insert("period", self.period.to_string());
        fields.insert(
            "next_button_value",
            format!("{} 00:00", self.next_boundary.format("%Y-%m-%d")),
        );
        fields
    }

    /// Urlencoded request body for the report endpoint.
    pub fn to_form_body(&self, base: &FormFields) -> String {
        self.apply_to(base).to_urlencoded()
    }
}
