mod report;
pub use self::report::{DisplayType, Period, ReportQuery};
