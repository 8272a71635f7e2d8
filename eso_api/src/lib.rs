mod client;
pub mod dataset;
mod errors;
pub mod form;
mod query;
pub mod types;
mod user_agent;
pub use self::client::{Client, Session};
pub use self::errors::Error;
pub use self::form::{ConsumptionForm, FormFields, SelectOption};
pub use self::query::{DisplayType, Period, ReportQuery};
