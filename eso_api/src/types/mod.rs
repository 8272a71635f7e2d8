mod dataset;
pub use self::dataset::{RawDataset, RawRecord};
