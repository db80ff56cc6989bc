pub mod command;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod settings;
pub mod shape;

pub use command::{ReportProducer, TrivyCommand};
pub use error::ConvertError;
pub use pipeline::{convert, ConversionSummary, Invocation};
pub use render::{escape_csv, CsvRenderer, CSV_FILTERS};
pub use report::{
    kubernetes::{KubernetesReport, Resource},
    Cvss, Misconfiguration, Report, ScanResult, Secret, VendorCvss, Vulnerability,
};
pub use settings::Settings;
pub use shape::{load_report, ReportShape};
