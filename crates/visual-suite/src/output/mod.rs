mod error;
mod html;
mod image;
mod manager;
mod placeholder;
mod xml;

pub use error::ReportError;
pub use html::{TemplateKind, TemplateSource};
pub use self::image::{ImageWriter, PngImageWriter};
pub use manager::{
    RESULTS_FILE_NAME, ReportOptions, ResultReporter, SourceImages, result_dir_name,
};
pub use placeholder::{PlaceholderAccessor, PlaceholderRegistry};
