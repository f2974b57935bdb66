pub mod reader;

pub use reader::{PageGeometry, PdfDocument};
