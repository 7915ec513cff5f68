mod export;

pub use export::{BooksSnapshot, Exporter};
