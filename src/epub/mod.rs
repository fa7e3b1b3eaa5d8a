//! EPUB packaging: writing e-books out and checking archives read back.

mod inspect;
mod writer;

pub use inspect::{PackageItem, PackageSummary, inspect_epub, inspect_epub_from_reader};
pub use writer::{save_epub, to_epub_bytes, write_epub};
