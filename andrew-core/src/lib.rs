pub mod config;
pub mod error;
pub mod feed;
pub mod meta;
pub mod ordering;
pub mod page;
pub mod scanner;
pub mod site;
pub mod template;

// Re-export main types
pub use error::{Error, ErrorKind, Result};
pub use page::{Page, render_page, render_page_bytes};
pub use scanner::{discover, enumerate_pages};
pub use site::{DirFs, MemFs, SiteFiles};
pub use template::{RenderMode, render};
