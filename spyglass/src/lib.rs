// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    load_domains_from_file,
    load_domains_from_source,
    parse_domain_line,
    parse_status_codes,
};
