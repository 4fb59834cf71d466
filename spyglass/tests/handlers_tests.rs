use spyglass::handlers::*;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_parse_domain_line_bare() {
    let result = parse_domain_line("Example.COM");
    assert_eq!(result, Some("example.com".to_string()));
}

#[test]
fn test_parse_domain_line_with_scheme() {
    let result = parse_domain_line("https://example.com/some/path");
    assert_eq!(result, Some("example.com".to_string()));
}

#[test]
fn test_parse_domain_line_with_path_no_scheme() {
    let result = parse_domain_line("example.com/login");
    assert_eq!(result, Some("example.com".to_string()));
}

#[test]
fn test_parse_domain_line_trailing_dot() {
    let result = parse_domain_line("example.com.");
    assert_eq!(result, Some("example.com".to_string()));
}

#[test]
fn test_parse_domain_line_invalid() {
    assert_eq!(parse_domain_line("not a domain"), None);
    assert_eq!(parse_domain_line("localhost"), None);
    assert_eq!(parse_domain_line(""), None);
}

#[test]
fn test_load_domains_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "example.com")?;
    writeln!(temp_file, "https://sub.example.org")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "Example.NET.")?;

    let path = PathBuf::from(temp_file.path());
    let domains = load_domains_from_file(&path)?;

    assert_eq!(domains.len(), 3);
    assert_eq!(domains[0], "example.com");
    assert_eq!(domains[1], "sub.example.org");
    assert_eq!(domains[2], "example.net");

    Ok(())
}

#[test]
fn test_load_domains_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_domains_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No valid domains"));
}

#[test]
fn test_load_domains_from_source_flags() {
    let result =
        load_domains_from_source(vec!["example.com".to_string()], None).unwrap();
    assert_eq!(result, vec!["example.com"]);
}

#[test]
fn test_load_domains_from_source_no_input() {
    let result = load_domains_from_source(Vec::new(), None);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .contains("Either --domain or --domains-file"));
}

#[test]
fn test_parse_status_codes() {
    assert_eq!(
        parse_status_codes("200, 301,403").unwrap(),
        vec![200, 301, 403]
    );
    assert!(parse_status_codes("200,abc").is_err());
    assert!(parse_status_codes("").is_err());
}
