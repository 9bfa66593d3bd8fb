use std::io::Write;
use std::path::Path;

use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_urls_only() {
    let cli = parse(&["adl", "https://example.com/a.iso", "https://example.com/b.iso"]);
    assert_eq!(cli.urls.len(), 2);
    assert!(!cli.no_overwrite);
    assert!(!cli.no_partial);
    assert!(cli.download_dir.is_none());
}

#[test]
fn cli_parse_all_flags() {
    let cli = parse(&[
        "adl", "-o", "/srv/dl", "-n", "8", "-O", "-P", "-t", "2.5", "--retries", "5", "http://h/x",
    ]);
    assert_eq!(cli.download_dir.as_deref(), Some(Path::new("/srv/dl")));
    assert_eq!(cli.concurrent_downloads, Some(8));
    assert!(cli.no_overwrite);
    assert!(cli.no_partial);
    assert_eq!(cli.timeout, Some(2.5));
    assert_eq!(cli.retries, Some(5));
}

#[test]
fn flags_override_config() {
    let cli = parse(&["adl", "-n", "0", "-O", "--retries", "7", "http://h/x"]);
    let cfg = cli.apply(DownloaderConfig::default());
    assert_eq!(cfg.concurrent_downloads, 1);
    assert!(!cfg.allow_overwrite);
    assert!(cfg.allow_partial);
    let retry = cfg.retry_config();
    assert_eq!(retry.max_retries, 7);
    assert_eq!(retry.delay_ceiling_secs, 60.0);
}

#[test]
fn unset_flags_keep_config() {
    let file_cfg = DownloaderConfig {
        concurrent_downloads: 3,
        timeout_secs: 9.0,
        allow_partial: false,
        ..DownloaderConfig::default()
    };
    let cfg = parse(&["adl", "http://h/x"]).apply(file_cfg);
    assert_eq!(cfg.concurrent_downloads, 3);
    assert_eq!(cfg.timeout_secs, 9.0);
    assert!(!cfg.allow_partial);
}

#[test]
fn requests_merge_args_and_input_file() {
    let mut list = tempfile::NamedTempFile::new().unwrap();
    writeln!(list, "# mirrors").unwrap();
    writeln!(list, "http://h/one.bin").unwrap();
    writeln!(list).unwrap();
    writeln!(list, "http://h/two.bin  second.bin").unwrap();
    let path = list.path().to_str().unwrap().to_string();

    let requests = parse(&["adl", "-i", &path, "http://h/zero.bin"]).requests().unwrap();
    assert_eq!(
        requests,
        vec![
            DownloadRequest::new("http://h/zero.bin"),
            DownloadRequest::new("http://h/one.bin"),
            DownloadRequest::named("http://h/two.bin", "second.bin"),
        ]
    );
}

#[test]
fn no_requests_is_an_error() {
    assert!(parse(&["adl"]).requests().is_err());
}

#[test]
fn non_finite_timeout_flag_is_rejected() {
    let cfg = parse(&["adl", "-t", "inf", "http://h/x"]).apply(DownloaderConfig::default());
    assert!(cfg.validate().is_err());
    // conversion stays safe even if validation is skipped
    assert!(cfg.timeout() <= std::time::Duration::from_secs_f64(adl_core::config::MAX_SECS));
}
