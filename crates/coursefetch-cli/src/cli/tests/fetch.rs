//! Tests for the fetch subcommand.

use super::{parse, Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_fetch_all() {
    match parse(&["coursefetch", "fetch", "https://p.test/course/view.php?id=7", "--all"]).command {
        CliCommand::Fetch {
            url,
            index,
            all,
            out,
        } => {
            assert_eq!(url, "https://p.test/course/view.php?id=7");
            assert!(index.is_none());
            assert!(all);
            assert!(out.is_none());
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_index_out() {
    match parse(&[
        "coursefetch",
        "fetch",
        "https://p.test/course/view.php?id=7",
        "--index",
        "3",
        "--out",
        "/tmp/td",
    ])
    .command
    {
        CliCommand::Fetch { index, all, out, .. } => {
            assert_eq!(index, Some(3));
            assert!(!all);
            assert_eq!(out.as_deref(), Some(std::path::Path::new("/tmp/td")));
        }
        _ => panic!("expected Fetch with --index"),
    }
}

#[test]
fn cli_parse_fetch_index_conflicts_with_all() {
    let res = Cli::try_parse_from([
        "coursefetch",
        "fetch",
        "https://p.test/course/view.php?id=7",
        "--index",
        "1",
        "--all",
    ]);
    assert!(res.is_err());
}
