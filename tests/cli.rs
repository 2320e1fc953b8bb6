mod common;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::prelude::*;
use predicates::str::contains;

fn csv_query() -> Command {
    let mut cmd = Command::cargo_bin("csv-query").expect("binary exists");
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn count_flag_prints_count_line() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("fruit.csv", "1,apple\n2,banana,3.5\n");
    csv_query()
        .args(["-i", input.to_str().unwrap(), "-q", "select count(*) from csv", "--count"])
        .assert()
        .success()
        .stdout("COUNT=2\n");
}

#[test]
fn query_may_name_the_input_file_instead_of_the_table() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("fruit.csv", "1,apple\n2,banana\n");
    let path = input.to_str().unwrap().to_string();
    let query = format!("select c2 from {path} where c1 = 2");
    csv_query()
        .args(["-i", path.as_str(), "-q", query.as_str()])
        .assert()
        .success()
        .stdout("banana\n");
}

#[test]
fn default_output_uses_input_delimiter() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", "name;age\nAnn;31\nBob;\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-q",
            "select c1, c2 from csv order by c1",
            "-d",
            "semicolon",
            "-s",
        ])
        .assert()
        .success()
        .stdout("Ann;31\nBob;\n");
}

#[test]
fn output_delimiter_overrides_input_delimiter() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.tsv", "Ann\t31\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-q",
            "select * from csv",
            "-d",
            "tab",
            "--output-delimiter",
            "|",
        ])
        .assert()
        .success()
        .stdout("Ann|31\n");
}

#[test]
fn table_flag_renders_aligned_rows() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("fruit.csv", "1,apple\n2,\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-q",
            "select c1, c2 from csv order by c1",
            "--table",
        ])
        .assert()
        .success()
        .stdout(contains("# | c1 | c2"))
        .stdout(contains("1 | 1  | apple"))
        .stdout(contains("2 | 2  | NULL"));
}

#[test]
fn positional_and_named_types_are_rejected_together() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("a.csv", "1,2\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-q",
            "select 1",
            "-T",
            "numeric,date",
            "-t",
            "c1=varchar",
        ])
        .assert()
        .failure()
        .stderr(contains("error:"))
        .stderr(contains("cannot be supplied together"));
}

#[test]
fn explicit_types_lock_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("codes.csv", "007,20160706\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-q",
            "select c1, c2 from csv",
            "-T",
            "varchar(10),basicdate",
        ])
        .assert()
        .success()
        .stdout("007,2016-07-06\n");
}

#[test]
fn missing_input_fails_with_path_in_message() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("nope.csv");
    csv_query()
        .args(["-i", missing.to_str().unwrap(), "-q", "select 1"])
        .assert()
        .failure()
        .stderr(contains("nope.csv"));
}

#[test]
fn schema_flag_writes_load_report_to_stderr() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("fruit.csv", "1,apple\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-q",
            "select count(*) from csv",
            "--schema",
        ])
        .assert()
        .success()
        .stdout("1\n")
        .stderr(contains("\"column_type\": \"numeric\""))
        .stderr(contains("\"rows_inserted\": 1"));
}

#[test]
fn count_and_table_conflict_at_parse_time() {
    csv_query()
        .args(["-i", "x.csv", "-q", "select 1", "--count", "--table"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with").or(contains("conflict")));
}

#[test]
fn sql_helper_functions_are_available() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("amounts.csv", "x;3,25;06/07/2016\n");
    csv_query()
        .args([
            "-i",
            input.to_str().unwrap(),
            "-d",
            ";",
            "-c",
            "-q",
            "select tof(c2) * 2, toyyyymmdd(c3) from csv",
        ])
        .assert()
        .success()
        .stdout("6.5;2016-07-06\n");
}

#[test]
fn null_single_value_prints_empty_line() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sparse.csv", "1,\n2,\n");
    csv_query()
        .args(["-i", input.to_str().unwrap(), "-q", "select max(c2) from csv"])
        .assert()
        .success()
        .stdout("\n");
}
