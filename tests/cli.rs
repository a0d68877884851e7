//! End-to-end tests for the `triveridb` binary, covering the concrete
//! scenarios in spec.md §8 through the actual CLI surface (§6).

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("triveridb").unwrap()
}

const DOC: &str = r#"@prefix ex: <http://e/>. ex:a ex:p "v"; ex:q ex:a, ex:b ."#;

#[test]
fn count_triples_prints_three_for_scenario_one() {
    let dir = TempDir::new().unwrap();
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();

    bin()
        .arg("count-triples")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("3"));
}

#[test]
fn count_triples_with_no_file_prints_usage_and_succeeds() {
    bin().arg("count-triples").assert().success();
}

#[test]
fn import_then_export_round_trips_scenario_two() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();

    bin()
        .arg("import")
        .arg(db.path())
        .arg("http://e/m1")
        .arg(file.path())
        .assert()
        .success();

    // `http://e/` has no `#`, so the namespace-abbreviation rule (spec.md
    // §4.H) never fires and every IRI in the export comes back spelled out
    // in full, with no `@prefix` line.
    bin()
        .arg("export")
        .arg(db.path())
        .arg("http://e/m1")
        .assert()
        .success()
        .stdout("<http://e/a> <http://e/p> \"v\";\n\t<http://e/q> <http://e/a>, <http://e/b>.\n");
}

#[test]
fn reimporting_identical_document_reports_no_changes() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();

    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();

    bin()
        .arg("import")
        .arg(db.path())
        .arg("http://e/m1")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("0 added"))
        .stderr(predicate::str::contains("0 removed"));
}

#[test]
fn removing_a_triple_and_reimporting_reports_one_removal() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();

    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();

    file.write_str(r#"@prefix ex: <http://e/>. ex:a ex:p "v"; ex:q ex:a ."#).unwrap();

    bin()
        .arg("import")
        .arg(db.path())
        .arg("http://e/m1")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 removed"))
        .stderr(predicate::str::contains("0 added"));
}

#[test]
fn export_of_unknown_model_succeeds_with_no_output() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();
    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();

    bin()
        .arg("export")
        .arg(db.path())
        .arg("http://e/does-not-exist")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn sparql_select_with_binding_returns_matching_uri_scenario_four() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();
    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();

    bin()
        .arg("sparql")
        .arg(db.path())
        .arg(r#"PREFIX ex:<http://e/> SELECT ?x WHERE { ?x ex:p "v" }"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("<variable name=\"x\"/>"))
        .stdout(predicate::str::contains("<uri>http://e/a</uri>"));
}

#[test]
fn sparql_star_projection_binds_all_three_variables_scenario_five() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();
    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();

    bin()
        .arg("sparql")
        .arg(db.path())
        .arg("SELECT * WHERE { ?s ?p ?o }")
        .assert()
        .success()
        .stdout(predicate::str::contains("<variable name=\"s\"/>"))
        .stdout(predicate::str::contains("<variable name=\"p\"/>"))
        .stdout(predicate::str::contains("<variable name=\"o\"/>"));
}

#[test]
fn sparql_sql_flag_prints_generated_statement_scenario_six() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();
    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();

    bin()
        .arg("sparql")
        .arg("--sql")
        .arg(db.path())
        .arg(r#"PREFIX ex:<http://e/> SELECT ?x WHERE { ?x ex:p ?y }"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("JOIN Quad q0 ON q0.p ="))
        .stdout(predicate::str::contains("(SELECT l FROM Node WHERE oid = q0.s)"))
        .stdout(predicate::str::contains("ORDER BY").not())
        .stdout(predicate::str::contains("LIMIT").not());
}

#[test]
fn sparql_query_error_is_reported_in_band_as_xml() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("store.sqlite");
    // opening the store creates the schema even with nothing imported
    bin()
        .arg("sparql")
        .arg(db.path())
        .arg("SELECT ?z WHERE { ?x <http://e/p> ?y }")
        .assert()
        .success()
        .stdout(predicate::str::contains("<error>"))
        .stdout(predicate::str::contains("not bound"));
}

#[test]
fn importing_into_a_missing_database_file_creates_it() {
    let dir = TempDir::new().unwrap();
    let db = dir.child("fresh.sqlite");
    let file = dir.child("doc.ttl");
    file.write_str(DOC).unwrap();

    db.assert(predicate::path::missing());
    bin().arg("import").arg(db.path()).arg("http://e/m1").arg(file.path()).assert().success();
    db.assert(predicate::path::is_file());
}
