//! End-to-end extraction tests
//!
//! Workbooks are written with rust_xlsxwriter and read back through
//! calamine, so these cover the real .xlsx path.

use dtforge::cli::{extract, ExtractOptions};
use dtforge::RunReport;
use pretty_assertions::assert_eq;
use quick_xml::events::Event;
use quick_xml::Reader;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

enum Value<'a> {
    Text(&'a str),
    Number(f64),
}

use Value::{Number as N, Text as T};

fn write_sheet(workbook: &mut Workbook, name: &str, rows: &[Vec<Value>]) {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            match value {
                Value::Text("") => {}
                Value::Text(text) => {
                    sheet.write_string(r as u32, c as u16, *text).unwrap();
                }
                Value::Number(n) => {
                    sheet.write_number(r as u32, c as u16, *n).unwrap();
                }
            }
        }
    }
}

fn cover_rows() -> Vec<Vec<Value<'static>>> {
    vec![
        vec![T("Immunization decision logic")],
        vec![
            T("Activity ID.Activity name"),
            T("Tab name"),
            T("Decision ID"),
            T("Table description"),
            T("Reference/source"),
        ],
        vec![
            T("IMMZ.D2 Determine required vaccination(s)"),
            T("BCG"),
            T("IMMZ.D2.DT.BCG"),
            T("Determine if BCG is due"),
            T("WHO position paper 2018"),
        ],
        vec![T(""), T(""), T("IMMZ.D5.DT.BCG.Contra"), T("BCG contraindications"), T("")],
    ]
}

fn bcg_rows() -> Vec<Vec<Value<'static>>> {
    vec![
        vec![T("Decision ID"), T("IMMZ.D2.DT.BCG")],
        vec![T("Business rule"), T("Determine if the client is due for BCG")],
        vec![T("Trigger"), T("IMMZ.D2 Determine required vaccination(s)")],
        vec![
            T("Inputs"),
            T(""),
            T("Output"),
            T("Guidance displayed to health worker"),
            T("Annotations"),
            T("Reference(s)"),
        ],
        vec![
            T("Age < 5\nAge in months < 60"),
            T("Number of BCG doses"),
            T(""),
            T(""),
            T(""),
            T(""),
        ],
        vec![
            T("Age < 5"),
            N(0.0),
            T("Client is due for BCG"),
            T("Give BCG today"),
            T(""),
            T("WHO 2018"),
        ],
        vec![
            T(""),
            N(1.0),
            T("Client is not due for BCG"),
            T(""),
            T("Already vaccinated"),
            T(""),
        ],
        vec![],
        vec![T("Decision ID"), T("IMMZ.D5.DT.BCG.Contra")],
        vec![T("Business rule"), T("Check BCG contraindications")],
        vec![T("Trigger"), T("IMMZ.D5 Determine contraindications")],
        vec![
            T("Potential contraindications"),
            T(""),
            T("Output"),
            T("Guidance displayed to health worker"),
        ],
        vec![T("Contraindication")],
        vec![T("Allergy to BCG"), T(""), T("BCG is contraindicated")],
        vec![T("Symptomatic HIV"), T(""), T("BCG is contraindicated"), T("Refer")],
    ]
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input/decision-logic");
        let cql = dir.path().join("input/cql");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&cql).unwrap();

        let mut workbook = Workbook::new();
        write_sheet(&mut workbook, "COVER", &cover_rows());
        write_sheet(&mut workbook, "BCG", &bcg_rows());
        workbook.save(input.join("IMMZ.xlsx")).unwrap();

        fs::write(
            cql.join("IMMZElements.cql"),
            "library IMMZElements\n\ndefine \"Age < 5\":\n  AgeInMonths() < 60\n\n/* other */\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("sushi-config.yaml"),
            "id: smart.who.int.immz\nname: SMARTImmunizations\ntitle: SMART Immunizations\ncanonical: http://smart.who.int/immunizations\nversion: 1.0.0\npublisher:\n  name: WHO\n",
        )
        .unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn options(&self) -> ExtractOptions {
        ExtractOptions {
            input: self.root().join("input/decision-logic"),
            cql: self.root().join("input/cql"),
            output: self.root().join("output"),
            config: self.root().join("sushi-config.yaml"),
            report: Some(self.root().join("report.json")),
            fill_dashes: true,
            dt_prefix: "DT".to_string(),
            dd_prefix: "DD".to_string(),
            quiet: true,
        }
    }

    fn run(&self) -> RunReport {
        extract(self.options()).unwrap()
    }

    fn output(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join("output").join(relative))
            .unwrap_or_else(|e| panic!("missing output {}: {}", relative, e))
    }
}

fn assert_well_formed(xml: &str) {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("malformed XML at {}: {}", reader.buffer_position(), e),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_run_report() {
    let fixture = Fixture::new();
    let report = fixture.run();

    assert_eq!(report.files.len(), 1);
    assert!(report.files[0].processed);
    assert_eq!(report.files[0].entries, 2);
    assert_eq!(report.tables_emitted(), 2);
    assert_eq!(report.tables_failed(), 0);
    assert!(report.installed);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture.root().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(json["tables"][0]["table_id"], "DT.IMMZ.D2.DT.BCG");
    assert_eq!(json["tables"][1]["kind"], "Contraindication");
}

#[test]
fn test_dmn_output() {
    let fixture = Fixture::new();
    fixture.run();

    let dmn = fixture.output("dmn/DT.IMMZ.D2.DT.BCG.dmn");
    assert_well_formed(&dmn);
    assert!(dmn.starts_with("<?xml"));
    assert!(dmn.contains(
        "href=\"http://smart.who.int/immunizations/bpmn/IMMZ.D2.bpmn#Determine%20required%20vaccination(s)\""
    ));
    assert!(dmn.contains("label=\"Age &lt; 5\""));
    // numeric cells come through as integers and the blank below is filled
    assert!(dmn.contains("<dmn:text>0</dmn:text>"));
    assert!(dmn.contains("<dmn:text>1</dmn:text>"));
    assert_eq!(dmn.matches("<dmn:text>Age &lt; 5</dmn:text>").count(), 2);
    assert_eq!(dmn.matches("<dmn:rule ").count(), 2);

    let contra = fixture.output("dmn/DT.IMMZ.D5.DT.BCG.Contra.dmn");
    assert_well_formed(&contra);
    assert!(contra.contains("label=\"Potential contraindications\""));
    assert_eq!(contra.matches("<dmn:rule ").count(), 2);
}

#[test]
fn test_fsh_and_cql_outputs() {
    let fixture = Fixture::new();
    fixture.run();

    let plan = fixture.output("fsh/plandefinitions/DT.IMMZ.D2.DT.BCG.fsh");
    assert!(plan.starts_with("Instance: DT.IMMZ.D2.DT.BCG\nInstanceOf: PlanDefinition\n"));
    assert!(plan.contains("Determine required vaccination(s)"));
    assert!(plan.contains("Canonical(DTs.BCG)"));

    let cql = fixture.output("cql/DTs.BCG.cql");
    assert!(cql.contains("library DTs.BCG\n"));
    assert!(cql.contains("define \"Age < 5\":\n"));
    assert!(cql.contains("define \"Client is due for BCG\":\n"));
    assert!(cql.contains("  // Found in IMMZElements.cql\n"));
    assert!(cql.contains("  //   AgeInMonths() < 60\n"));

    let library = fixture.output("fsh/libraries/DTs.BCG.fsh");
    assert!(library.contains("* content.id = \"ig-loader-DTs.BCG.cql\""));

    let code_system = fixture.output("fsh/codesystems/DD.fsh");
    assert!(code_system.contains("* #\"Age < 5\" \"Age < 5\"\n"));
    assert!(code_system.contains("* ^designation[=].language = #CQL"));

    assert!(fixture.output("fsh/valuesets/DT.IMMZ.D2.DT.BCG.fsh").contains("* include DD#\"Age < 5\"\n"));
    assert!(fixture.output("fsh/valuesets/DTs.BCG.fsh").contains("Decision Tables For Tab DTs.BCG"));
    assert!(fixture.output("fsh/valuesets/DD.fsh").contains("* include codes from system DD\n"));
    assert!(fixture
        .output("fsh/activitydefinitions/DTO.ClientisdueforBCG.fsh")
        .contains("InstanceOf: ActivityDefinition"));

    let page = fixture.output("pagecontent/decision-logic.md");
    assert!(page.contains("SMART Immunizations"));
    assert!(page.contains("{% include DT.IMMZ.D2.DT.BCG.xml %}"));
    assert_eq!(page.matches("<td>WHO position paper 2018</td>").count(), 2);
}

#[test]
fn test_runs_are_deterministic() {
    let fixture = Fixture::new();
    fixture.run();
    let first = fixture.output("dmn/DT.IMMZ.D2.DT.BCG.dmn");
    let first_cs = fixture.output("fsh/codesystems/DD.fsh");
    fixture.run();
    assert_eq!(fixture.output("dmn/DT.IMMZ.D2.DT.BCG.dmn"), first);
    assert_eq!(fixture.output("fsh/codesystems/DD.fsh"), first_cs);
}

#[test]
fn test_generated_libraries_are_not_linked() {
    let fixture = Fixture::new();
    // a generated library from an earlier run must not count as hand-written
    fs::write(
        fixture.root().join("input/cql/DTs.BCG.cql"),
        "define \"Client is due for BCG\":\n  true\n",
    )
    .unwrap();
    fixture.run();
    let cql = fixture.output("cql/DTs.BCG.cql");
    assert!(!cql.contains("// Found in DTs.BCG.cql"));
}

#[test]
fn test_unreadable_workbook_is_reported() {
    let fixture = Fixture::new();
    fs::write(fixture.root().join("input/decision-logic/broken.xlsx"), "not a zip").unwrap();
    let report = fixture.run();

    assert_eq!(report.files.len(), 2);
    let broken = report.files.iter().find(|f| f.path.ends_with("broken.xlsx")).unwrap();
    assert!(!broken.processed);
    assert!(broken.error.is_some());
    assert_eq!(report.tables_emitted(), 2);
}
