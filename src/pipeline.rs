//! Extraction pipeline
//!
//! Per workbook: read the cover index, locate the referenced tables, walk
//! each table once and render its per-table resources. After the last
//! workbook the registry is finalized against the hand-written CQL corpus
//! and the run-level resources are rendered. Nothing is written until
//! `install`.

use crate::context::{FileReport, RunContext, TableReport};
use crate::core::{locate, walk, ExpressionKind, TableIds};
use crate::error::DtResult;
use crate::excel::{parse_cover, Grid, WorkbookSource, XlsxWorkbook, COVER_SHEET};
use crate::library::{CqlCorpus, DefinitionLookup};
use crate::types::{DecisionTable, TableAnchor, TableKind};
use crate::writer::page::{OverviewRow, PAGE_ID};
use crate::writer::{activity, codesystem, cql, dmn, page, plan, ResourceKind};
use indexmap::{IndexMap, IndexSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Title of the run-level code system
const CODE_SYSTEM_TITLE: &str = "Decision Table";

/// Cover sheet details carried into a table's resources
#[derive(Debug, Clone, Default)]
pub struct TableMeta {
    pub title: String,
    pub description: Option<String>,
    pub source: Option<String>,
}

/// `.xlsx` files of a directory in name order. Office lock files (`~$...`)
/// are skipped and a missing directory yields no files.
pub fn find_workbooks(dir: &Path) -> DtResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "input directory not found");
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
                && !path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with("~$"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Process every workbook of the input directory and render the run-level
/// resources
pub fn run(ctx: &mut RunContext) {
    let files = match find_workbooks(&ctx.config.input_dir) {
        Ok(files) => files,
        Err(e) => {
            ctx.report.warn(format!(
                "could not list input directory {}: {}",
                ctx.config.input_dir.display(),
                e
            ));
            Vec::new()
        }
    };
    info!(count = files.len(), dir = %ctx.config.input_dir.display(), "found workbooks");

    for path in files {
        match XlsxWorkbook::open(&path) {
            Ok(mut workbook) => process_workbook(ctx, &mut workbook),
            Err(e) => {
                ctx.report.warn(format!("could not open {}: {}", path.display(), e));
                ctx.report.files.push(FileReport {
                    path: path.display().to_string(),
                    processed: false,
                    entries: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let corpus = match CqlCorpus::load_dir(&ctx.config.cql_dir, &ctx.config.dt_prefix) {
        Ok(corpus) => corpus,
        Err(e) => {
            ctx.report.warn(format!(
                "could not read CQL directory {}: {}",
                ctx.config.cql_dir.display(),
                e
            ));
            CqlCorpus::new()
        }
    };
    finish_run(ctx, &corpus);
}

/// Write the bundle to the output directory
pub fn install(ctx: &mut RunContext) -> DtResult<Vec<PathBuf>> {
    let written = ctx.bundle.install(&ctx.config.output_dir)?;
    ctx.report.installed = true;
    Ok(written)
}

/// Located tables of one tab, with the grid they were found in
struct TabTables {
    grid: Rc<Grid>,
    anchors: IndexMap<String, TableAnchor>,
}

fn load_tab<'a>(
    ctx: &mut RunContext,
    source: &mut dyn WorkbookSource,
    tab: &str,
    tabs: &'a mut IndexMap<String, Option<TabTables>>,
) -> Option<&'a TabTables> {
    if !tabs.contains_key(tab) {
        let loaded = match ctx.grids.load(source, tab) {
            Ok(grid) => {
                let anchors = locate(&grid);
                Some(TabTables { grid, anchors })
            }
            Err(e) => {
                ctx.report.warn(format!(
                    "could not load tab '{}' of {}: {}",
                    tab,
                    source.path().display(),
                    e
                ));
                None
            }
        };
        tabs.insert(tab.to_string(), loaded);
    }
    tabs.get(tab).and_then(Option::as_ref)
}

/// Extract every table a workbook's cover sheet references, or every table
/// of every tab when there is no cover sheet
pub fn process_workbook(ctx: &mut RunContext, source: &mut dyn WorkbookSource) {
    let path = source.path().display().to_string();
    info!(workbook = %path, "processing workbook");

    let mut tabs: IndexMap<String, Option<TabTables>> = IndexMap::new();
    let mut attempted: IndexSet<(String, String)> = IndexSet::new();
    let mut walked: IndexMap<(String, String), DecisionTable> = IndexMap::new();

    let cover = match source.resolve_sheet(COVER_SHEET) {
        Some(sheet) => match ctx.grids.load(source, &sheet).and_then(|grid| parse_cover(&grid)) {
            Ok(entries) => Some(entries),
            Err(e) => {
                ctx.report.warn(format!("unusable cover sheet in {}: {}", path, e));
                None
            }
        },
        None => None,
    };

    let entries = match cover {
        Some(entries) => {
            for entry in &entries {
                let Some(tables) = load_tab(ctx, source, &entry.tab, &mut tabs) else {
                    continue;
                };
                let Some(anchor) = tables.anchors.get(&entry.decision_id) else {
                    ctx.report.warn(format!(
                        "activity {} references decision table {} which was not found on tab '{}'",
                        entry.activity_id, entry.decision_id, entry.tab
                    ));
                    continue;
                };
                let key = (entry.tab.clone(), entry.decision_id.clone());
                if !attempted.insert(key.clone()) {
                    debug!(decision_id = %entry.decision_id, "table already extracted");
                    continue;
                }
                let meta = TableMeta {
                    title: entry.activity_name.clone(),
                    description: entry.description.clone(),
                    source: entry.source.clone(),
                };
                let grid = Rc::clone(&tables.grid);
                let anchor = anchor.clone();
                if let Some(table) = extract_table(ctx, &grid, &anchor, &meta) {
                    walked.insert(key, table);
                }
            }
            entries.len()
        }
        None => {
            info!(workbook = %path, "no cover sheet, scanning every tab");
            let mut located = 0;
            for tab in source.sheet_names() {
                let Some(tables) = load_tab(ctx, source, &tab, &mut tabs) else {
                    continue;
                };
                let grid = Rc::clone(&tables.grid);
                let anchors: Vec<TableAnchor> = tables.anchors.values().cloned().collect();
                for anchor in anchors {
                    if anchor.kind == TableKind::Schedule {
                        info!(decision_id = %anchor.decision_id, "skipping schedule table");
                        continue;
                    }
                    let meta = TableMeta {
                        title: anchor.business_rule_text.clone(),
                        ..Default::default()
                    };
                    if let Some(table) = extract_table(ctx, &grid, &anchor, &meta) {
                        walked.insert((tab.clone(), anchor.decision_id.clone()), table);
                    }
                    located += 1;
                }
            }
            located
        }
    };

    for (tab, decision_id) in unused_tables(&tabs, &walked) {
        ctx.report.warn(format!(
            "decision table {} on tab '{}' is not used by any activity",
            decision_id, tab
        ));
    }

    ctx.report.files.push(FileReport {
        path,
        processed: true,
        entries,
        error: None,
    });
}

/// Located tables of a workbook without a walked table marked used.
/// Schedule tables are never extracted and are not reported.
fn unused_tables<'a>(
    tabs: &'a IndexMap<String, Option<TabTables>>,
    walked: &IndexMap<(String, String), DecisionTable>,
) -> Vec<(&'a str, &'a str)> {
    tabs.iter()
        .filter_map(|(tab, tables)| tables.as_ref().map(|tables| (tab, tables)))
        .flat_map(move |(tab, tables)| {
            tables
                .anchors
                .iter()
                .filter(|(_, anchor)| anchor.kind != TableKind::Schedule)
                .filter(move |(decision_id, _)| {
                    !walked
                        .get(&(tab.clone(), (*decision_id).clone()))
                        .is_some_and(|table| table.used)
                })
                .map(move |(decision_id, _)| (tab.as_str(), decision_id.as_str()))
        })
        .collect()
}

/// Walk one table and render its DMN, rule document and value set.
/// Returns the walked table, or `None` when the walk failed.
pub fn extract_table(
    ctx: &mut RunContext,
    grid: &Grid,
    anchor: &TableAnchor,
    meta: &TableMeta,
) -> Option<DecisionTable> {
    let ids = TableIds::new(&ctx.config.dt_prefix, &anchor.tab, &anchor.decision_id);
    let mut report = TableReport {
        tab: anchor.tab.clone(),
        decision_id: anchor.decision_id.clone(),
        table_id: ids.table_id.clone(),
        kind: anchor.kind,
        inputs: 0,
        rules: 0,
        skipped_rows: 0,
        emitted: false,
        error: None,
    };

    let outcome = match walk(grid, anchor, &ids, ctx.config.fill_policy, &mut ctx.registry) {
        Ok(outcome) => outcome,
        Err(e) => {
            ctx.report.warn(format!("could not extract {}: {}", ids.table_id, e));
            report.error = Some(e.to_string());
            ctx.report.tables.push(report);
            return None;
        }
    };
    for message in outcome.warnings {
        ctx.report.warn(message);
    }
    let table = outcome.table;
    report.inputs = table.inputs.len();
    report.rules = table.rules.len();
    report.skipped_rows = outcome.skipped_rows;

    let rendered = dmn::render(&table, &ids, &ctx.ig).and_then(|dmn| {
        plan::render(&table, &ids, &ctx.ig, &ctx.config.dt_prefix, &meta.title).map(|plan| (dmn, plan))
    });
    match rendered {
        Ok((dmn, plan)) => {
            let codes: Vec<&str> = ctx
                .registry
                .identifiers_for_table(&ids.table_id)
                .into_iter()
                .map(|entry| entry.identifier.as_str())
                .collect();
            let value_set = codesystem::render_value_set(
                &ids.table_id,
                &ctx.config.dd_prefix,
                &format!("Decision Table for {}", ids.table_id),
                &codes,
            );
            ctx.bundle.add(ResourceKind::Dmn, ids.table_id.as_str(), dmn);
            ctx.bundle.add(ResourceKind::PlanDefinition, ids.table_id.as_str(), plan);
            ctx.bundle.add(ResourceKind::ValueSet, ids.table_id.as_str(), value_set);
            ctx.overview.push(OverviewRow {
                table_id: ids.table_id.clone(),
                description: meta
                    .description
                    .clone()
                    .unwrap_or_else(|| anchor.business_rule_text.clone()),
                source: meta.source.clone(),
            });
            info!(table = %ids.table_id, rules = report.rules, "emitted decision table");
            report.emitted = true;
        }
        Err(e) => {
            ctx.report.warn(format!("could not render {}: {}", ids.table_id, e));
            report.error = Some(e.to_string());
        }
    }
    ctx.report.tables.push(report);
    Some(table)
}

/// Finalize the registry and render the per-tab and run-level resources
pub fn finish_run(ctx: &mut RunContext, lookup: &dyn DefinitionLookup) {
    ctx.registry.finalize(lookup);
    let registry = &ctx.registry;
    let bundle = &mut ctx.bundle;
    let dd = ctx.config.dd_prefix.as_str();

    for tab_id in registry.tabs() {
        let entries = registry.identifiers_for_tab(tab_id);
        let tables = registry.tables_for_tab(tab_id);
        let codes: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();

        bundle.add(ResourceKind::Cql, tab_id, cql::render_library(tab_id, &tables, &entries));
        bundle.add(ResourceKind::Library, tab_id, cql::render_library_resource(tab_id, &ctx.ig));
        bundle.add(
            ResourceKind::ValueSet,
            tab_id,
            codesystem::render_value_set(tab_id, dd, &format!("Decision Tables For Tab {}", tab_id), &codes),
        );
    }

    if !registry.is_empty() {
        let entries: Vec<_> = registry.entries().collect();
        bundle.add(
            ResourceKind::CodeSystem,
            dd,
            codesystem::render_code_system(dd, CODE_SYSTEM_TITLE, &entries),
        );
        bundle.add(
            ResourceKind::ValueSet,
            dd,
            codesystem::render_all_codes_value_set(dd, CODE_SYSTEM_TITLE),
        );
    }

    for entry in registry.entries_of_kind(ExpressionKind::Output) {
        let (id, fsh) = activity::render(entry, &ctx.config.dt_prefix, &ctx.ig);
        bundle.add(ResourceKind::ActivityDefinition, id, fsh);
    }

    if !ctx.overview.is_empty() {
        bundle.add(ResourceKind::Page, PAGE_ID, page::render(&ctx.ig.title, &ctx.overview));
    }

    ctx.report.summarize_registry(registry);
    ctx.report.resources = bundle.len();
    info!(
        expressions = registry.len(),
        conflicts = registry.conflict_count(),
        resources = bundle.len(),
        "run complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractorConfig, IgConfig};
    use crate::excel::MemoryWorkbook;
    use crate::library::NoDefinitions;
    use pretty_assertions::assert_eq;

    fn cover() -> Grid {
        Grid::from_rows(
            COVER_SHEET,
            [
                vec!["Activity ID.Activity name", "Tab name", "Decision ID", "Table description", "Reference/source"],
                vec!["D2.1 Determine vaccines", "BCG", "IMMZ.D2.DT.BCG", "BCG eligibility", "WHO 2018"],
                vec!["", "", "IMMZ.D2.DT.Missing", "Not on the tab", ""],
            ],
        )
    }

    fn bcg_tab() -> Grid {
        Grid::from_rows(
            "BCG",
            [
                vec!["Decision ID", "IMMZ.D2.DT.BCG"],
                vec!["Business rule", "Determine if BCG is due"],
                vec!["Trigger", "IMMZ.D2 Determine required vaccination(s)"],
                vec!["Inputs", "", "Output", "Guidance displayed to health worker", "Annotations", "Reference(s)"],
                vec!["Age < 5\nAge in months < 60", "HIV positive", "", "", "", ""],
                vec!["Age < 5", "No", "Give BCG", "Vaccinate today", "", "WHO 2018"],
                vec!["", "HIV positive", "Do not give BCG", "", "", ""],
                vec![],
                vec!["Decision ID", "IMMZ.D2.DT.Unused"],
                vec!["Business rule", "Never referenced"],
                vec!["Trigger", "IMMZ.D2 Determine required vaccination(s)"],
                vec!["Inputs", "", "Output"],
                vec!["Age < 5", "-", ""],
                vec!["Yes", "", "Nothing"],
            ],
        )
    }

    fn context() -> RunContext {
        RunContext::new(ExtractorConfig::default(), IgConfig::default())
    }

    #[test]
    fn test_cover_driven_extraction() {
        let mut ctx = context();
        let mut workbook = MemoryWorkbook::new("immz.xlsx")
            .with_sheet(cover())
            .with_sheet(bcg_tab());

        process_workbook(&mut ctx, &mut workbook);
        finish_run(&mut ctx, &NoDefinitions);

        let report = &ctx.report;
        assert_eq!(report.files[0].entries, 2);
        assert_eq!(report.tables.len(), 1);
        assert!(report.tables[0].emitted);
        assert_eq!(report.tables[0].rules, 2);
        assert!(report.warnings.iter().any(|w| w.contains("IMMZ.D2.DT.Missing")));
        assert!(report.warnings.iter().any(|w| w.contains("IMMZ.D2.DT.Unused")));
        // the tab was read once for both the lookup and the extraction
        assert_eq!(workbook.read_count("BCG"), 1);

        let bundle = &ctx.bundle;
        assert!(bundle.contains(ResourceKind::Dmn, "DT.IMMZ.D2.DT.BCG"));
        assert!(bundle.contains(ResourceKind::PlanDefinition, "DT.IMMZ.D2.DT.BCG"));
        assert!(bundle.contains(ResourceKind::ValueSet, "DT.IMMZ.D2.DT.BCG"));
        assert!(bundle.contains(ResourceKind::Cql, "DTs.BCG"));
        assert!(bundle.contains(ResourceKind::Library, "DTs.BCG"));
        assert!(bundle.contains(ResourceKind::ValueSet, "DTs.BCG"));
        assert!(bundle.contains(ResourceKind::CodeSystem, "DD"));
        assert!(bundle.contains(ResourceKind::Page, PAGE_ID));
        assert_eq!(
            bundle.ids(ResourceKind::ActivityDefinition),
            vec!["DTO.GiveBCG", "DTO.DonotgiveBCG"]
        );
        // the unused table is located but never emitted
        assert!(!bundle.contains(ResourceKind::Dmn, "DT.IMMZ.D2.DT.Unused"));

        let page = bundle.get(ResourceKind::Page, PAGE_ID).unwrap();
        assert!(page.contains("BCG eligibility"));
    }

    #[test]
    fn test_workbook_without_cover_scans_every_tab() {
        let mut ctx = context();
        let mut workbook = MemoryWorkbook::new("nocover.xlsx").with_sheet(bcg_tab());

        process_workbook(&mut ctx, &mut workbook);
        finish_run(&mut ctx, &NoDefinitions);

        assert_eq!(ctx.report.files[0].entries, 2);
        assert_eq!(ctx.report.tables_emitted(), 2);
        assert!(ctx.bundle.contains(ResourceKind::Dmn, "DT.IMMZ.D2.DT.Unused"));
        assert!(!ctx.report.warnings.iter().any(|w| w.contains("not used")));
    }

    #[test]
    fn test_unused_tables_follow_used_flag() {
        let grid = Rc::new(bcg_tab());
        let anchors = locate(&grid);
        let mut ctx = context();
        let mut walked = IndexMap::new();
        for anchor in anchors.values() {
            let table = extract_table(&mut ctx, &grid, anchor, &TableMeta::default()).unwrap();
            walked.insert(("BCG".to_string(), anchor.decision_id.clone()), table);
        }
        let mut tabs = IndexMap::new();
        tabs.insert("BCG".to_string(), Some(TabTables { grid, anchors }));

        assert!(unused_tables(&tabs, &walked).is_empty());

        // a walked table that was not marked used still counts as unused
        walked.get_index_mut(0).unwrap().1.used = false;
        assert_eq!(unused_tables(&tabs, &walked), vec![("BCG", "IMMZ.D2.DT.BCG")]);

        // a table whose walk failed has no walked entry
        walked.shift_remove(&("BCG".to_string(), "IMMZ.D2.DT.Unused".to_string()));
        assert_eq!(
            unused_tables(&tabs, &walked),
            vec![("BCG", "IMMZ.D2.DT.BCG"), ("BCG", "IMMZ.D2.DT.Unused")]
        );
    }

    #[test]
    fn test_missing_tab_is_reported() {
        let mut ctx = context();
        let mut workbook = MemoryWorkbook::new("immz.xlsx").with_sheet(cover());

        process_workbook(&mut ctx, &mut workbook);
        assert!(ctx.report.tables.is_empty());
        assert!(ctx.report.warnings.iter().any(|w| w.contains("could not load tab 'BCG'")));
    }

    #[test]
    fn test_find_workbooks_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLSX", "~$a.xlsx", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let files = find_workbooks(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.XLSX", "b.xlsx"]);
        assert!(find_workbooks(&dir.path().join("missing")).unwrap().is_empty());
    }
}
