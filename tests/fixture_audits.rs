/// Fixture Audit Tests
/// Runs the full pipeline (load, resolve, audit, report) over the JSON
/// fixtures in tests/fixtures.

use std::path::{Path, PathBuf};

use trace_audit::application::AuditUsecase;
use trace_audit::domain::{
    collect_errors, resolve_contract, unused_methods, AnalyzerSettings, MethodId, UsageResolver,
};
use trace_audit::infrastructure::trace_collector::TraceCollector;
use trace_audit::infrastructure::{JsonExporter, JsonTraceLoader};
use trace_audit::ports::TraceLoader;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ids(list: &[MethodId]) -> Vec<&str> {
    list.iter().map(MethodId::as_str).collect()
}

#[test]
fn test_geogebra_link_leaves_only_skipped_method() {
    let document = JsonTraceLoader.load_document(&fixture("geogebra.json")).unwrap();
    let (trace, registry) = document.into_parts().unwrap();

    let contract = resolve_contract("geogebra", &registry).unwrap();
    assert_eq!(contract.mandatory.len(), 1);
    assert!(contract.mandatory.contains(&MethodId::new("geogebra", "getLink")));
    assert!(contract.skipped.contains(&MethodId::new("geogebra", "getData")));

    let unused = unused_methods("geogebra", &trace, &registry).unwrap();
    assert!(unused.mandatory.is_empty(), "Unexpected gaps: {:?}", unused.mandatory);
    assert_eq!(ids(&unused.skipped), vec!["geogebra - getData"]);
    assert_eq!(collect_errors(&trace), None);
}

#[test]
fn test_vimeo_usage_follows_field_requirements() {
    let document = JsonTraceLoader.load_document(&fixture("vimeo.json")).unwrap();
    let (trace, registry) = document.into_parts().unwrap();

    let settings = AnalyzerSettings::default();
    let used = UsageResolver::new(&registry, &settings)
        .all_used_methods(&trace)
        .unwrap();
    let used: Vec<&str> = used.iter().map(MethodId::as_str).collect();

    assert_eq!(
        used,
        vec![
            "og-title - getMeta",
            "html-meta - getData",
            "vimeo - getLink",
            "oembed-meta - getData",
            "oembed-video - getLink",
        ]
    );
    assert!(!used.contains(&"favicon - getLink"), "favicon output never reached a link");
}

#[test]
fn test_vimeo_skipped_mixin_and_errors() {
    let document = JsonTraceLoader.load_document(&fixture("vimeo.json")).unwrap();
    let (trace, registry) = document.into_parts().unwrap();

    let contract = resolve_contract("vimeo", &registry).unwrap();
    let mandatory: Vec<&str> = contract.mandatory.iter().map(MethodId::as_str).collect();
    assert_eq!(
        mandatory,
        vec![
            "oembed-meta - getData",
            "oembed-video - getLink",
            "og-title - getMeta",
            "vimeo - getLink",
        ]
    );

    let unused = unused_methods("vimeo", &trace, &registry).unwrap();
    assert!(unused.mandatory.is_empty());
    assert_eq!(ids(&unused.skipped), vec!["favicon - getLink"]);

    assert_eq!(
        collect_errors(&trace),
        Some(vec!["html-meta - getData: Unexpected status 500".to_string()])
    );
}

#[test]
fn test_registry_override_exposes_unskipped_mixin() {
    let loader = JsonTraceLoader;
    let registry = loader.load_registry(&fixture("plugins.json")).unwrap();
    let settings = AnalyzerSettings::default();
    let usecase = AuditUsecase {
        loader: &loader,
        exporter: &JsonExporter,
        settings: &settings,
    };

    let dir = tempdir().unwrap();
    let output = dir.path().join("report.json");
    let report = usecase
        .run(
            "vimeo",
            &[fixture("vimeo.json")],
            Some(&registry),
            output.to_str().unwrap(),
        )
        .unwrap();

    assert_eq!(ids(&report.never_used), vec!["favicon - getLink"]);
    assert!(!report.is_clean());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["neverUsed"][0], "favicon - getLink");
    assert_eq!(written["audits"][0]["unused"]["mandatory"][0], "favicon - getLink");
}

#[test]
fn test_fixture_directory_batch() {
    let loader = JsonTraceLoader;
    let settings = AnalyzerSettings::default();
    let usecase = AuditUsecase {
        loader: &loader,
        exporter: &JsonExporter,
        settings: &settings,
    };

    let paths = TraceCollector::collect(&[], &[fixture("")]).unwrap();
    assert_eq!(paths.len(), 3, "Collected: {:?}", paths);

    // geogebra.json has no vimeo plugin, plugins.json has no trace levels.
    let report = usecase.build_report("vimeo", &paths, None).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].source.ends_with("geogebra.json"));
    assert_eq!(report.audits.len(), 2);

    let vimeo = report
        .audits
        .iter()
        .find(|a| a.source.ends_with("vimeo.json"))
        .unwrap();
    assert!(vimeo.unused.is_clean());
    assert!(report.never_used.is_empty());
}

#[test]
fn test_declared_test_sources() {
    let registry = JsonTraceLoader.load_registry(&fixture("plugins.json")).unwrap();
    let sources: Vec<String> = registry
        .get("vimeo")
        .unwrap()
        .test_sources()
        .iter()
        .map(|s| s.describe())
        .collect();

    assert_eq!(
        sources,
        vec![
            "url https://vimeo.com/123".to_string(),
            "feed https://vimeo.com/channels/staffpicks/videos/rss".to_string(),
        ]
    );
}
