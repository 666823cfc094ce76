mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{settings_with_proxies, Reply, ScriptedTransport};
use harvester_core::LinkColumn;
use harvester_engine::{
    read_staging_rows, ArtifactPaths, FailureKind, FetchSettings, HarvestEngine,
    NameSubstitution, Pipeline, PipelineConfig, Route, DEFAULT_SECONDARY_LINK_SELECTOR,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

fn write_input(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("Number,Company Name,Address,Link1,Link2\n{body}")).unwrap();
    path
}

fn config(output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: output_dir.to_path_buf(),
        max_concurrency: 4,
        ..PipelineConfig::default()
    }
}

#[test]
fn artifact_names_follow_input_name() {
    let config = PipelineConfig {
        output_dir: "out".into(),
        rename: Some(NameSubstitution {
            from: "_raw".into(),
            to: "_emails".into(),
        }),
        ..PipelineConfig::default()
    };
    let paths = ArtifactPaths::for_input(Path::new("data/leads_raw.csv"), &config).unwrap();
    assert_eq!(paths.final_path, Path::new("out/leads_emails.csv"));
    assert_eq!(paths.staging, Path::new("out/temp_leads_emails.csv"));
}

#[tokio::test(flavor = "multi_thread")]
async fn contact_run_covers_direct_proxy_and_missing_links() {
    let temp = TempDir::new().unwrap();
    let input = write_input(
        temp.path(),
        "leads.csv",
        "3,Gamma BV,Utrecht,/src/3,\n\
         1,Alpha GmbH,Berlin,/src/1,https://site.test/alpha\n\
         2,Beta SA,Paris,/src/2,https://site.test/beta\n",
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/alpha", Route::Direct, Reply::html("<p>Mail: info@alpha.de</p>"))
            .on("/beta", Route::Direct, Reply::status(503))
            .on("/beta", Route::Proxy(0), Reply::html("<p>sales(at)beta.fr</p>")),
    );
    let out = temp.path().join("out");
    let pipeline =
        Pipeline::with_transport(config(&out), settings_with_proxies(2), transport.clone()).unwrap();

    let report = pipeline.process_file(&input).await.unwrap();

    assert_eq!(report.output, out.join("leads.csv"));
    assert!(!out.join("temp_leads.csv").exists());
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.failures, 1);
    assert_eq!(report.proxy_hits(), 1);
    assert_eq!(report.outcomes.len(), 3);

    let missing = report.outcomes.iter().find(|o| o.identifier == "3").unwrap();
    assert_eq!(missing.failure, Some(FailureKind::LinkMissing));
    assert_eq!(missing.email, "");
    assert_eq!(transport.calls().len(), 3);

    let rows = read_staging_rows(&report.output).unwrap();
    let flat: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r.identifier.as_str(), r.email.as_str()))
        .collect();
    assert_eq!(
        flat,
        vec![("1", "info@alpha.de"), ("2", "sales@beta.fr"), ("3", "")]
    );
    assert_eq!(rows[0].website, "https://site.test/alpha");
}

#[tokio::test(flavor = "multi_thread")]
async fn detail_run_fills_website_and_drops_placeholders() {
    let temp = TempDir::new().unwrap();
    let input = write_input(
        temp.path(),
        "listing.csv",
        "1,Alpha GmbH,Berlin,/de/alpha,\n\
         2,Beta SA,Paris,/fr/beta,https://beta.example\n\
         3,Gamma BV,Utrecht,/nl/gamma,\n",
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "/de/alpha",
                Route::Direct,
                Reply::html(
                    r#"<a itemprop="url" href="https://alpha.example/">site</a>
                       <script>let eee = 'office#109#103#.cnalpha#103#example123cn';</script>"#,
                ),
            )
            .on(
                "/fr/beta",
                Route::Direct,
                Reply::html("<p>Contact alan@enfsolar.com</p>"),
            )
            .on(
                "/nl/gamma",
                Route::Direct,
                Reply::html(r#"<a href="mailto:hello@gamma.nl">write us</a>"#),
            ),
    );
    let config = PipelineConfig {
        link_column: LinkColumn::Source,
        base_url: Some(Url::parse("https://listing.test/").unwrap()),
        script_prepass: true,
        secondary_link_selector: Some(DEFAULT_SECONDARY_LINK_SELECTOR.to_string()),
        placeholder_denylist: vec!["alan@enfsolar.com".to_string()],
        ..config(&temp.path().join("out"))
    };
    let pipeline =
        Pipeline::with_transport(config, FetchSettings::default(), transport).unwrap();

    let report = pipeline.process_file(&input).await.unwrap();
    let rows = read_staging_rows(&report.output).unwrap();

    assert_eq!(rows[0].email, "office@alpha.com");
    assert_eq!(rows[0].website, "https://alpha.example/");
    assert_eq!(rows[1].email, "");
    assert_eq!(rows[1].website, "https://beta.example");
    assert_eq!(rows[2].email, "hello@gamma.nl");
    assert_eq!(report.summary.failures, 1);
    assert_eq!(report.proxy_hits(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_pages_still_produce_rows() {
    let temp = TempDir::new().unwrap();
    let input = write_input(
        temp.path(),
        "down.csv",
        "1,Alpha GmbH,Berlin,,https://site.test/down\n2,Beta SA,Paris,,not a url\n",
    );
    let pipeline = Pipeline::with_transport(
        config(&temp.path().join("out")),
        FetchSettings::default(),
        Arc::new(ScriptedTransport::new()),
    )
    .unwrap();

    let report = pipeline.process_file(&input).await.unwrap();
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.failures, 2);

    let mut failures: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.identifier.clone(), o.failure.clone()))
        .collect();
    failures.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        failures,
        vec![
            ("1".to_string(), Some(FailureKind::Network)),
            ("2".to_string(), Some(FailureKind::InvalidUrl)),
        ]
    );
}

#[test]
fn engine_skips_missing_inputs_and_keeps_going() {
    let temp = TempDir::new().unwrap();
    let good = write_input(temp.path(), "good.csv", "1,Alpha GmbH,Berlin,,https://site.test/a\n");
    let transport = Arc::new(
        ScriptedTransport::new().on("/a", Route::Direct, Reply::html("<b>a@alpha.de</b>")),
    );
    let engine = HarvestEngine::with_transport(
        config(&temp.path().join("out")),
        FetchSettings::default(),
        transport,
    )
    .unwrap();

    let results = engine.run_files(&[temp.path().join("absent.csv"), good.clone()]);
    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_err());
    let report = results[1].1.as_ref().unwrap();
    assert_eq!(report.input, good);
    assert_eq!(report.summary.failures, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn ceiling_of_one_still_writes_every_row() {
    let temp = TempDir::new().unwrap();
    let input = write_input(
        temp.path(),
        "serial.csv",
        "4,Delta,Oslo,,https://site.test/d\n\
         3,Gamma,Utrecht,,\n\
         2,Beta,Paris,,https://site.test/b\n\
         1,Alpha,Berlin,,https://site.test/a\n",
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/a", Route::Direct, Reply::html("<p>a@alpha.de</p>"))
            .on("/b", Route::Direct, Reply::status(500))
            .on("/d", Route::Direct, Reply::html("<p>d@delta.no</p>")),
    );
    let out = temp.path().join("out");
    let config = PipelineConfig {
        max_concurrency: 1,
        ..config(&out)
    };
    let pipeline = Pipeline::with_transport(config, FetchSettings::default(), transport).unwrap();

    let report = pipeline.process_file(&input).await.unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.failures, 2);
    assert!(!out.join("temp_serial.csv").exists());
    let rows = read_staging_rows(&report.output).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn record_that_panics_still_gets_an_empty_row() {
    let temp = TempDir::new().unwrap();
    let input = write_input(
        temp.path(),
        "buggy.csv",
        "1,Alpha,Berlin,,https://site.test/a\n2,Beta,Paris,,https://site.test/boom\n",
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/a", Route::Direct, Reply::html("<p>a@alpha.de</p>"))
            .on("/boom", Route::Direct, Reply::Panic),
    );
    let pipeline = Pipeline::with_transport(
        config(&temp.path().join("out")),
        FetchSettings::default(),
        transport,
    )
    .unwrap();

    let report = pipeline.process_file(&input).await.unwrap();

    let aborted = report.outcomes.iter().find(|o| o.identifier == "2").unwrap();
    assert_eq!(aborted.failure, Some(FailureKind::Aborted));
    let rows = read_staging_rows(&report.output).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].identifier, "2");
    assert_eq!(rows[1].email, "");
    assert_eq!(rows[1].website, "https://site.test/boom");
}
