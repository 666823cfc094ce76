use harvester_core::{extract_email, EmailExtractor, ExtractionPlan, ScriptObfuscation};

#[test]
fn parenthesized_at_is_normalized() {
    assert_eq!(extract_email("contact (at) example.com"), "contact@example.com");
}

#[test]
fn bracketed_at_is_normalized() {
    assert_eq!(extract_email("name [at] site.org"), "name@site.org");
}

#[test]
fn no_email_like_text_yields_empty() {
    assert_eq!(extract_email("Call us on +49 30 1234 or visit the shop."), "");
    assert_eq!(extract_email(""), "");
}

#[test]
fn canonical_family_wins_over_earlier_obfuscated_text() {
    let text = "Write to sales [at] first.org or to info@second.com";
    assert_eq!(extract_email(text), "info@second.com");
}

#[test]
fn separator_tolerates_surrounding_whitespace_and_line_breaks() {
    assert_eq!(extract_email("mail: office @\n  solar-panels.de."), "office@solar-panels.de");
    assert_eq!(extract_email("OFFICE (AT) Panels.IT"), "OFFICE@Panels.IT");
}

#[test]
fn requires_two_letter_top_level_label() {
    assert_eq!(extract_email("user@host.c"), "");
    assert_eq!(extract_email("user@localhost"), "");
}

#[test]
fn static_resource_names_are_skipped_within_a_family() {
    let text = r#"<img src="logo@2x.png"> contact: hello@roof.nl"#;
    assert_eq!(extract_email(text), "hello@roof.nl");
    assert_eq!(EmailExtractor::new(false).extract(text), "logo@2x.png");
}

#[test]
fn script_prepass_runs_before_standard_extraction() {
    let plan = ExtractionPlan {
        script: Some(ScriptObfuscation::default()),
        ..ExtractionPlan::default()
    };
    let html = r#"<p>webmaster@listing.cn</p><script>let eee = 'buy#109#103#.cnsun#103#example123cn'</script>"#;
    let extraction = plan.run(html, "webmaster@listing.cn");
    assert_eq!(extraction.email, "buy@sun.com");
    assert_eq!(extraction.discarded, None);
}

#[test]
fn without_prepass_markup_scripts_are_ignored() {
    let plan = ExtractionPlan::default();
    let html = r#"<script>let eee = 'buy#109#103#.cnsun#103#example123cn'</script>"#;
    assert_eq!(plan.run(html, "").email, "");
}

#[test]
fn placeholder_addresses_are_discarded() {
    let plan = ExtractionPlan {
        placeholder_denylist: vec!["alan@enfsolar.com".to_string()],
        ..ExtractionPlan::default()
    };
    let extraction = plan.run("", "Contact: Alan@ENFsolar.com");
    assert_eq!(extraction.email, "");
    assert_eq!(extraction.discarded.as_deref(), Some("Alan@ENFsolar.com"));

    let kept = plan.run("", "Contact: team@sunny.es");
    assert_eq!(kept.email, "team@sunny.es");
}
