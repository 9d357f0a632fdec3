//! Smoke test against a running homepage backend.
//!
//! Exercises the read-only backend endpoints and the local protocol registry.
//! Set `HOMEPAGE_API_URL` to the backend origin (defaults to
//! `http://localhost:5000`) and run with:
//! ```sh
//! cargo test --test smoke_test -- --ignored --nocapture
//! ```

use homepage_sync::models::{ProtocolPatch, ProtocolStatus, Risk};
use homepage_sync::HomepageSdk;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Print a section header to stderr.
fn section(name: &str) {
    eprintln!("\n{}", "=".repeat(60));
    eprintln!("  {}", name);
    eprintln!("{}", "=".repeat(60));
}

/// Counters for pass/fail reporting.
struct Counters {
    pass: usize,
    fail: usize,
}

impl Counters {
    fn new() -> Self {
        Self { pass: 0, fail: 0 }
    }

    fn check(&mut self, label: &str, condition: bool, detail: &str) {
        let status = if condition { "PASS" } else { "FAIL" };
        if condition {
            self.pass += 1;
        } else {
            self.fail += 1;
        }
        if detail.is_empty() {
            eprintln!("  [{}] {}", status, label);
        } else {
            eprintln!("  [{}] {} -- {}", status, label, detail);
        }
    }
}

// ---------------------------------------------------------------------------
// Main smoke test
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore]
async fn smoke_test() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let sdk = HomepageSdk::builder()
        .from_env()
        .storage_dir(tmp_dir.path())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let mut c = Counters::new();

    // ================================================================
    // 1. HOMEPAGE DATA
    // ================================================================
    section("Homepage data");

    let homepage = sdk.homepage();
    let snapshot = homepage.get_homepage_data().await;
    c.check(
        "get_homepage_data",
        homepage.last_error().is_none(),
        &format!(
            "version={}, properties={}",
            snapshot.version, snapshot.market_stats.total_properties
        ),
    );
    c.check("cache is fresh", !homepage.is_stale(), "");

    let again = homepage.get_homepage_data().await;
    c.check("cached read matches", again == snapshot, "");

    let flags = homepage.sync_overrides().await;
    c.check("sync_overrides", true, &format!("{:?}", flags));

    let live = homepage.fetch_live_data().await;
    c.check("fetch_live_data", live, "");

    let properties = homepage.available_properties().await;
    c.check(
        "available_properties",
        true,
        &format!("{} properties", properties.len()),
    );

    let exported = homepage.export_data().await;
    c.check("export_data", exported.is_some(), "");

    // ================================================================
    // 2. PROTOCOLS
    // ================================================================
    section("Protocols");

    let protocols = sdk.protocols();
    c.check(
        "seeded defaults",
        protocols.get_protocols().len() == 4,
        &format!("{} protocols", protocols.get_protocols().len()),
    );
    c.check(
        "low-risk category",
        !protocols.get_protocols_by_category(Risk::Low).is_empty(),
        "",
    );

    let patch = ProtocolPatch {
        status: Some(ProtocolStatus::Full),
        ..Default::default()
    };
    c.check(
        "update_protocol",
        protocols.update_protocol("curve-tricrypto", patch),
        "",
    );

    let report = protocols.get_stats_async().await;
    c.check(
        "get_stats_async",
        true,
        &format!(
            "tvl={}M, highest={}%, live={}",
            report.stats.total_value_locked, report.stats.highest_apy, report.is_live_data
        ),
    );

    // ================================================================
    // 3. VIEWS / DISPLAY / CLOSE
    // ================================================================
    section("Views, Display & Close");

    let view = sdk.protocol_view();
    c.check(
        "protocol view rows",
        view.display_rows().len() == 4,
        &format!("{:?}", view.stats_display()),
    );

    c.check("start_auto_refresh", sdk.start_auto_refresh(), "");
    sdk.stop_auto_refresh();

    let display = format!("{}", sdk);
    c.check(
        "Display impl",
        display.contains("HomepageSdk"),
        &format!("display={}", display),
    );

    drop(view);
    sdk.close();
    c.check("close()", true, "SDK closed cleanly");

    // ================================================================
    // SUMMARY
    // ================================================================
    section("SMOKE TEST COMPLETE");

    eprintln!("  Total:   {} checks", c.pass + c.fail);
    eprintln!("  Passed:  {}", c.pass);
    eprintln!("  Failed:  {}", c.fail);
    eprintln!();

    if c.fail > 0 {
        eprintln!("  *** FAILURES DETECTED ***");
        eprintln!();
    }

    assert_eq!(c.fail, 0, "{} smoke test checks failed", c.fail);
}
