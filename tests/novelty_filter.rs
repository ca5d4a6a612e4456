// tests/novelty_filter.rs
use serde_json::{json, Value};
use wanted_digest::ingest::envelope::extract_items;
use wanted_digest::ingest::{filter_new, normalize, RawListing};
use wanted_digest::state::SeenIds;

fn raws(v: Value) -> Vec<RawListing> {
    extract_items(&v).0
}

#[test]
fn fixture_page_normalizes_and_drops_idless_posting() {
    let body: Value =
        serde_json::from_str(&std::fs::read_to_string("tests/fixtures/site_v4_page.json").unwrap())
            .unwrap();
    let items = raws(body);
    assert_eq!(items.len(), 3);

    let first = normalize(&items[0]);
    assert_eq!(first.id, "310245");
    assert_eq!(first.title, "Backend Engineer (Rust)");
    assert_eq!(first.company, "Acme Robotics");
    assert_eq!(first.location, "서울");
    assert_eq!(first.link, "https://www.wanted.co.kr/wd/310245");

    let fresh = filter_new(&items, &SeenIds::new());
    let ids: Vec<_> = fresh.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["310245", "310246"]);
}

#[test]
fn listings_without_any_id_field_never_pass() {
    let items = raws(json!([
        { "title": "A", "company": { "name": "X" }, "location": "Seoul" },
        { "id": null, "position_id": "", "job_id": 0, "title": "B" },
        { "id": "", "title": "C", "published_at": "2026-10-19" }
    ]));
    assert!(filter_new(&items, &SeenIds::new()).is_empty());
}

#[test]
fn seen_ids_are_excluded_and_order_is_kept() {
    let items = raws(json!([
        { "id": "5" }, { "id": "1" }, { "id": "4" }, { "id": "2" }, { "id": "3" }
    ]));
    let seen: SeenIds = ["1", "3"].into_iter().collect();
    let ids: Vec<_> = filter_new(&items, &seen).into_iter().map(|l| l.id).collect();
    assert_eq!(ids, vec!["5", "4", "2"]);
}

#[test]
fn filtering_is_idempotent_and_does_not_touch_seen() {
    let items = raws(json!({ "results": [{ "id": 1, "title": "A" }, { "id": 2 }] }));
    let seen: SeenIds = ["2"].into_iter().collect();
    let before = seen.clone();

    let a = filter_new(&items, &seen);
    let b = filter_new(&items, &seen);
    assert_eq!(a, b);
    assert_eq!(seen, before);
    assert_eq!(a.len(), 1);
}

#[test]
fn numeric_and_string_ids_compare_equal_after_normalizing() {
    let items = raws(json!({ "jobs": [{ "id": 77 }] }));
    let seen: SeenIds = ["77"].into_iter().collect();
    assert!(filter_new(&items, &seen).is_empty());
}
