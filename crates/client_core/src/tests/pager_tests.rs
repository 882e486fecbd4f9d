use super::*;
use chrono::{TimeZone, Utc};

/// Ids 1..=count, image `n` stored at `1_000 + 10 * n` seconds.
fn stored_history(count: i64) -> Vec<HistoryEntry> {
    (1..=count)
        .map(|n| HistoryEntry {
            id: ImageId(n),
            mode: "Martin1".into(),
            timestamp: Utc
                .timestamp_opt(1_000 + 10 * n, 0)
                .single()
                .expect("timestamp"),
        })
        .collect()
}

/// `timestamp < before`, newest first, like the decoder's listing query.
fn query(history: &[HistoryEntry], request: PageRequest) -> Vec<HistoryEntry> {
    let mut page: Vec<HistoryEntry> = history
        .iter()
        .filter(|entry| match request.before {
            Some(before) => entry.timestamp.timestamp() < before.0,
            None => true,
        })
        .cloned()
        .collect();
    page.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    page.truncate(request.limit as usize);
    page
}

#[test]
fn first_page_has_no_cursor() {
    let mut pager = HistoryPager::new(15);
    let request = pager.begin_page().expect("request");
    assert_eq!(
        request,
        PageRequest {
            before: None,
            limit: 15
        }
    );
}

#[test]
fn two_pages_are_duplicate_and_gap_free() {
    let history = stored_history(40);
    let mut pager = HistoryPager::new(15);

    let first = pager.begin_page().expect("page 1");
    let page1 = pager.complete_page(first, query(&history, first));
    let second = pager.begin_page().expect("page 2");
    assert_eq!(second.before, Some(page1.last().expect("oldest").cursor()));
    let page2 = pager.complete_page(second, query(&history, second));

    let ids: Vec<i64> = page1.iter().chain(&page2).map(|entry| entry.id.0).collect();
    assert_eq!(ids.len(), 30);
    assert_eq!(ids, (11..=40).rev().collect::<Vec<_>>());
    assert!(!pager.is_exhausted());
    assert_eq!(pager.pages_loaded(), 2);
}

#[test]
fn short_page_marks_history_exhausted() {
    let history = stored_history(20);
    let mut pager = HistoryPager::new(15);

    let first = pager.begin_page().expect("page 1");
    pager.complete_page(first, query(&history, first));
    let second = pager.begin_page().expect("page 2");
    let page2 = pager.complete_page(second, query(&history, second));

    assert_eq!(page2.len(), 5);
    assert!(pager.is_exhausted());
    assert!(pager.begin_page().is_none());
}

#[test]
fn only_one_request_in_flight() {
    let mut pager = HistoryPager::new(15);
    let request = pager.begin_page().expect("request");
    assert!(pager.is_in_flight());
    assert!(pager.begin_page().is_none());

    pager.fail_page(request);
    assert!(!pager.is_in_flight());
    let retry = pager.begin_page().expect("retry");
    assert_eq!(retry, request);
}

#[test]
fn stale_page_is_dropped() {
    let history = stored_history(40);
    let mut pager = HistoryPager::new(15);
    let request = pager.begin_page().expect("request");
    pager.fail_page(request);

    let late = pager.complete_page(request, query(&history, request));
    assert!(late.is_empty());
    assert_eq!(pager.pages_loaded(), 0);
    assert_eq!(pager.cursor(), None);
}

#[test]
fn overlapping_pages_skip_entries_already_shown() {
    let history = stored_history(40);
    let mut pager = HistoryPager::new(15);

    let first = pager.begin_page().expect("page 1");
    let page1 = pager.complete_page(first, query(&history, first));
    let second = pager.begin_page().expect("page 2");
    // a server comparing with `<=` repeats the boundary entry
    let mut overlapping = vec![page1.last().expect("oldest").clone()];
    overlapping.extend(query(&history, second).into_iter().take(14));
    let page2 = pager.complete_page(second, overlapping);

    assert_eq!(page2.len(), 14);
    assert!(page2.iter().all(|entry| !page1.contains(entry)));
}

#[test]
fn zero_page_size_is_raised_to_one() {
    assert_eq!(HistoryPager::new(0).page_size(), 1);
}

#[test]
fn repeated_full_page_ends_paging() {
    // 20 images sharing one timestamp, listed by a server comparing with `<=`
    let history: Vec<HistoryEntry> = (1..=20)
        .map(|n| HistoryEntry {
            id: ImageId(n),
            mode: "Martin1".into(),
            timestamp: Utc.timestamp_opt(5_000, 0).single().expect("timestamp"),
        })
        .collect();
    let inclusive = |request: PageRequest| -> Vec<HistoryEntry> {
        history
            .iter()
            .filter(|entry| request.before.map_or(true, |before| entry.timestamp.timestamp() <= before.0))
            .take(request.limit as usize)
            .cloned()
            .collect()
    };
    let mut pager = HistoryPager::new(15);

    let first = pager.begin_page().expect("page 1");
    assert_eq!(pager.complete_page(first, inclusive(first)).len(), 15);
    assert!(!pager.is_exhausted());

    let second = pager.begin_page().expect("page 2");
    let page2 = pager.complete_page(second, inclusive(second));

    assert!(page2.is_empty());
    assert!(pager.is_exhausted());
    assert!(pager.begin_page().is_none());
}
