use super::*;
use chrono::TimeZone;

fn martin1() -> Dimensions {
    Dimensions::new(320, 256).expect("dims")
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp")
}

fn allocate(manager: &mut SurfaceManager, secs: i64, placement: Placement) -> SurfaceHandle {
    manager.allocate(
        "Martin1".into(),
        Some(martin1()),
        at(secs),
        SurfaceOrigin::Live,
        placement,
    )
}

#[test]
fn front_and_back_insertion_order() {
    let mut manager = SurfaceManager::new();
    let history_a = allocate(&mut manager, 10, Placement::Back);
    let history_b = allocate(&mut manager, 5, Placement::Back);
    let live = allocate(&mut manager, 20, Placement::Front);
    let older = allocate(&mut manager, 1, Placement::Back);

    assert_eq!(manager.handles(), vec![live, history_a, history_b, older]);
}

#[test]
fn write_is_idempotent_and_replaces_raster() {
    let mut manager = SurfaceManager::new();
    let handle = allocate(&mut manager, 1, Placement::Back);
    assert_eq!(
        manager.get(handle).expect("surface").status,
        SurfaceStatus::Pending
    );

    let first = Arc::new(RasterBuffer::blank(martin1()));
    let second = Arc::new(crate::pixels::convert(&[9; 30], martin1()).raster);
    assert_eq!(manager.write(handle, first), WriteOutcome::Written);
    assert_eq!(manager.write(handle, Arc::clone(&second)), WriteOutcome::Written);

    let surface = manager.get(handle).expect("surface");
    assert_eq!(surface.status, SurfaceStatus::Ready);
    assert!(Arc::ptr_eq(surface.raster.as_ref().expect("raster"), &second));
    assert_eq!(manager.len(), 1);
}

#[test]
fn writes_after_eviction_are_discarded() {
    let mut manager = SurfaceManager::new();
    let keep = allocate(&mut manager, 2, Placement::Back);
    let gone = allocate(&mut manager, 1, Placement::Back);

    assert!(manager.evict(gone).is_some());
    assert!(manager.evict(gone).is_none());
    assert_eq!(
        manager.write(gone, Arc::new(RasterBuffer::blank(martin1()))),
        WriteOutcome::Discarded
    );
    assert_eq!(manager.mark_failed(gone, "late"), WriteOutcome::Discarded);
    assert_eq!(manager.handles(), vec![keep]);
}

#[test]
fn failed_surface_stays_in_place_without_raster() {
    let mut manager = SurfaceManager::new();
    let first = allocate(&mut manager, 3, Placement::Back);
    let failed = allocate(&mut manager, 2, Placement::Back);
    let last = allocate(&mut manager, 1, Placement::Back);

    manager.mark_failed(failed, "HTTP 500");

    assert_eq!(manager.handles(), vec![first, failed, last]);
    let surface = manager.get(failed).expect("surface");
    assert_eq!(surface.status, SurfaceStatus::Failed("HTTP 500".to_string()));
    assert!(surface.raster.is_none());
}

#[test]
fn handles_are_unique() {
    let mut manager = SurfaceManager::new();
    let a = allocate(&mut manager, 1, Placement::Front);
    manager.evict(a);
    let b = allocate(&mut manager, 1, Placement::Front);
    assert_ne!(a, b);
}
