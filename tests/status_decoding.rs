//! Status Decoding Tests
//!
//! Drives the decoder end to end through `MirrorGroupClient` and the
//! in-memory backend:
//! - Null and empty arrays decode as empty sequences
//! - Site entries with a null required pointer are skipped
//! - Image entries with a null UUID are skipped
//! - Unrecognized codes are preserved
//! - The local site is the first entry with an empty mirror UUID

use mirrorgroup::mirror::{
    GlobalGroupStatus, GroupInfo, GroupLifecycleState, GroupSiteStatus, ImageMirrorMode,
    ImageSiteStatus, MirrorError, MirrorGroupClient, MockBackend, MockGroup, MockImage, MockSite,
    ReplicaReplayState,
};

fn client_with(group: MockGroup) -> MirrorGroupClient<MockBackend> {
    let backend = MockBackend::new();
    backend.insert_group(group);
    MirrorGroupClient::new(backend)
}

fn enabled(name: &str) -> MockGroup {
    MockGroup::new(name)
        .lifecycle(GroupLifecycleState::Enabled)
        .primary(true)
}

// =============================================================================
// Empty And Null Arrays
// =============================================================================

/// A group with no site array decodes with no sites.
#[test]
fn test_no_site_array() {
    let client = client_with(enabled("g1"));
    let status = client.global_status("g1").unwrap();

    assert_eq!(status.name, "g1");
    assert_eq!(status.site_statuses_count, 0);
    assert!(status.site_statuses.is_empty());
    assert_eq!(status.skipped_sites(), 0);
}

/// A declared count with a null site pointer decodes as empty.
#[test]
fn test_declared_sites_without_pointer() {
    let client = client_with(enabled("g1").declared_site_count(4));
    let status = client.global_status("g1").unwrap();

    assert_eq!(status.site_statuses_count, 4);
    assert!(status.site_statuses.is_empty());
    assert_eq!(status.skipped_sites(), 4);
    assert!(matches!(
        status.local_status(),
        Err(MirrorError::LocalStatusNotFound)
    ));
}

/// A declared image count with a null image pointer decodes as empty.
#[test]
fn test_declared_images_without_pointer() {
    let client = client_with(
        enabled("g1").site(MockSite::local(ReplicaReplayState::Replaying).null_images_with_count(3)),
    );
    let status = client.global_status("g1").unwrap();

    let local = status.local_status().unwrap();
    assert_eq!(local.image_count, 3);
    assert!(local.images.is_empty());
    assert_eq!(status.skipped_images(), 3);
}

// =============================================================================
// Skip Policy
// =============================================================================

/// Three declared sites where only the second is complete.
#[test]
fn test_only_complete_sites_survive() {
    let client = client_with(
        enabled("g1")
            .site(MockSite::peer("peer-a", ReplicaReplayState::Replaying).without_uuid())
            .site(MockSite::peer("peer-b", ReplicaReplayState::Replaying).pool_id(7))
            .site(MockSite::local(ReplicaReplayState::Stopped).without_image_global_ids()),
    );
    let status = client.global_status("g1").unwrap();

    assert_eq!(status.site_statuses_count, 3);
    assert_eq!(status.site_statuses.len(), 1);
    assert_eq!(status.site_statuses[0].mirror_uuid, "peer-b");
    assert_eq!(status.site_statuses[0].pool_id, 7);
    assert_eq!(status.skipped_sites(), 2);
    assert_eq!(client.metrics().snapshot().sites_skipped, 2);
}

/// A null pool id pointer drops the site instead of being dereferenced.
#[test]
fn test_null_pool_id_skips_site() {
    let client = client_with(
        enabled("g1")
            .site(MockSite::local(ReplicaReplayState::Replaying).without_pool_id())
            .site(MockSite::peer("peer-a", ReplicaReplayState::Replaying)),
    );
    let status = client.global_status("g1").unwrap();

    assert_eq!(status.site_statuses.len(), 1);
    assert!(status.local_status().is_err());
    assert_eq!(status.peer_statuses().count(), 1);
}

/// Images with a null UUID are dropped; the rest keep their order.
#[test]
fn test_image_skip_keeps_order() {
    let client = client_with(
        enabled("g1").site(MockSite::local(ReplicaReplayState::Replaying).images(vec![
            MockImage::local(ReplicaReplayState::Replaying).description("first"),
            MockImage::local(ReplicaReplayState::Error).without_uuid(),
            MockImage::local(ReplicaReplayState::Stopped).description("third"),
        ])),
    );
    let status = client.global_status("g1").unwrap();
    let local = status.local_status().unwrap();

    assert_eq!(local.image_count, 3);
    let descriptions: Vec<_> = local.images.iter().map(|i| i.description.as_str()).collect();
    assert_eq!(descriptions, ["first", "third"]);
    assert_eq!(local.skipped_images(), 1);
    assert_eq!(client.metrics().snapshot().images_skipped, 1);
}

/// Null optional strings inside a kept site decode as empty.
#[test]
fn test_null_strings_decode_empty() {
    let client = client_with(enabled("g1").site(MockSite::local(ReplicaReplayState::Replaying)));
    let local = client.local_status("g1").unwrap();

    assert_eq!(local.description, "");
    assert_eq!(local.image_global_ids, "");
    assert!(local.last_update_time().is_none());
}

// =============================================================================
// Codes And Fields
// =============================================================================

/// Info fields round-trip from the backend layout.
#[test]
fn test_info_fields() {
    let client = client_with(
        enabled("g1")
            .global_id("5c2e8f3a-4b9d-4e1f-9a7c-0d3b6e8f1a2c")
            .image_mode(ImageMirrorMode::Journal),
    );
    let info = client.group_info("g1").unwrap();

    assert_eq!(info.state, GroupLifecycleState::Enabled);
    assert_eq!(info.image_mode, ImageMirrorMode::Journal);
    assert!(info.primary);
    assert!(info.global_uuid().is_some());
}

/// A fully populated record decodes to exactly what the backend held.
#[test]
fn test_every_field_survives_decode() {
    let client = client_with(
        enabled("g1")
            .global_id("5c2e8f3a-4b9d-4e1f-9a7c-0d3b6e8f1a2c")
            .image_mode(ImageMirrorMode::Journal)
            .site(
                MockSite::peer("site-b", ReplicaReplayState::Replaying)
                    .pool_id(42)
                    .image_global_ids("img-a,img-b")
                    .description("healthy")
                    .last_update(1_700_000_100)
                    .images(vec![
                        MockImage::peer("site-b", ReplicaReplayState::Syncing)
                            .description("copying")
                            .last_update(1_700_000_050)
                            .down(),
                        MockImage::peer("site-b", ReplicaReplayState::Replaying),
                    ]),
            ),
    );

    let status = client.global_status("g1").unwrap();

    let expected = GlobalGroupStatus {
        name: "g1".to_string(),
        info: GroupInfo {
            global_id: "5c2e8f3a-4b9d-4e1f-9a7c-0d3b6e8f1a2c".to_string(),
            state: GroupLifecycleState::Enabled,
            image_mode: ImageMirrorMode::Journal,
            primary: true,
        },
        site_statuses_count: 1,
        site_statuses: vec![GroupSiteStatus {
            mirror_uuid: "site-b".to_string(),
            state: ReplicaReplayState::Replaying,
            image_count: 2,
            pool_id: 42,
            image_global_ids: "img-a,img-b".to_string(),
            images: vec![
                ImageSiteStatus {
                    mirror_uuid: "site-b".to_string(),
                    state: ReplicaReplayState::Syncing,
                    description: "copying".to_string(),
                    last_update: 1_700_000_050,
                    up: false,
                },
                ImageSiteStatus {
                    mirror_uuid: "site-b".to_string(),
                    state: ReplicaReplayState::Replaying,
                    description: String::new(),
                    last_update: 0,
                    up: true,
                },
            ],
            description: "healthy".to_string(),
            last_update: 1_700_000_100,
            up: true,
        }],
    };
    assert_eq!(status, expected);
    assert_eq!(client.group_info("g1").unwrap(), expected.info);
}

/// Unknown codes are kept and rendered with their value.
#[test]
fn test_unknown_codes_preserved() {
    let client = client_with(
        MockGroup::new("g1")
            .lifecycle(GroupLifecycleState::Unknown(9))
            .image_mode(ImageMirrorMode::Unknown(4))
            .site(MockSite::local(ReplicaReplayState::Other(42))),
    );
    let status = client.global_status("g1").unwrap();

    assert_eq!(status.info.state, GroupLifecycleState::Unknown(9));
    assert_eq!(status.info.state.to_string(), "unknown(9)");
    assert_eq!(status.info.image_mode, ImageMirrorMode::Unknown(4));
    assert_eq!(
        status.local_status().unwrap().state,
        ReplicaReplayState::Other(42)
    );
}

/// Image entries use the image-level code table, which includes syncing.
#[test]
fn test_image_syncing_state() {
    let client = client_with(
        enabled("g1").site(
            MockSite::local(ReplicaReplayState::StartingReplay)
                .images(vec![MockImage::local(ReplicaReplayState::Syncing).last_update(1_700_000_000)]),
        ),
    );
    let local = client.local_status("g1").unwrap();

    assert_eq!(local.state, ReplicaReplayState::StartingReplay);
    assert_eq!(local.images[0].state, ReplicaReplayState::Syncing);
    assert_eq!(
        local.images[0].last_update_time().map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
}

/// Site up flag and timestamps survive decode.
#[test]
fn test_site_health_fields() {
    let client = client_with(
        enabled("g1")
            .site(MockSite::local(ReplicaReplayState::Stopped).last_update(1_000))
            .site(MockSite::peer("peer-a", ReplicaReplayState::Replaying).down()),
    );
    let status = client.global_status("g1").unwrap();

    let local = status.local_status().unwrap();
    assert!(local.up);
    assert_eq!(local.last_update, 1_000);

    let peer = status.site_status("peer-a").unwrap();
    assert!(!peer.up);
    assert!(!peer.is_up_and_replaying());
}

// =============================================================================
// Local Site Resolution
// =============================================================================

/// The local entry is found regardless of position.
#[test]
fn test_local_site_after_peers() {
    let client = client_with(
        enabled("g1")
            .site(MockSite::peer("peer-a", ReplicaReplayState::Replaying))
            .site(MockSite::peer("peer-b", ReplicaReplayState::Error))
            .site(MockSite::local(ReplicaReplayState::Stopped)),
    );
    let local = client.local_status("g1").unwrap();

    assert!(local.is_local());
    assert_eq!(local.state, ReplicaReplayState::Stopped);
}

/// With two local entries the first in decode order wins.
#[test]
fn test_first_local_entry_wins() {
    let client = client_with(
        enabled("g1")
            .site(MockSite::local(ReplicaReplayState::Replaying).description("first"))
            .site(MockSite::local(ReplicaReplayState::Error).description("second")),
    );
    let local = client.local_status("g1").unwrap();

    assert_eq!(local.description, "first");
}

/// Only peer entries: local lookup reports not found.
#[test]
fn test_no_local_entry() {
    let client = client_with(enabled("g1").site(MockSite::peer("peer-a", ReplicaReplayState::Replaying)));
    let err = client.local_status("g1").unwrap_err();

    assert_eq!(err, MirrorError::LocalStatusNotFound);
    assert!(err.is_not_found());
}

/// Status of a group the backend does not know is a backend error.
#[test]
fn test_unknown_group() {
    let client = client_with(enabled("g1"));
    let err = client.global_status("other").unwrap_err();

    assert_eq!(err.code(), Some(-libc::ENOENT));
    assert_eq!(client.metrics().snapshot().status_fetch_failures, 1);
}
