//! Manifest endpoint integration tests.
//!
//! Static stations only: the envelope for a stream station requires a
//! running ffmpeg encoder, which integration tests do not assume.

mod common;

use common::{create_user, TestHarness};
use rb_media::envelope::{self, PlaylistKind};

const VARIANT: &str =
    "#EXTM3U\n#EXTINF:2.000,\na.m4s\n#EXTINF:2.000,\nb.m4s\n#EXTINF:1.500,\nc.m4s\n";

async fn seed_static_station(harness: &TestHarness, user: &str, station: &str, source: &str) {
    harness.make_ready_folder(source, VARIANT);
    let conn = harness.conn();
    rb_db::queries::stations::create_station(
        &conn,
        user,
        station,
        rb_db::models::StationKind::Static,
        Some(source),
    )
    .unwrap();
}

#[tokio::test]
async fn static_station_manifest_round_trips() {
    let (harness, base) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let (id, secret) = create_user(&client, &base).await;
    seed_static_station(&harness, &id, "mix", "YT_aaaaaaaaaaa").await;

    let resp = client
        .get(format!("{base}/users/{id}/stations/mix"))
        .basic_auth(&id, Some(&secret))
        .header("X-API-Root", "http://radio.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let bytes = resp.bytes().await.unwrap();
    assert_eq!(&bytes[..4], b"blul");

    let decoded = envelope::decode(&bytes).unwrap();
    assert!(decoded.partysync);
    assert!(decoded.audioonly);
    assert_eq!(decoded.duration, 5);
    assert_eq!(decoded.ucp, "a");

    let playlists = decoded.playlists.unwrap();
    assert_eq!(playlists.len(), 2);
    assert_eq!(playlists[0].kind, PlaylistKind::Master);
    assert_eq!(
        playlists[0].url,
        "http://radio.test/media/YT_aaaaaaaaaaa/master.m3u8"
    );
    assert_eq!(playlists[1].kind, PlaylistKind::Variant);
    assert_eq!(playlists[1].data, VARIANT);
    assert_eq!(playlists[1].duration, 5);
}

#[tokio::test]
async fn manifest_requires_api_root_header() {
    let (harness, base) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let (id, secret) = create_user(&client, &base).await;
    seed_static_station(&harness, &id, "mix", "YT_bbbbbbbbbbb").await;

    let resp = client
        .get(format!("{base}/users/{id}/stations/mix"))
        .basic_auth(&id, Some(&secret))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn unknown_station_is_404() {
    let (_harness, base) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let (id, secret) = create_user(&client, &base).await;

    let resp = client
        .get(format!("{base}/users/{id}/stations/ghost"))
        .basic_auth(&id, Some(&secret))
        .header("X-API-Root", "http://radio.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn strangers_cannot_read_but_party_followers_can() {
    let (harness, base) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let (owner_id, owner_secret) = create_user(&client, &base).await;
    let (fan_id, fan_secret) = create_user(&client, &base).await;
    seed_static_station(&harness, &owner_id, "mix", "YT_ccccccccccc").await;

    let url = format!("{base}/users/{owner_id}/stations/mix");

    let resp = client
        .get(&url)
        .basic_auth(&fan_id, Some(&fan_secret))
        .header("X-API-Root", "http://radio.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Same read succeeds once the fan follows the owner in a party.
    let descriptor = serde_json::json!({
        "id": format!("V2:{}", "d".repeat(32)),
        "match": "e".repeat(32),
        "session": "f".repeat(32),
    });

    let resp = client
        .post(format!("{base}/users/@me/party"))
        .basic_auth(&owner_id, Some(&owner_secret))
        .json(&{
            let mut d = descriptor.clone();
            d["leader"] = serde_json::Value::Bool(true);
            d
        })
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/users/@me/party"))
        .basic_auth(&fan_id, Some(&fan_secret))
        .json(&descriptor)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(&url)
        .basic_auth(&fan_id, Some(&fan_secret))
        .header("X-API-Root", "http://radio.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(envelope::decode(&resp.bytes().await.unwrap()).is_ok());
}

#[tokio::test]
async fn media_files_are_served_statically() {
    let (harness, base) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    harness.make_ready_folder("YT_ddddddddddd", VARIANT);

    let resp = client
        .get(format!("{base}/media/YT_ddddddddddd/output.m3u8"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), VARIANT);

    let resp = client
        .get(format!("{base}/media/YT_ddddddddddd/nope.m4s"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
